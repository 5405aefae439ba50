use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use super::attach_event_handle;
use super::concluded_event;
use crate::ActionResult;
use crate::AggregateAction;
use crate::AggregateActionInput;
use crate::AggregateActionOutput;
use crate::AggregateActionResponse;
use crate::Event;
use crate::GroupState;

pub const APPEND_ACTION: &str = "append";

/// Settings of the `append` action
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppendActionConfig {
    /// Fields merged across events. Empty means every field.
    #[serde(default)]
    pub keys_to_append: Vec<String>,
}

/// Combines the events of a window into one, collecting differing values of
/// the selected fields into lists.
#[derive(Debug, Clone, Default)]
pub struct AppendAction {
    config: AppendActionConfig,
}

impl AppendAction {
    pub fn new(config: AppendActionConfig) -> Self {
        Self { config }
    }

    fn should_append(
        &self,
        key: &str,
    ) -> bool {
        self.config.keys_to_append.is_empty() || self.config.keys_to_append.iter().any(|k| k == key)
    }

    fn merge(
        &self,
        event: &Event,
        state: &mut GroupState,
    ) {
        for (key, value) in event.data() {
            if !self.should_append(key) {
                continue;
            }
            match state.get_mut(key) {
                None => {
                    state.insert(key.clone(), value.clone());
                }
                Some(Value::Array(existing)) => match value {
                    Value::Array(items) => existing.extend(items.iter().cloned()),
                    other => existing.push(other.clone()),
                },
                Some(existing) => {
                    if existing != value {
                        *existing = Value::Array(vec![existing.clone(), value.clone()]);
                    }
                }
            }
        }
    }
}

impl AggregateAction for AppendAction {
    fn handle_event(
        &self,
        event: &Event,
        input: &mut AggregateActionInput<'_>,
    ) -> ActionResult<AggregateActionResponse> {
        let state = input.group_state_mut();
        if state.is_empty() {
            state.extend(event.to_map());
        } else {
            self.merge(event, state);
        }
        attach_event_handle(event, input);
        Ok(AggregateActionResponse::null_event())
    }

    fn conclude_group(
        &self,
        input: &mut AggregateActionInput<'_>,
    ) -> ActionResult<AggregateActionOutput> {
        if input.group_state().is_empty() {
            return Ok(AggregateActionOutput::empty());
        }
        let data = input.group_state().to_map();
        Ok(AggregateActionOutput::new(vec![concluded_event(data, input)]))
    }

    fn holds_events(&self) -> bool {
        true
    }
}
