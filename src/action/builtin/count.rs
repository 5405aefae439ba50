use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use super::attach_event_handle;
use super::concluded_event;
use crate::constants::DEFAULT_COUNT_KEY;
use crate::utils::time::system_time_to_millis;
use crate::ActionResult;
use crate::AggregateAction;
use crate::AggregateActionInput;
use crate::AggregateActionOutput;
use crate::AggregateActionResponse;
use crate::Event;

pub const COUNT_ACTION: &str = "count";

fn default_count_key() -> String {
    DEFAULT_COUNT_KEY.to_string()
}

/// Settings of the `count` action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CountActionConfig {
    /// Field the number of events is written to
    #[serde(default = "default_count_key")]
    pub count_key: String,

    /// When set, the window start (epoch millis) is written to this field
    #[serde(default)]
    pub start_time_key: Option<String>,
}

impl Default for CountActionConfig {
    fn default() -> Self {
        Self {
            count_key: default_count_key(),
            start_time_key: None,
        }
    }
}

/// Counts the events of each window and emits one event per group holding
/// the group key fields and the count.
#[derive(Debug, Clone, Default)]
pub struct CountAction {
    config: CountActionConfig,
}

impl CountAction {
    pub fn new(config: CountActionConfig) -> Self {
        Self { config }
    }
}

impl AggregateAction for CountAction {
    fn handle_event(
        &self,
        event: &Event,
        input: &mut AggregateActionInput<'_>,
    ) -> ActionResult<AggregateActionResponse> {
        let started_at = system_time_to_millis(input.window_started_at());
        let state = input.group_state_mut();

        let count = state.get(&self.config.count_key).and_then(Value::as_u64).unwrap_or(0);
        state.insert(self.config.count_key.clone(), Value::from(count + 1));

        if let Some(start_time_key) = &self.config.start_time_key {
            state.entry(start_time_key.clone()).or_insert_with(|| Value::from(started_at));
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

        let mut event = Event::from_map(Map::new());
        for (field, value) in input.identification_keys().iter() {
            event.put(field, value.clone());
        }
        for (field, value) in input.group_state().iter() {
            event.put(field, value.clone());
        }

        Ok(AggregateActionOutput::new(vec![concluded_event(event.into_map(), input)]))
    }

    fn holds_events(&self) -> bool {
        true
    }
}
