use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::ActionError;
use crate::ActionResult;
use crate::AggregateAction;
use crate::AggregateActionInput;
use crate::AggregateActionResponse;
use crate::Event;

pub const PERCENT_SAMPLER_ACTION: &str = "percent_sampler";

const TOTAL_EVENTS_KEY: &str = "total_events";
const ALLOWED_EVENTS_KEY: &str = "allowed_events";

/// Settings of the `percent_sampler` action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PercentSamplerActionConfig {
    /// Share of each group's events forwarded, in `(0, 100]`
    pub percent: f64,
}

impl PercentSamplerActionConfig {
    pub fn validate(&self) -> ActionResult<()> {
        if !(self.percent > 0.0 && self.percent <= 100.0) {
            return Err(ActionError::InvalidSettings {
                action: PERCENT_SAMPLER_ACTION.to_string(),
                reason: format!("percent must be in (0, 100], got {}", self.percent),
            });
        }
        Ok(())
    }
}

/// Forwards a fixed share of each group's events within a window.
///
/// Deterministic: an event passes when the forwarded share so far is below
/// `percent`, so the first event of every window always passes.
#[derive(Debug, Clone)]
pub struct PercentSamplerAction {
    config: PercentSamplerActionConfig,
}

impl PercentSamplerAction {
    pub fn new(config: PercentSamplerActionConfig) -> Self {
        Self { config }
    }
}

impl AggregateAction for PercentSamplerAction {
    fn handle_event(
        &self,
        event: &Event,
        input: &mut AggregateActionInput<'_>,
    ) -> ActionResult<AggregateActionResponse> {
        let state = input.group_state_mut();
        let total = state.get(TOTAL_EVENTS_KEY).and_then(Value::as_u64).unwrap_or(0) + 1;
        let allowed = state.get(ALLOWED_EVENTS_KEY).and_then(Value::as_u64).unwrap_or(0);
        state.insert(TOTAL_EVENTS_KEY.to_string(), Value::from(total));

        if (allowed as f64) * 100.0 < self.config.percent * (total as f64) {
            state.insert(ALLOWED_EVENTS_KEY.to_string(), Value::from(allowed + 1));
            Ok(AggregateActionResponse::from_event(event.clone()))
        } else {
            Ok(AggregateActionResponse::null_event())
        }
    }
}
