use crate::ActionResult;
use crate::AggregateAction;
use crate::AggregateActionInput;
use crate::AggregateActionOutput;
use crate::AggregateActionResponse;
use crate::Event;

use super::attach_event_handle;
use super::concluded_event;

pub const PUT_ALL_ACTION: &str = "put_all";

/// Merges every event of a window into one; later values overwrite earlier ones.
#[derive(Debug, Default, Clone, Copy)]
pub struct PutAllAction;

impl AggregateAction for PutAllAction {
    fn handle_event(
        &self,
        event: &Event,
        input: &mut AggregateActionInput<'_>,
    ) -> ActionResult<AggregateActionResponse> {
        let state = input.group_state_mut();
        for (key, value) in event.data() {
            state.insert(key.clone(), value.clone());
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
