use crate::ActionResult;
use crate::AggregateAction;
use crate::AggregateActionInput;
use crate::AggregateActionResponse;
use crate::Event;

pub const REMOVE_DUPLICATES_ACTION: &str = "remove_duplicates";

/// Forwards the first event of each window and drops the rest of the group.
#[derive(Debug, Default, Clone, Copy)]
pub struct RemoveDuplicatesAction;

impl AggregateAction for RemoveDuplicatesAction {
    fn handle_event(
        &self,
        event: &Event,
        input: &mut AggregateActionInput<'_>,
    ) -> ActionResult<AggregateActionResponse> {
        if !input.group_state().is_empty() {
            return Ok(AggregateActionResponse::null_event());
        }

        let seen = input.identification_keys().to_map();
        input.group_state_mut().extend(seen);
        Ok(AggregateActionResponse::from_event(event.clone()))
    }
}
