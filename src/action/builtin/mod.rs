//! Actions shipped with the engine, registered by [`crate::ActionFactory::with_builtins`].

mod append;
mod count;
mod histogram;
mod percent_sampler;
mod put_all;
mod rate_limiter;
mod remove_duplicates;
pub use append::*;
pub use count::*;
pub use histogram::*;
pub use percent_sampler::*;
pub use put_all::*;
pub use rate_limiter::*;
pub use remove_duplicates::*;

use serde_json::Map;

use crate::AggregateActionInput;
use crate::Event;

/// Builds the single event a window emits from a prepared payload, carrying
/// the window's completion handle so that attached inputs are acknowledged
/// with it.
pub(crate) fn concluded_event(
    data: Map<String, serde_json::Value>,
    input: &AggregateActionInput<'_>,
) -> Event {
    Event::from_map(data).with_handle(input.completion_handle().clone())
}

/// Chains the input event's acknowledgement to the window's output.
pub(crate) fn attach_event_handle(
    event: &Event,
    input: &AggregateActionInput<'_>,
) {
    if let Some(handle) = event.event_handle() {
        input.completion_handle().attach(handle.clone());
    }
}
