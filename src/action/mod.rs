//! Aggregate actions.
//!
//! An [`AggregateAction`] decides what a group accumulates and what it emits.
//! The synchronizer calls [`AggregateAction::handle_event`] for every event
//! routed to a group and [`AggregateAction::conclude_group`] once the group's
//! window closes; both run with the group's handle gate held, so an action
//! never has to synchronize access to the group itself.

mod builtin;
mod factory;
mod input;
pub use builtin::*;
pub use factory::*;
pub use input::*;


use crate::ActionResult;
use crate::Event;

/// Result of handling one event: an event to forward, or nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateActionResponse {
    event: Option<Event>,
}

impl AggregateActionResponse {
    pub fn from_event(event: Event) -> Self {
        Self { event: Some(event) }
    }

    pub fn null_event() -> Self {
        Self { event: None }
    }

    pub fn event(&self) -> Option<&Event> {
        self.event.as_ref()
    }

    pub fn into_event(self) -> Option<Event> {
        self.event
    }
}

/// Result of concluding a group: zero or more events to emit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateActionOutput {
    events: Vec<Event>,
}

impl AggregateActionOutput {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

/// Strategy plugged into the aggregation engine.
///
/// Every method has a default: events pass through unchanged, concluding
/// emits nothing, and the action does not hold on to events.
pub trait AggregateAction: Send + Sync + 'static {
    /// Called for each event routed to the group.
    fn handle_event(
        &self,
        event: &Event,
        _input: &mut AggregateActionInput<'_>,
    ) -> ActionResult<AggregateActionResponse> {
        Ok(AggregateActionResponse::from_event(event.clone()))
    }

    /// Called once the group's window has closed.
    fn conclude_group(
        &self,
        _input: &mut AggregateActionInput<'_>,
    ) -> ActionResult<AggregateActionOutput> {
        Ok(AggregateActionOutput::empty())
    }

    /// Whether input events stay referenced by the group until it concludes.
    ///
    /// When `false` the engine acknowledges dropped input events immediately.
    fn holds_events(&self) -> bool {
        false
    }
}
