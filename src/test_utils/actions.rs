use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread::sleep;
use std::time::Duration;

use serde_json::json;

use crate::ActionError;
use crate::ActionResult;
use crate::AggregateAction;
use crate::AggregateActionInput;
use crate::AggregateActionOutput;
use crate::AggregateActionResponse;
use crate::Event;

/// Relies entirely on the trait defaults.
pub struct PassThroughAction;

impl AggregateAction for PassThroughAction {}

/// Returns an error from the selected callbacks.
pub struct FailingAction {
    pub fail_handle: bool,
    pub fail_conclude: bool,
}

impl AggregateAction for FailingAction {
    fn handle_event(
        &self,
        event: &Event,
        input: &mut AggregateActionInput<'_>,
    ) -> ActionResult<AggregateActionResponse> {
        input.group_state_mut().insert("touched".to_string(), json!(true));
        if self.fail_handle {
            return Err(ActionError::Processing("handle failed".to_string()));
        }
        Ok(AggregateActionResponse::null_event())
    }

    fn conclude_group(
        &self,
        _input: &mut AggregateActionInput<'_>,
    ) -> ActionResult<AggregateActionOutput> {
        if self.fail_conclude {
            return Err(ActionError::Processing("conclude failed".to_string()));
        }
        Ok(AggregateActionOutput::new(vec![Event::from_map(Default::default())]))
    }
}

/// Panics in both callbacks.
pub struct PanickingAction;

impl AggregateAction for PanickingAction {
    fn handle_event(
        &self,
        _event: &Event,
        _input: &mut AggregateActionInput<'_>,
    ) -> ActionResult<AggregateActionResponse> {
        panic!("handle_event blew up");
    }

    fn conclude_group(
        &self,
        _input: &mut AggregateActionInput<'_>,
    ) -> ActionResult<AggregateActionOutput> {
        panic!("conclude_group blew up");
    }
}

/// Counts events into the group state and records how often each callback
/// ran. Conclude emits one event carrying the count.
#[derive(Default)]
pub struct CountingAction {
    pub handled: AtomicUsize,
    pub concluded: AtomicUsize,
}

impl CountingAction {
    pub fn handled(&self) -> usize {
        self.handled.load(Ordering::SeqCst)
    }

    pub fn concluded(&self) -> usize {
        self.concluded.load(Ordering::SeqCst)
    }
}

impl AggregateAction for CountingAction {
    fn handle_event(
        &self,
        _event: &Event,
        input: &mut AggregateActionInput<'_>,
    ) -> ActionResult<AggregateActionResponse> {
        self.handled.fetch_add(1, Ordering::SeqCst);
        let state = input.group_state_mut();
        let count = state.get("count").and_then(|v| v.as_u64()).unwrap_or(0);
        state.insert("count".to_string(), json!(count + 1));
        Ok(AggregateActionResponse::null_event())
    }

    fn conclude_group(
        &self,
        input: &mut AggregateActionInput<'_>,
    ) -> ActionResult<AggregateActionOutput> {
        self.concluded.fetch_add(1, Ordering::SeqCst);
        let count = input.group_state().get("count").cloned().unwrap_or(json!(0));
        let mut event = Event::from_map(input.identification_keys().to_map());
        event.put("count", count);
        Ok(AggregateActionOutput::new(vec![event]))
    }

    fn holds_events(&self) -> bool {
        true
    }
}

/// Detects overlapping callbacks on the same group.
///
/// Each callback flips `in_section` on entry, lingers, and flips it back.
/// Finding the flag already set means two critical sections overlapped.
#[derive(Default)]
pub struct CriticalSectionAction {
    in_section: AtomicBool,
    pub overlaps: AtomicUsize,
    pub handled: AtomicUsize,
    pub concluded: AtomicUsize,
    pub linger: Duration,
}

impl CriticalSectionAction {
    pub fn new(linger: Duration) -> Self {
        Self {
            linger,
            ..Default::default()
        }
    }

    fn enter(&self) {
        if self.in_section.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        sleep(self.linger);
        self.in_section.store(false, Ordering::SeqCst);
    }
}

impl AggregateAction for CriticalSectionAction {
    fn handle_event(
        &self,
        _event: &Event,
        _input: &mut AggregateActionInput<'_>,
    ) -> ActionResult<AggregateActionResponse> {
        self.enter();
        self.handled.fetch_add(1, Ordering::SeqCst);
        Ok(AggregateActionResponse::null_event())
    }

    fn conclude_group(
        &self,
        _input: &mut AggregateActionInput<'_>,
    ) -> ActionResult<AggregateActionOutput> {
        self.enter();
        self.concluded.fetch_add(1, Ordering::SeqCst);
        Ok(AggregateActionOutput::empty())
    }
}

/// Marks every touched group as due right away.
pub struct ConcludeImmediatelyAction;

impl AggregateAction for ConcludeImmediatelyAction {
    fn handle_event(
        &self,
        event: &Event,
        input: &mut AggregateActionInput<'_>,
    ) -> ActionResult<AggregateActionResponse> {
        input.set_custom_should_conclude(|_| true);
        input.group_state_mut().extend(event.to_map());
        Ok(AggregateActionResponse::null_event())
    }

    fn conclude_group(
        &self,
        input: &mut AggregateActionInput<'_>,
    ) -> ActionResult<AggregateActionOutput> {
        Ok(AggregateActionOutput::new(vec![Event::from_map(input.group_state().to_map())]))
    }
}

/// How [`HoldingAction`] ends a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcludeBehavior {
    Emit,
    Empty,
    Fail,
    Panic,
}

/// Chains every input's handle to the window's handle, then concludes the
/// way `conclude` says.
pub struct HoldingAction {
    pub conclude: ConcludeBehavior,
}

impl AggregateAction for HoldingAction {
    fn handle_event(
        &self,
        event: &Event,
        input: &mut AggregateActionInput<'_>,
    ) -> ActionResult<AggregateActionResponse> {
        if let Some(handle) = event.event_handle() {
            input.completion_handle().attach(handle.clone());
        }
        Ok(AggregateActionResponse::null_event())
    }

    fn conclude_group(
        &self,
        input: &mut AggregateActionInput<'_>,
    ) -> ActionResult<AggregateActionOutput> {
        match self.conclude {
            ConcludeBehavior::Emit => {
                let event = Event::from_map(input.identification_keys().to_map())
                    .with_handle(input.completion_handle().clone());
                Ok(AggregateActionOutput::new(vec![event]))
            }
            ConcludeBehavior::Empty => Ok(AggregateActionOutput::empty()),
            ConcludeBehavior::Fail => Err(ActionError::Processing("conclude failed".to_string())),
            ConcludeBehavior::Panic => panic!("conclude_group blew up"),
        }
    }

    fn holds_events(&self) -> bool {
        true
    }
}
