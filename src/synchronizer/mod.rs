//! Ingestion/finalization exclusion protocol.
//!
//! Every group carries two gates. Finalize takes the conclude gate with a
//! non-blocking attempt and then the handle gate; ingest passes through the
//! conclude gate as a turnstile and then takes the handle gate. The result:
//!
//! - action callbacks for one group never overlap, since both run under the
//!   handle gate;
//! - of simultaneous finalize attempts only the one winning the conclude gate
//!   runs, the others return an empty output at once;
//! - an ingest arriving while a finalize is in flight waits for it, then
//!   finds the group evicted and retries on a fresh instance;
//! - different groups share no gate, so they never block each other.


use std::any::Any;
use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use tracing::error;
use tracing::trace;

use crate::AggregateAction;
use crate::AggregateActionInput;
use crate::AggregateActionOutput;
use crate::AggregateActionResponse;
use crate::AggregateMetrics;
use crate::Event;
use crate::Group;
use crate::GroupKey;
use crate::GroupRegistry;

pub struct AggregateSynchronizer {
    action: Arc<dyn AggregateAction>,
    registry: Arc<GroupRegistry>,
    metrics: AggregateMetrics,
    window: Duration,
}

impl AggregateSynchronizer {
    pub fn new(
        action: Arc<dyn AggregateAction>,
        registry: Arc<GroupRegistry>,
        metrics: AggregateMetrics,
        window: Duration,
    ) -> Self {
        Self {
            action,
            registry,
            metrics,
            window,
        }
    }

    /// Finalizes `group` if it is due (or `force_conclude` is set).
    ///
    /// Returns an empty output when another finalize holds the group, when
    /// the group was already evicted, or when it is no longer due.
    ///
    /// A window that concludes with no events releases its completion handle
    /// right away: successfully for an intentional empty output, as failed
    /// when the action errored or panicked.
    pub fn conclude(
        &self,
        key: &GroupKey,
        group: &Arc<Group>,
        force_conclude: bool,
    ) -> AggregateActionOutput {
        let Some(conclude_gate) = group.try_lock_conclude() else {
            trace!(key = %key, "conclude already in progress");
            return AggregateActionOutput::empty();
        };
        let mut guard = group.lock_handle();

        let output = if guard.is_evicted() {
            debug!(key = %key, "group already concluded");
            AggregateActionOutput::empty()
        } else if force_conclude || group.should_conclude(self.window) {
            let result = {
                let mut input = AggregateActionInput::new(key, &mut guard);
                catch_unwind(AssertUnwindSafe(|| self.action.conclude_group(&mut input)))
            };
            let (output, succeeded) = match result {
                Ok(Ok(output)) => (output, true),
                Ok(Err(e)) => {
                    error!(key = %key, error = %e, "error while concluding group");
                    self.metrics.conclude_processing_errors.inc();
                    (AggregateActionOutput::empty(), false)
                }
                Err(panic) => {
                    error!(key = %key, panic = %panic_message(&*panic), "action panicked while concluding group");
                    self.metrics.conclude_processing_errors.inc();
                    (AggregateActionOutput::empty(), false)
                }
            };
            // No output carries this window's handle, so settle it before reset.
            if output.is_empty() {
                guard.completion_handle().release(succeeded);
            }
            self.registry.close_group(key, group, &mut guard);
            output
        } else {
            debug!(key = %key, "group no longer due for conclusion");
            AggregateActionOutput::empty()
        };

        drop(guard);
        drop(conclude_gate);
        output
    }

    /// Routes `event` into the group for `key`.
    ///
    /// Action failures are contained: the event passes through unchanged.
    pub fn handle_event(
        &self,
        event: &Event,
        key: &GroupKey,
        mut group: Arc<Group>,
    ) -> AggregateActionResponse {
        loop {
            group.pass_conclude_turnstile();
            let mut guard = group.lock_handle();

            if guard.is_evicted() {
                drop(guard);
                trace!(key = %key, "group evicted before ingest, resolving again");
                group = self.registry.get_or_create(key);
                continue;
            }

            let result = {
                let mut input = AggregateActionInput::new(key, &mut guard);
                catch_unwind(AssertUnwindSafe(|| self.action.handle_event(event, &mut input)))
            };
            let response = match result {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    error!(key = %key, error = %e, "error while handling event, passing it through");
                    self.metrics.handle_processing_errors.inc();
                    AggregateActionResponse::from_event(event.clone())
                }
                Err(panic) => {
                    error!(key = %key, panic = %panic_message(&*panic), "action panicked while handling event, passing it through");
                    self.metrics.handle_processing_errors.inc();
                    AggregateActionResponse::from_event(event.clone())
                }
            };

            self.registry.reinsert(key, &group);
            drop(guard);
            return response;
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
