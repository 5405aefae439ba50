use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;

use crate::CompletionHandle;
use crate::Group;
use crate::GroupData;
use crate::GroupKey;
use crate::GroupState;
use crate::HandleGuard;

/// An action's view of one group while the handle gate is held.
pub struct AggregateActionInput<'a> {
    key: &'a GroupKey,
    group: &'a Group,
    data: &'a mut GroupData,
}

impl<'a> AggregateActionInput<'a> {
    pub(crate) fn new(
        key: &'a GroupKey,
        guard: &'a mut HandleGuard<'_>,
    ) -> Self {
        let group = guard.group();
        Self {
            key,
            group,
            data: guard,
        }
    }

    /// Field name to value mapping of the group's key
    pub fn identification_keys(&self) -> &GroupKey {
        self.key
    }

    pub fn group_state(&self) -> &GroupState {
        &self.data.state
    }

    pub fn group_state_mut(&mut self) -> &mut GroupState {
        &mut self.data.state
    }

    /// Handle representing the lifecycle of this window's output
    pub fn completion_handle(&self) -> &CompletionHandle {
        &self.data.completion_handle
    }

    /// Wall-clock start of the current window
    pub fn window_started_at(&self) -> SystemTime {
        self.group.started_at_wall()
    }

    /// Replaces the window-length rule for this window only. The predicate is
    /// cleared when the group is reset.
    pub fn set_custom_should_conclude(
        &self,
        predicate: impl Fn(Duration) -> bool + Send + Sync + 'static,
    ) {
        self.group.set_custom_should_conclude(Arc::new(predicate));
    }
}
