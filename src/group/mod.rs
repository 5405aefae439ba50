//! Per-key aggregation groups.
//!
//! A [`Group`] is a passive record: a state bag, a window clock, an optional
//! custom conclude predicate and a completion handle, plus the two gates the
//! synchronizer uses to keep ingestion and finalization apart:
//!
//! - the *conclude gate*, a bare `Mutex<()>` that only orders operations;
//! - the *handle gate*, the `Mutex` that owns the group's mutable data.
//!
//! Holding a [`HandleGuard`] is the proof that the caller may read or write
//! the group's state.

mod registry;
pub use registry::*;

#[cfg(test)]
mod group_test;

use std::fmt;
use std::ops::Deref;
use std::ops::DerefMut;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;
use std::time::SystemTime;

use parking_lot::Mutex;
use parking_lot::MutexGuard;
use parking_lot::RwLock;
use serde_json::Map;
use serde_json::Value;

use crate::CompletionHandle;

/// Custom conclude condition, applied to the time elapsed since the window started.
pub type ConcludePredicate = Arc<dyn Fn(Duration) -> bool + Send + Sync + 'static>;

/// Opaque key-value bag owned by one group and written only by its action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupState(Map<String, Value>);

impl GroupState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_map(&self) -> Map<String, Value> {
        self.0.clone()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl Deref for GroupState {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for GroupState {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Map<String, Value>> for GroupState {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Mutable part of a group, guarded by the handle gate.
#[derive(Debug)]
pub struct GroupData {
    pub(crate) state: GroupState,
    pub(crate) completion_handle: CompletionHandle,
    /// Set once the group has been removed from the registry
    pub(crate) evicted: bool,
}

impl GroupData {
    fn new() -> Self {
        Self {
            state: GroupState::new(),
            completion_handle: CompletionHandle::new(),
            evicted: false,
        }
    }

    pub fn state(&self) -> &GroupState {
        &self.state
    }

    pub fn completion_handle(&self) -> &CompletionHandle {
        &self.completion_handle
    }

    pub fn is_evicted(&self) -> bool {
        self.evicted
    }
}

struct WindowClock {
    started_at: Instant,
    started_at_wall: SystemTime,
    custom_should_conclude: Option<ConcludePredicate>,
}

impl WindowClock {
    fn start() -> Self {
        Self {
            started_at: Instant::now(),
            started_at_wall: SystemTime::now(),
            custom_should_conclude: None,
        }
    }
}

pub struct Group {
    conclude_gate: Mutex<()>,
    handle_gate: Mutex<GroupData>,
    // Kept outside the handle gate so sweeps can read it without waiting on ingestion.
    clock: RwLock<WindowClock>,
}

impl Group {
    pub fn new() -> Self {
        Self {
            conclude_gate: Mutex::new(()),
            handle_gate: Mutex::new(GroupData::new()),
            clock: RwLock::new(WindowClock::start()),
        }
    }

    /// True when the custom predicate (if the action set one) or the plain
    /// window length says this group is due.
    pub fn should_conclude(
        &self,
        window: Duration,
    ) -> bool {
        let (elapsed, predicate) = {
            let clock = self.clock.read();
            (clock.started_at.elapsed(), clock.custom_should_conclude.clone())
        };
        match predicate {
            Some(predicate) => predicate(elapsed),
            None => elapsed >= window,
        }
    }

    pub fn started_at(&self) -> Instant {
        self.clock.read().started_at
    }

    /// Wall-clock start of the current window
    pub fn started_at_wall(&self) -> SystemTime {
        self.clock.read().started_at_wall
    }

    pub fn set_custom_should_conclude(
        &self,
        predicate: ConcludePredicate,
    ) {
        self.clock.write().custom_should_conclude = Some(predicate);
    }

    pub fn has_custom_should_conclude(&self) -> bool {
        self.clock.read().custom_should_conclude.is_some()
    }

    /// Non-blocking attempt on the conclude gate.
    pub(crate) fn try_lock_conclude(&self) -> Option<MutexGuard<'_, ()>> {
        self.conclude_gate.try_lock()
    }

    /// Waits for any finalize holding the conclude gate to finish, without
    /// keeping the gate.
    pub(crate) fn pass_conclude_turnstile(&self) {
        drop(self.conclude_gate.lock());
    }

    pub(crate) fn lock_handle(&self) -> HandleGuard<'_> {
        HandleGuard {
            group: self,
            data: self.handle_gate.lock(),
        }
    }
}

impl Default for Group {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Group {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let clock = self.clock.read();
        f.debug_struct("Group")
            .field("started_at", &clock.started_at)
            .field("custom_should_conclude", &clock.custom_should_conclude.is_some())
            .finish_non_exhaustive()
    }
}

/// Exclusive access to a group's data, held for the duration of an action call.
pub struct HandleGuard<'a> {
    group: &'a Group,
    data: MutexGuard<'a, GroupData>,
}

impl<'a> HandleGuard<'a> {
    pub(crate) fn group(&self) -> &'a Group {
        self.group
    }

    /// Starts a fresh window: empty state, new start time, new completion
    /// handle, no custom predicate.
    pub fn reset(&mut self) {
        self.data.state.clear();
        self.data.completion_handle = CompletionHandle::new();
        *self.group.clock.write() = WindowClock::start();
    }

    pub(crate) fn mark_evicted(&mut self) {
        self.data.evicted = true;
    }
}

impl Deref for HandleGuard<'_> {
    type Target = GroupData;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl DerefMut for HandleGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}
