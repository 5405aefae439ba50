//! Completion handles.
//!
//! A [`CompletionHandle`] tracks whether the output derived from some input
//! has been fully processed downstream. Handles can be chained: attaching an
//! input event's handle to a group's handle makes the input's acknowledgement
//! wait for the aggregated output's acknowledgement.

use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

type ReleaseCallback = Box<dyn FnOnce(bool) + Send + 'static>;

/// Shared acknowledgement token. Cloning yields another reference to the same handle.
#[derive(Clone)]
pub struct CompletionHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    id: u64,
    state: Mutex<HandleState>,
}

#[derive(Default)]
struct HandleState {
    /// `Some(success)` once released
    outcome: Option<bool>,
    attached: Vec<CompletionHandle>,
    callbacks: Vec<ReleaseCallback>,
}

impl CompletionHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HandleInner {
                id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
                state: Mutex::new(HandleState::default()),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Makes `other` complete together with this handle.
    ///
    /// If this handle was already released, `other` is released right away
    /// with the same outcome.
    pub fn attach(
        &self,
        other: CompletionHandle,
    ) {
        if self.ptr_eq(&other) {
            return;
        }
        let released = {
            let mut state = self.inner.state.lock();
            match state.outcome {
                Some(outcome) => Some(outcome),
                None => {
                    state.attached.push(other.clone());
                    None
                }
            }
        };
        if let Some(outcome) = released {
            other.release(outcome);
        }
    }

    /// Registers a callback invoked once on release.
    pub fn on_release(
        &self,
        callback: impl FnOnce(bool) + Send + 'static,
    ) {
        let outcome = {
            let mut state = self.inner.state.lock();
            match state.outcome {
                Some(outcome) => outcome,
                None => {
                    state.callbacks.push(Box::new(callback));
                    return;
                }
            }
        };
        callback(outcome);
    }

    /// Releases the handle and everything attached to it.
    ///
    /// Returns `false` if the handle had already been released; later calls
    /// never change the recorded outcome.
    pub fn release(
        &self,
        success: bool,
    ) -> bool {
        let (attached, callbacks) = {
            let mut state = self.inner.state.lock();
            if state.outcome.is_some() {
                return false;
            }
            state.outcome = Some(success);
            (
                std::mem::take(&mut state.attached),
                std::mem::take(&mut state.callbacks),
            )
        };

        trace!(
            handle_id = self.inner.id,
            success,
            attached = attached.len(),
            "completion handle released"
        );

        // Cascade outside the lock.
        for callback in callbacks {
            callback(success);
        }
        for handle in attached {
            handle.release(success);
        }
        true
    }

    pub fn is_released(&self) -> bool {
        self.inner.state.lock().outcome.is_some()
    }

    /// `None` while pending, `Some(success)` once released
    pub fn outcome(&self) -> Option<bool> {
        self.inner.state.lock().outcome
    }

    pub fn attached_count(&self) -> usize {
        self.inner.state.lock().attached.len()
    }

    pub fn ptr_eq(
        &self,
        other: &CompletionHandle,
    ) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for CompletionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for CompletionHandle {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for CompletionHandle {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("CompletionHandle")
            .field("id", &self.inner.id)
            .field("outcome", &state.outcome)
            .field("attached", &state.attached.len())
            .finish()
    }
}
