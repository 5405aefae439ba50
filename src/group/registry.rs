use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::debug;
use tracing::trace;

use super::Group;
use super::HandleGuard;
use crate::GroupKey;

/// Thread-safe map of live groups.
///
/// No map guard is ever held while a group gate is being acquired: every
/// method clones the `Arc<Group>` out and releases the shard before returning.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: DashMap<GroupKey, Arc<Group>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self {
            groups: DashMap::new(),
        }
    }

    /// Returns the live group for `key`, creating one with a fresh window if absent.
    pub fn get_or_create(
        &self,
        key: &GroupKey,
    ) -> Arc<Group> {
        // Fast path: group already exists
        if let Some(group) = self.groups.get(key) {
            return group.value().clone();
        }

        // Slow path: the entry API serializes concurrent creators of the same key
        self.groups
            .entry(key.clone())
            .or_insert_with(|| {
                trace!(key = %key, "creating group");
                Arc::new(Group::new())
            })
            .value()
            .clone()
    }

    /// Point-in-time snapshot of groups whose window has elapsed, or of every
    /// group when `force_conclude` is set.
    pub fn due_for_conclusion(
        &self,
        window: Duration,
        force_conclude: bool,
    ) -> Vec<(GroupKey, Arc<Group>)> {
        self.groups
            .iter()
            .filter(|entry| force_conclude || entry.value().should_conclude(window))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Removes `key` only if it still maps to this exact `group`, then resets
    /// the group and marks it evicted.
    ///
    /// The caller proves it holds the group's handle gate by passing the guard.
    /// Returns whether the mapping was removed.
    pub fn close_group(
        &self,
        key: &GroupKey,
        group: &Arc<Group>,
        guard: &mut HandleGuard<'_>,
    ) -> bool {
        let removed = self
            .groups
            .remove_if(key, |_, current| Arc::ptr_eq(current, group))
            .is_some();
        if !removed {
            debug!(key = %key, "group was already replaced in registry; only resetting");
        }
        guard.reset();
        guard.mark_evicted();
        removed
    }

    /// Re-establishes `key -> group` after ingestion mutated the group.
    pub fn reinsert(
        &self,
        key: &GroupKey,
        group: &Arc<Group>,
    ) {
        self.groups.insert(key.clone(), group.clone());
    }

    pub fn get(
        &self,
        key: &GroupKey,
    ) -> Option<Arc<Group>> {
        self.groups.get(key).map(|entry| entry.value().clone())
    }

    pub fn size(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
