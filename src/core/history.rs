//! # Bounded, insertion-ordered task history.
//!
//! [`History`] keeps every tracked request in submission order together with the
//! [`TaskConfig`] captured when it was submitted.
//!
//! ## Pruning
//! ```text
//! limit = 3, entries (oldest → newest):
//!   [F1, R2, F3, P4, F5]      F = finished, R = running, P = pending
//!   prune → evicts F1, F3     (oldest finished first; active entries stay)
//!   [R2, P4, F5]
//! ```
//! When more than `limit` entries are active nothing else can be evicted and the
//! history temporarily exceeds the limit.

use std::collections::{HashMap, VecDeque};

use crate::tasks::{TaskConfig, TaskId, TaskKind, TaskState};

/// One tracked request.
pub(super) struct Tracked<K> {
    pub state: TaskState<K>,
    pub config: TaskConfig,
}

pub(super) struct History<K> {
    order: VecDeque<TaskId>,
    entries: HashMap<TaskId, Tracked<K>>,
}

impl<K: TaskKind> History<K> {
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Appends a new entry as the newest one. Ignored if the id is already tracked.
    pub fn insert(&mut self, state: TaskState<K>, config: TaskConfig) {
        let id = state.id();
        if self.entries.contains_key(&id) {
            return;
        }
        self.order.push_back(id);
        self.entries.insert(id, Tracked { state, config });
    }

    pub fn get(&self, id: TaskId) -> Option<&Tracked<K>> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut Tracked<K>> {
        self.entries.get_mut(&id)
    }

    /// Ids of entries that are still pending or running, oldest first.
    pub fn active_ids(&self) -> Vec<TaskId> {
        self.order
            .iter()
            .filter(|id| self.entries.get(id).is_some_and(|t| t.state.is_active()))
            .copied()
            .collect()
    }

    /// Clones every state in submission order.
    pub fn snapshot(&self) -> Vec<TaskState<K>> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .map(|t| t.state.clone())
            .collect()
    }

    /// Evicts the oldest finished entries until at most `limit` remain.
    ///
    /// Returns the evicted states, oldest first.
    pub fn prune(&mut self, limit: usize) -> Vec<TaskState<K>> {
        let mut excess = self.entries.len().saturating_sub(limit);
        if excess == 0 {
            return Vec::new();
        }

        let mut evicted = Vec::with_capacity(excess);
        let entries = &mut self.entries;
        self.order.retain(|id| {
            if excess == 0 {
                return true;
            }
            let finished = entries.get(id).is_some_and(|t| t.state.is_finished());
            if !finished {
                return true;
            }
            if let Some(t) = entries.remove(id) {
                evicted.push(t.state);
            }
            excess -= 1;
            false
        });
        evicted
    }
}
