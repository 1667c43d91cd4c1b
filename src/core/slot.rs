use std::collections::VecDeque;

use crate::tasks::TaskId;

/// Execution slot of a single task kind.
///
/// At most one request per kind runs at a time; the rest wait in FIFO order.
#[derive(Debug, Default)]
pub(super) struct SlotState {
    /// Request currently running, if any.
    pub running: Option<TaskId>,

    /// Pending requests (FIFO order).
    pub queue: VecDeque<TaskId>,
}

impl SlotState {
    /// True when a request of this kind is running.
    pub fn is_busy(&self) -> bool {
        self.running.is_some()
    }

    /// Drops `id` from the wait queue. Returns `true` if it was queued.
    pub fn dequeue(&mut self, id: TaskId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|queued| *queued != id);
        self.queue.len() != before
    }
}
