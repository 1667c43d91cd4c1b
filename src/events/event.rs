//! # Controller events.
//!
//! An [`Event`] describes one thing that happened inside a controller: a request
//! moved through its lifecycle, aged out of the history, or a subscriber could not
//! keep up. [`EventKind`] says which; the optional fields carry the details
//! relevant to that kind.
//!
//! `seq` comes from a process-wide counter, so sorting by it recovers publication
//! order even across controllers and subscribers.
//!
//! ```rust
//! use std::time::Duration;
//! use taskwarden::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TimeoutHit)
//!     .with_task("Sync")
//!     .with_timeout(Duration::from_secs(5));
//!
//! assert_eq!(ev.kind, EventKind::TimeoutHit);
//! assert_eq!(ev.task.as_deref(), Some("Sync"));
//! assert_eq!(ev.timeout_ms, Some(5_000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::tasks::TaskId;

static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// What an [`Event`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Lifecycle events ===
    /// A new request was accepted and is now tracked.
    ///
    /// Sets: `task`, `id`
    TaskSubmitted,

    /// A request left the queue and starts executing.
    ///
    /// Sets: `task`, `id`, `timeout_ms` (if configured)
    TaskStarting,

    /// A request finished with a result.
    ///
    /// Sets: `task`, `id`
    TaskSucceeded,

    /// A request finished with an error raised by its body (or a panic).
    ///
    /// Sets: `task`, `id`, `reason`
    TaskFailed,

    /// A request exceeded its configured timeout.
    ///
    /// Sets: `task`, `id`, `timeout_ms`
    TimeoutHit,

    /// A request was cancelled (explicitly or by shutdown).
    ///
    /// Sets: `task`, `id`
    TaskCanceled,

    /// A request was skipped (precondition or collision policy).
    ///
    /// Sets: `task`, `id`, `reason`
    TaskSkipped,

    // === History events ===
    /// A request aged out of the bounded history.
    ///
    /// Sets: `task`, `id`
    TaskEvicted,

    /// Controller stopped accepting work.
    ControllerClosed,

    // === Subscriber events ===
    /// An event was not delivered to a subscriber (queue full or worker gone).
    ///
    /// Sets: `task` (subscriber name), `reason`
    SubscriberOverflow,

    /// A subscriber panicked inside `on_event`.
    ///
    /// Sets: `task` (subscriber name), `reason`
    SubscriberPanicked,
}

/// One published event. See [`EventKind`] for which optional fields are set.
#[derive(Clone, Debug)]
pub struct Event {
    /// Publication order across the process.
    pub seq: u64,
    /// When the event was built.
    pub at: SystemTime,
    pub kind: EventKind,
    /// Task kind label (or subscriber name), if applicable.
    pub task: Option<Arc<str>>,
    /// Request id, if applicable.
    pub id: Option<TaskId>,
    /// Human-readable reason (errors, skip cause, overflow details).
    pub reason: Option<Arc<str>>,
    /// Configured timeout, in milliseconds.
    pub timeout_ms: Option<u32>,
}

impl Event {
    /// Event of `kind`, stamped with the next sequence number and the current time.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            id: None,
            reason: None,
            timeout_ms: None,
        }
    }

    /// Sets `task`.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Sets `id`.
    #[inline]
    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets `reason`.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Sets `timeout_ms`, saturating at `u32::MAX`.
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// `SubscriberOverflow` for `subscriber`, with why the event was dropped.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// `SubscriberPanicked` for `subscriber`, with the panic message.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
