//! # Logging subscriber.
//!
//! [`LogWriter`] forwards controller events to `tracing`, one record per event,
//! with structured fields (`task`, `id`, `reason`, `timeout_ms`).
//!
//! ## Levels
//! ```text
//! trace  TaskSubmitted, TaskEvicted
//! debug  TaskStarting, TaskSucceeded, TaskSkipped, TaskCanceled
//! info   ControllerClosed
//! warn   TaskFailed, TimeoutHit
//! error  SubscriberOverflow, SubscriberPanicked
//! ```
//!
//! The library never installs a global `tracing` subscriber; the application does.

use async_trait::async_trait;
use tracing::{debug, error, info, trace, warn};

use super::Subscribe;
use crate::events::{Event, EventKind};

/// Subscriber that logs every event through `tracing`.
///
/// Enabled via the `logging` feature.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogWriter;

/// Static description of an event kind.
#[inline]
pub fn message_for(kind: EventKind) -> &'static str {
    match kind {
        // lifecycle
        EventKind::TaskSubmitted => "task submitted",
        EventKind::TaskStarting => "task is starting",
        EventKind::TaskSucceeded => "task succeeded",
        EventKind::TaskFailed => "task failed",
        EventKind::TimeoutHit => "task exceeded its configured timeout",
        EventKind::TaskCanceled => "task cancelled",
        EventKind::TaskSkipped => "task skipped",

        // history
        EventKind::TaskEvicted => "task evicted from history",
        EventKind::ControllerClosed => "controller closed",

        // subscriber
        EventKind::SubscriberOverflow => {
            "event dropped for a subscriber (queue full or worker closed)"
        }
        EventKind::SubscriberPanicked => "subscriber panicked while processing an event",
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let msg = message_for(e.kind);
        let task = e.task.as_deref().unwrap_or("unknown");
        let reason = e.reason.as_deref().unwrap_or("");
        let id_buf = e.id.map(|id| id.to_string()).unwrap_or_default();
        let id = id_buf.as_str();

        match e.kind {
            EventKind::TaskSubmitted | EventKind::TaskEvicted => {
                trace!(seq = e.seq, task, id, "{msg}")
            }
            EventKind::TaskStarting => {
                debug!(seq = e.seq, task, id, timeout_ms = e.timeout_ms, "{msg}")
            }
            EventKind::TaskSucceeded | EventKind::TaskCanceled => {
                debug!(seq = e.seq, task, id, "{msg}")
            }
            EventKind::TaskSkipped => debug!(seq = e.seq, task, id, reason, "{msg}"),
            EventKind::ControllerClosed => info!(seq = e.seq, "{msg}"),
            EventKind::TaskFailed => warn!(seq = e.seq, task, id, reason, "{msg}"),
            EventKind::TimeoutHit => {
                warn!(seq = e.seq, task, id, timeout_ms = e.timeout_ms, "{msg}")
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                error!(seq = e.seq, task, reason, "{msg}")
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
