//! Wall-clock source for task timestamps.
//!
//! Timestamps recorded on [`TaskState`](crate::TaskState) come from a [`Clock`].
//! Timeouts do not: they run on tokio's timer, so paused-time tests stay deterministic.

use std::time::SystemTime;

/// Source of "now" for lifecycle timestamps.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> SystemTime;
}

/// [`Clock`] backed by [`SystemTime::now`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}
