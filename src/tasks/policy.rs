//! # Per-kind collision and error policies
//!
//! The controller treats every task kind as a **slot**: at any given time at most
//! **one** request of a kind runs. When a new request of the same kind arrives
//! while another is active, the [`CollisionPolicy`] decides what happens.
//!
//! ## Invariants
//! - Requests of the same kind never run in parallel.
//! - Queued requests start strictly in submission order.
//! - Different kinds never block each other.

/// Policy for same-kind submissions while a request of that kind is active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Queue the request (FIFO) behind the active one.
    ///
    /// Use when every submission must execute, e.g. sequential writes.
    #[default]
    Enqueue,

    /// Finish the new request as skipped right away.
    ///
    /// Use when redundant work should be avoided, e.g. a periodic sync that is
    /// already in flight. The skipped request never becomes running.
    SkipIfActive,
}

/// How loudly a task failure is reported.
///
/// Severity only selects reporters; it never changes the terminal state and never
/// causes a retry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Problem reporter only.
    #[default]
    Silent,
    /// Problem reporter and exception reporter.
    Alert,
}

impl ErrorSeverity {
    /// True if the exception reporter must be notified.
    #[inline]
    pub fn is_alert(&self) -> bool {
        matches!(self, ErrorSeverity::Alert)
    }
}
