//! # Controller configuration.
//!
//! Provides [`ControllerConfig`]: centralized settings for one controller instance.
//!
//! ## Sentinel values
//! - `history_limit = 0` → clamped to 1 (the newest entry is always kept)
//! - `bus_capacity = 0` → clamped to 1 (enforced by Bus as well)
//! - `progress_capacity = 0` → clamped to 1

/// Configuration for the controller runtime.
///
/// ## Field semantics
/// - `history_limit`: Maximum number of tracked states kept after pruning
/// - `bus_capacity`: Event bus ring buffer size
/// - `progress_capacity`: Per-task progress ring buffer size
///
/// ## Notes
/// All fields are public for flexibility. Prefer using helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// Number of states retained in the history.
    ///
    /// Pruning removes the oldest finished states first. Active states are never
    /// evicted, so the history may exceed this limit while many requests are
    /// pending or running.
    pub history_limit: usize,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items.
    pub bus_capacity: usize,

    /// Capacity of each task's progress channel.
    ///
    /// Progress observers that fall behind skip the oldest values.
    pub progress_capacity: usize,
}

impl ControllerConfig {
    /// Returns the history limit clamped to a minimum of 1.
    #[inline]
    pub fn history_limit_clamped(&self) -> usize {
        self.history_limit.max(1)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns a progress capacity clamped to a minimum of 1.
    #[inline]
    pub fn progress_capacity_clamped(&self) -> usize {
        self.progress_capacity.max(1)
    }
}

impl Default for ControllerConfig {
    /// Default configuration:
    ///
    /// - `history_limit = 50`
    /// - `bus_capacity = 1024`
    /// - `progress_capacity = 64`
    fn default() -> Self {
        Self {
            history_limit: 50,
            bus_capacity: 1024,
            progress_capacity: 64,
        }
    }
}
