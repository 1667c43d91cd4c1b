//! # Subscriber extension point.
//!
//! Implement [`Subscribe`] to react to controller events: audit trails, metrics,
//! notification badges. Register implementations with
//! [`ControllerBuilder::with_subscribers`](crate::ControllerBuilder::with_subscribers).
//!
//! A subscriber never runs on the controller actor. The [`SubscriberSet`](super::SubscriberSet)
//! gives it its own worker task and a bounded queue sized by
//! [`Subscribe::queue_capacity`]; when that queue is full the event is dropped for
//! this subscriber alone and a `SubscriberOverflow` event is published. A panic in
//! `on_event` is contained and published as `SubscriberPanicked`, and the worker
//! moves on to the next event.
//!
//! ```rust
//! use async_trait::async_trait;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use taskwarden::{Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct FailureCounter(AtomicUsize);
//!
//! #[async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::TaskFailed | EventKind::TimeoutHit) {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "failure-counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Consumer of controller events.
///
/// Events arrive one at a time, in publication order. Long-running work inside
/// `on_event` only delays this subscriber's own queue.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event on the subscriber's worker task.
    async fn on_event(&self, event: &Event);

    /// Label used in logs and in overflow/panic events.
    ///
    /// Defaults to the type name; short names read better.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Queue length for this subscriber (values below 1 are raised to 1). Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
