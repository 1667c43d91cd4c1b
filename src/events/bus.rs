//! # Controller event bus.
//!
//! [`Bus`] wraps a [`tokio::sync::broadcast`] sender. The controller actor publishes
//! lifecycle events on it, subscriber workers publish overflow/panic reports, and
//! [`Controller::subscribe`](crate::Controller::subscribe) hands out receivers.
//!
//! ```text
//! ControllerActor ─┐                ┌─► subscriber_listener ─► SubscriberSet
//! SubscriberSet  ──┴─► Bus (ring) ──┴─► Controller::subscribe() receivers
//! ```
//!
//! Publishing never waits. A receiver that falls more than `bus_capacity` events
//! behind gets `RecvError::Lagged` and resumes at the oldest retained event; with no
//! receiver attached, events are simply discarded.

use tokio::sync::broadcast;

use super::event::Event;

/// Cloneable publisher side of the event stream.
#[derive(Clone, Debug)]
pub struct Bus {
    sender: broadcast::Sender<Event>,
}

impl Bus {
    /// Bus retaining up to `capacity` events per lagging receiver (at least one).
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Sends `event` to every receiver attached right now.
    pub fn publish(&self, event: Event) {
        // Err only means nobody listens.
        let _ = self.sender.send(event);
    }

    /// Attaches a receiver; it observes events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}
