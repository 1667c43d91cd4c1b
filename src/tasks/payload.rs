//! # Opaque, shareable payloads.
//!
//! Request arguments and task results are only understood by the task that
//! consumes or produces them; the controller just moves them around. [`Payload`]
//! is a cheap-to-clone, type-erased box that the task side downcasts.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Type-erased value shared between a request, its task and its observers.
#[derive(Clone, Default)]
pub struct Payload(Option<Arc<dyn Any + Send + Sync>>);

impl Payload {
    /// Wraps a value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Some(Arc::new(value)))
    }

    /// Payload carrying nothing.
    pub fn empty() -> Self {
        Self(None)
    }

    /// True if no value was attached.
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Borrows the value as `T`, if that is what it holds.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.0.as_deref().and_then(|v| v.downcast_ref::<T>())
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("Payload(..)"),
            None => f.write_str("Payload(empty)"),
        }
    }
}

/// Arguments attached to a [`TaskRequest`](crate::TaskRequest).
pub type TaskArgs = Payload;

/// Value produced by a successful task.
pub type TaskOutput = Payload;
