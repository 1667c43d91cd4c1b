//! # Function-backed task (`TaskFn`)
//!
//! [`TaskFn`] wraps a closure `F: Fn(TaskContext) -> Fut`, producing a fresh
//! future per run. No state is shared between runs unless the closure captures
//! an `Arc<...>` explicitly.
//!
//! ## Example
//! ```rust
//! use taskwarden::{TaskContext, TaskError, TaskFn, TaskOutput, TaskRef};
//!
//! let t: TaskRef = TaskFn::arc(|ctx: TaskContext| async move {
//!     ctx.progress().send("working");
//!     Ok::<_, TaskError>(TaskOutput::new("done"))
//! });
//! # let _ = t;
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use super::payload::TaskOutput;
use super::task::{Task, TaskContext};
use crate::error::TaskError;

/// Function-backed task implementation.
#[derive(Debug)]
pub struct TaskFn<F> {
    f: F,
}

impl<F> TaskFn<F> {
    /// Creates a new function-backed task.
    ///
    /// Prefer [`TaskFn::arc`] when you immediately need a [`TaskRef`](crate::TaskRef).
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the task and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Task for TaskFn<F>
where
    F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<TaskOutput, TaskError>> + Send + 'static,
{
    async fn run(&self, ctx: TaskContext) -> Result<TaskOutput, TaskError> {
        (self.f)(ctx).await
    }
}
