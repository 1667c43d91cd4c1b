//! # Task abstraction.
//!
//! This module defines the [`Task`] trait (async, cancelable) and the
//! [`TaskContext`] each execution receives. The common handle type is
//! [`TaskRef`], an `Arc<dyn Task>` suitable for sharing across the runtime.
//!
//! A task receives a [`CancellationToken`] inside its context and should check it at
//! safe points. The controller also drops the task future on cancel or timeout, so a
//! task that never checks the token is still torn down at its next `.await`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::payload::{TaskArgs, TaskOutput};
use super::progress::ProgressSender;
use super::request::TaskId;
use crate::error::TaskError;

/// # Shared handle to a task object.
pub type TaskRef = Arc<dyn Task>;

/// Everything a task execution gets from the controller.
#[derive(Clone, Debug)]
pub struct TaskContext {
    id: TaskId,
    args: TaskArgs,
    progress: ProgressSender,
    token: CancellationToken,
}

impl TaskContext {
    pub(crate) fn new(
        id: TaskId,
        args: TaskArgs,
        progress: ProgressSender,
        token: CancellationToken,
    ) -> Self {
        Self {
            id,
            args,
            progress,
            token,
        }
    }

    /// Id of the request being executed.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Request arguments.
    pub fn args(&self) -> &TaskArgs {
        &self.args
    }

    /// Progress write end.
    pub fn progress(&self) -> &ProgressSender {
        &self.progress
    }

    /// Cancelled on explicit cancel or timeout.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Shorthand for `token().is_cancelled()`.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// # Asynchronous, cancelable unit of work.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use taskwarden::{Task, TaskContext, TaskError, TaskOutput};
///
/// struct Count;
///
/// #[async_trait]
/// impl Task for Count {
///     async fn run(&self, ctx: TaskContext) -> Result<TaskOutput, TaskError> {
///         let upto = ctx.args().get::<u32>().copied().unwrap_or(3);
///         for i in 0..upto {
///             if ctx.is_cancelled() {
///                 return Err(TaskError::Canceled);
///             }
///             ctx.progress().send(format!("step {i}"));
///         }
///         Ok(TaskOutput::new(upto))
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Executes the task until completion or cancellation.
    async fn run(&self, ctx: TaskContext) -> Result<TaskOutput, TaskError>;
}
