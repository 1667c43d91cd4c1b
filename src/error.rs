//! Error types used by the controller and by tasks.
//!
//! This module defines two main error enums:
//!
//! - [`ControllerError`] - errors returned synchronously by the controller handle.
//! - [`TaskError`] - terminal errors recorded on a task's state.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//! Task errors never cross the controller boundary: they are only observable through
//! the [`TaskState`](crate::TaskState) of the request that produced them.

use std::time::Duration;
use thiserror::Error;

/// # Errors returned by the controller handle.
///
/// These are the only errors a caller sees directly; everything that happens during
/// execution is reported through the task history instead.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    /// No factory is registered for the request's task kind.
    #[error("no task factory registered for kind {kind}")]
    MissingFactory {
        /// Debug rendering of the unknown kind.
        kind: String,
    },

    /// The controller was closed and accepts no new work.
    #[error("controller closed")]
    Closed,
}

impl ControllerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskwarden::ControllerError;
    ///
    /// let err = ControllerError::MissingFactory { kind: "Sync".into() };
    /// assert_eq!(err.as_label(), "controller_missing_factory");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ControllerError::MissingFactory { .. } => "controller_missing_factory",
            ControllerError::Closed => "controller_closed",
        }
    }
}

/// # Terminal errors of a task execution.
///
/// Recorded as the outcome of a finished [`TaskState`](crate::TaskState).
/// Errors are cheap to clone so that every snapshot can carry them.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Task execution exceeded its configured timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Task was cancelled through [`Controller::cancel`](crate::Controller::cancel)
    /// or by controller shutdown before it started.
    #[error("task cancelled")]
    Canceled,

    /// Task body returned an error.
    #[error("execution failed: {reason}")]
    Fail {
        /// The underlying error message.
        reason: String,
    },

    /// Task body panicked; the panic was contained by the runner.
    #[error("task panicked: {reason}")]
    Panicked {
        /// Panic payload, if it was a string.
        reason: String,
    },
}

impl TaskError {
    /// Convenience constructor for task bodies.
    ///
    /// ```
    /// use taskwarden::TaskError;
    ///
    /// let err = TaskError::fail("disk full");
    /// assert_eq!(err.to_string(), "execution failed: disk full");
    /// ```
    pub fn fail(reason: impl Into<String>) -> Self {
        TaskError::Fail {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskwarden::TaskError;
    /// use std::time::Duration;
    ///
    /// let err = TaskError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "task_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Timeout { .. } => "task_timeout",
            TaskError::Canceled => "task_canceled",
            TaskError::Fail { .. } => "task_failed",
            TaskError::Panicked { .. } => "task_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            TaskError::Canceled => "cancelled".to_string(),
            TaskError::Fail { reason } => format!("error: {reason}"),
            TaskError::Panicked { reason } => format!("panic: {reason}"),
        }
    }

    /// True for errors that originate from the controller (timeout, cancellation)
    /// rather than from the task body itself.
    pub fn is_controller_imposed(&self) -> bool {
        matches!(self, TaskError::Timeout { .. } | TaskError::Canceled)
    }
}
