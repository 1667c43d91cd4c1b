//! # Error reporting sinks.
//!
//! Every time a request finishes with an error the controller builds an
//! [`ErrorReport`] and hands it to the **problem reporter**. When the kind's
//! [`ErrorSeverity`] is `Alert`, the **exception reporter** receives it as well.
//!
//! ```text
//! Finished(Failed(err)) ──► problem reporter
//!                       └─► exception reporter   (severity == Alert)
//! ```
//!
//! Reporters are called synchronously from the controller actor: keep them cheap and
//! hand heavy work (uploads, disk) to a channel of your own.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::TaskError;
use crate::tasks::{ErrorSeverity, TaskId};

/// What reporters receive for one failed request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorReport {
    /// Request id.
    pub id: TaskId,
    /// Debug rendering of the task kind.
    pub kind: Arc<str>,
    /// Origin tag of the request, if any.
    pub origin: Option<Arc<str>>,
    /// Terminal error.
    pub error: TaskError,
    /// Severity configured for the kind.
    pub severity: ErrorSeverity,
}

/// Sink for task failures.
pub trait Reporter: Send + Sync + 'static {
    fn report(&self, report: &ErrorReport);
}

/// Shared handle to a reporter.
pub type ReporterRef = Arc<dyn Reporter>;

/// Default problem reporter: one record per failure.
///
/// Timeouts and cancellations are logged at `info`, failures of the task body at `warn`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogProblems;

impl Reporter for LogProblems {
    fn report(&self, r: &ErrorReport) {
        if r.error.is_controller_imposed() {
            info!(
                id = %r.id,
                kind = &*r.kind,
                origin = r.origin.as_deref(),
                error = r.error.as_label(),
                "task stopped: {}",
                r.error.as_message()
            );
            return;
        }
        warn!(
            id = %r.id,
            kind = &*r.kind,
            origin = r.origin.as_deref(),
            error = r.error.as_label(),
            "task problem: {}",
            r.error.as_message()
        );
    }
}

/// Default exception reporter: one `error` record per alert.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogExceptions;

impl Reporter for LogExceptions {
    fn report(&self, r: &ErrorReport) {
        error!(
            id = %r.id,
            kind = &*r.kind,
            origin = r.origin.as_deref(),
            error = r.error.as_label(),
            "task exception: {}",
            r.error
        );
    }
}

impl<F> Reporter for F
where
    F: Fn(&ErrorReport) + Send + Sync + 'static,
{
    fn report(&self, report: &ErrorReport) {
        self(report)
    }
}
