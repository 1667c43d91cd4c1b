//! # Observable lifecycle record of one request.
//!
//! [`TaskState`] is what observers receive in every snapshot. It is owned by the
//! controller and only mutated by the controller's transition methods; task code
//! reports through its [`TaskContext`](crate::TaskContext) instead.
//!
//! ## State machine
//! ```text
//! Pending ──start()──► Running ──finish(outcome)──► Finished
//!    └──────────────finish(Skipped | Failed(Canceled))──────┘
//! ```
//!
//! ## Rules
//! - Transitions only move forward; a finished state is never resurrected.
//! - `outcome` is `Some` iff the state is `Finished`.
//! - `started_at >= created_at`, `finished_at >= started_at` (clamped on transition).

use std::sync::Arc;
use std::time::SystemTime;

use futures::stream::BoxStream;

use super::payload::TaskOutput;
use super::progress::{Progress, ProgressHub};
use super::request::{TaskId, TaskKind, TaskRequest};
use crate::error::TaskError;

/// Execution status of a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExecutionState {
    /// Submitted, waiting for its slot.
    Pending,
    /// Currently executing.
    Running,
    /// Terminal.
    Finished,
}

/// Terminal result of a request. Exactly one per finished state.
#[derive(Clone, Debug)]
pub enum Outcome {
    /// Task returned a value.
    Succeeded(TaskOutput),
    /// Task failed, timed out, panicked or was cancelled.
    Failed(TaskError),
    /// Task never ran (precondition not met or collision policy).
    Skipped,
}

/// Lifecycle record tracked by the controller.
#[derive(Clone, Debug)]
pub struct TaskState<K> {
    request: TaskRequest<K>,
    status: ExecutionState,
    created_at: SystemTime,
    started_at: Option<SystemTime>,
    finished_at: Option<SystemTime>,
    outcome: Option<Outcome>,
    progress: Arc<ProgressHub>,
}

impl<K: TaskKind> TaskState<K> {
    pub(crate) fn pending(
        request: TaskRequest<K>,
        created_at: SystemTime,
        progress: Arc<ProgressHub>,
    ) -> Self {
        Self {
            request,
            status: ExecutionState::Pending,
            created_at,
            started_at: None,
            finished_at: None,
            outcome: None,
            progress,
        }
    }

    /// Pending → Running. Returns `false` if the state was not pending.
    pub(crate) fn start(&mut self, now: SystemTime) -> bool {
        if self.status != ExecutionState::Pending {
            return false;
        }
        self.status = ExecutionState::Running;
        self.started_at = Some(now.max(self.created_at));
        true
    }

    /// Any active state → Finished. Returns `false` if already finished.
    ///
    /// Terminates the progress stream.
    pub(crate) fn finish(&mut self, now: SystemTime, outcome: Outcome) -> bool {
        if self.status == ExecutionState::Finished {
            return false;
        }
        let floor = self.started_at.unwrap_or(self.created_at);
        self.status = ExecutionState::Finished;
        self.finished_at = Some(now.max(floor));
        self.outcome = Some(outcome);
        self.progress.finish();
        true
    }

    pub(crate) fn progress_hub(&self) -> &Arc<ProgressHub> {
        &self.progress
    }

    /// The submitted request.
    pub fn request(&self) -> &TaskRequest<K> {
        &self.request
    }

    /// Request id.
    pub fn id(&self) -> TaskId {
        self.request.id()
    }

    /// Task kind.
    pub fn kind(&self) -> K {
        self.request.kind()
    }

    /// Execution status.
    pub fn status(&self) -> ExecutionState {
        self.status
    }

    /// Submission time.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Start time, once running.
    pub fn started_at(&self) -> Option<SystemTime> {
        self.started_at
    }

    /// Terminal time, once finished.
    pub fn finished_at(&self) -> Option<SystemTime> {
        self.finished_at
    }

    /// Terminal outcome, once finished.
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// Pending or running.
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            ExecutionState::Pending | ExecutionState::Running
        )
    }

    pub fn is_finished(&self) -> bool {
        self.status == ExecutionState::Finished
    }

    pub fn is_successful(&self) -> bool {
        matches!(self.outcome, Some(Outcome::Succeeded(_)))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, Some(Outcome::Failed(_)))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, Some(Outcome::Skipped))
    }

    /// Result value of a successful run.
    pub fn result(&self) -> Option<&TaskOutput> {
        match &self.outcome {
            Some(Outcome::Succeeded(out)) => Some(out),
            _ => None,
        }
    }

    /// Terminal error of a failed run.
    pub fn error(&self) -> Option<&TaskError> {
        match &self.outcome {
            Some(Outcome::Failed(err)) => Some(err),
            _ => None,
        }
    }

    /// The result, or why there is none.
    ///
    /// Skipped and still-active states yield [`StateError::NoResult`].
    pub fn result_or_error(&self) -> Result<&TaskOutput, StateError> {
        match &self.outcome {
            Some(Outcome::Succeeded(out)) => Ok(out),
            Some(Outcome::Failed(err)) => Err(StateError::Failed(err.clone())),
            Some(Outcome::Skipped) | None => Err(StateError::NoResult {
                status: self.status,
                skipped: self.is_skipped(),
            }),
        }
    }

    /// Progress signals from now on, ending with [`Progress::Finished`].
    ///
    /// Each call returns an independent stream.
    pub fn progress(&self) -> BoxStream<'static, Progress> {
        self.progress.subscribe()
    }
}

/// Why [`TaskState::result_or_error`] has no result.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// The task failed.
    #[error(transparent)]
    Failed(TaskError),

    /// The task is still active, or was skipped.
    #[error("no result (status={status:?}, skipped={skipped})")]
    NoResult {
        status: ExecutionState,
        skipped: bool,
    },
}
