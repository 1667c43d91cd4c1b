//! # Run a single task execution.
//!
//! Executes one [`Task`] body with optional timeout and cancellation, and turns
//! whatever happens into exactly one `Result`.
//!
//! ## Flow
//! ```text
//! Success:       task.run() → Ok(output)
//! Failure:       task.run() → Err(Fail)
//! Panic:         task.run() panics → Err(Panicked)
//! Cancellation:  token cancelled → body dropped → Err(Canceled)
//! Timeout:       timer expires → cancel token → body dropped → Err(Timeout)
//! ```
//!
//! ## Rules
//! - The timer is armed when `run_once` is first polled, i.e. when execution starts.
//! - Cancellation wins over a result that becomes ready in the same poll.
//! - The token in the context is cancelled on timeout, so helpers spawned by the
//!   body observe it too.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::time;

use crate::{
    error::TaskError,
    tasks::{TaskContext, TaskOutput, TaskRef},
};

/// Executes `task` once with the given context.
///
/// ### Timeout behavior
/// If `timeout` is `Some(dur)` and `dur > 0`:
/// - Wraps execution in `tokio::time::timeout`
/// - On expiry: cancels the context token, returns `Timeout`
pub(super) async fn run_once(
    task: TaskRef,
    ctx: TaskContext,
    timeout: Option<Duration>,
) -> Result<TaskOutput, TaskError> {
    let token = ctx.token().clone();
    let body = AssertUnwindSafe(task.run(ctx)).catch_unwind();

    let timed = async {
        let res = match timeout.filter(|d| !d.is_zero()) {
            Some(dur) => match time::timeout(dur, body).await {
                Ok(res) => res,
                Err(_elapsed) => {
                    token.cancel();
                    return Err(TaskError::Timeout { timeout: dur });
                }
            },
            None => body.await,
        };
        res.unwrap_or_else(|payload| {
            Err(TaskError::Panicked {
                reason: panic_reason(payload.as_ref()),
            })
        })
    };

    tokio::select! {
        biased;
        _ = token.cancelled() => Err(TaskError::Canceled),
        res = timed => res,
    }
}

/// Calls synchronous user code on the actor; a panic becomes its message.
pub(super) fn guarded<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    std::panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_reason(payload.as_ref()))
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
