//! # Per-task progress channel.
//!
//! Every tracked request owns a [`ProgressHub`]: a broadcast channel the running
//! task writes to through a [`ProgressSender`], and that observers read through
//! [`TaskState::progress`](crate::TaskState::progress).
//!
//! ## Rules
//! - Observers only see values sent **after** they attached (no replay).
//! - Every stream ends with exactly one [`Progress::Finished`].
//! - After the hub is finished, new observers get `Finished` immediately.
//!
//! ```text
//! task ── ProgressSender::send() ──► broadcast ──► stream #1 ─► .. ─► Finished ─► end
//!                                            └──► stream #2 ─► .. ─► Finished ─► end
//! controller ── finish() ──► Finished
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};

/// One progress signal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Progress {
    /// Free-form status message from the task.
    Message(Arc<str>),
    /// Terminal sentinel: the execution context is gone.
    Finished,
}

/// Controller-owned progress channel for one request.
#[derive(Debug)]
pub(crate) struct ProgressHub {
    tx: broadcast::Sender<Progress>,
    finished: AtomicBool,
}

impl ProgressHub {
    pub(crate) fn new(capacity: usize) -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Arc::new(Self {
            tx,
            finished: AtomicBool::new(false),
        })
    }

    /// Emits a value unless the hub is already finished.
    pub(crate) fn emit(&self, progress: Progress) {
        if self.finished.load(Ordering::SeqCst) {
            return;
        }
        let _ = self.tx.send(progress);
    }

    /// Sends the terminal sentinel once; later calls are no-ops.
    ///
    /// The flag is raised before the send so a concurrent observer either sees the
    /// flag or receives the sentinel.
    pub(crate) fn finish(&self) {
        if self.finished.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.tx.send(Progress::Finished);
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// New observer stream starting at the current point.
    pub(crate) fn subscribe(&self) -> BoxStream<'static, Progress> {
        let rx = self.tx.subscribe();
        if self.is_finished() {
            return stream::once(async { Progress::Finished }).boxed();
        }

        stream::unfold(Some(rx), |rx| async move {
            let mut rx = rx?;
            loop {
                match rx.recv().await {
                    Ok(Progress::Finished) | Err(RecvError::Closed) => {
                        return Some((Progress::Finished, None));
                    }
                    Ok(p) => return Some((p, Some(rx))),
                    Err(RecvError::Lagged(_)) => continue,
                }
            }
        })
        .boxed()
    }
}

/// Write end handed to a running task.
#[derive(Clone, Debug)]
pub struct ProgressSender {
    hub: Arc<ProgressHub>,
}

impl ProgressSender {
    pub(crate) fn new(hub: Arc<ProgressHub>) -> Self {
        Self { hub }
    }

    /// Publishes a status message to current observers.
    pub fn send(&self, message: impl Into<Arc<str>>) {
        self.hub.emit(Progress::Message(message.into()));
    }
}
