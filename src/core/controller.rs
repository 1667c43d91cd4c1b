//! # Controller handle.
//!
//! [`Controller`] is the public face of the engine: a cheap-to-clone handle that
//! forwards every call to the controller actor as a message and reads snapshots from
//! a `watch` channel. No call blocks on task execution.
//!
//! ## Example
//! ```rust
//! use futures::StreamExt;
//! use taskwarden::{
//!     ControllerBuilder, ControllerConfig, FnFactory, TaskConfig, TaskContext, TaskError,
//!     TaskFn, TaskOutput, TaskRequest,
//! };
//!
//! #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
//! enum Kind { Hello }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let controller = ControllerBuilder::new(ControllerConfig::default())
//!     .with_factory(
//!         Kind::Hello,
//!         FnFactory::arc(TaskConfig::default(), || {
//!             TaskFn::arc(|_ctx: TaskContext| async {
//!                 Ok::<_, TaskError>(TaskOutput::new("hi"))
//!             })
//!         }),
//!     )
//!     .build();
//!
//! let req = TaskRequest::new(Kind::Hello);
//! let id = req.id();
//! controller.submit(req).expect("factory registered");
//!
//! let mut snapshots = controller.observe();
//! while let Some(states) = snapshots.next().await {
//!     if states.iter().any(|s| s.id() == id && s.is_finished()) {
//!         break;
//!     }
//! }
//! assert!(controller.get(id).expect("tracked").is_successful());
//! controller.close();
//! controller.wait_closed().await;
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{broadcast, mpsc, watch};
use tokio_stream::wrappers::WatchStream;
use tracing::warn;

use super::actor::Command;
use crate::{
    error::ControllerError,
    events::{Bus, Event},
    tasks::{FactoryRef, TaskId, TaskKind, TaskRequest, TaskState},
};

/// Handle to a running controller.
///
/// Dropping the last handle closes the controller (same as [`Controller::close`]).
pub struct Controller<K: TaskKind> {
    inner: Arc<Inner<K>>,
}

struct Inner<K> {
    commands: mpsc::UnboundedSender<Command<K>>,
    factories: Arc<HashMap<K, FactoryRef>>,
    snapshots: watch::Receiver<Vec<TaskState<K>>>,
    closed: AtomicBool,
    bus: Bus,
}

impl<K: TaskKind> Clone for Controller<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: TaskKind> fmt::Debug for Controller<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("kinds", &self.inner.factories.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<K: TaskKind> Controller<K> {
    pub(super) fn new(
        commands: mpsc::UnboundedSender<Command<K>>,
        factories: Arc<HashMap<K, FactoryRef>>,
        snapshots: watch::Receiver<Vec<TaskState<K>>>,
        bus: Bus,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                commands,
                factories,
                snapshots,
                closed: AtomicBool::new(false),
                bus,
            }),
        }
    }

    /// Submits a request for execution.
    ///
    /// ### Errors
    /// - [`ControllerError::Closed`] after [`close`](Self::close).
    /// - [`ControllerError::MissingFactory`] when no factory handles the request's
    ///   kind; nothing is tracked in that case.
    ///
    /// Re-submitting a request whose id is already tracked is a no-op.
    pub fn submit(&self, request: TaskRequest<K>) -> Result<(), ControllerError> {
        if self.is_closed() {
            return Err(ControllerError::Closed);
        }
        let kind = request.kind();
        if !self.inner.factories.contains_key(&kind) {
            return Err(ControllerError::MissingFactory {
                kind: format!("{kind:?}"),
            });
        }
        self.inner
            .commands
            .send(Command::Submit(request))
            .map_err(|_| {
                if !self.inner.closed.swap(true, Ordering::AcqRel) {
                    warn!("controller actor is gone; handle marked closed");
                }
                ControllerError::Closed
            })
    }

    /// Cancels a pending or running request. Unknown or finished ids are ignored.
    pub fn cancel(&self, id: TaskId) {
        let _ = self.inner.commands.send(Command::Cancel(id));
    }

    /// Stream of history snapshots, oldest request first.
    ///
    /// The first item is the current snapshot. Intermediate snapshots may be skipped
    /// when the observer is slower than the controller; the latest one is never
    /// missed. The stream ends once the controller has shut down.
    pub fn observe(&self) -> WatchStream<Vec<TaskState<K>>> {
        WatchStream::new(self.inner.snapshots.clone())
    }

    /// Current history snapshot.
    pub fn snapshot(&self) -> Vec<TaskState<K>> {
        self.inner.snapshots.borrow().clone()
    }

    /// Current state of one request, if still tracked.
    pub fn get(&self, id: TaskId) -> Option<TaskState<K>> {
        self.inner
            .snapshots
            .borrow()
            .iter()
            .find(|s| s.id() == id)
            .cloned()
    }

    /// Stops accepting work. Idempotent.
    ///
    /// Pending requests finish as cancelled; running ones complete normally.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.inner.commands.send(Command::Close);
    }

    /// True once [`close`](Self::close) was called, or once a submit found the
    /// actor gone.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Resolves when the controller actor has exited.
    ///
    /// Only returns after [`close`](Self::close) (from this or another handle).
    pub async fn wait_closed(&self) {
        let mut rx = self.inner.snapshots.clone();
        while rx.changed().await.is_ok() {}
    }

    /// Receiver of controller events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.bus.subscribe()
    }
}
