//! # taskwarden
//!
//! **Taskwarden** is an in-process background task controller for tokio applications.
//!
//! It accepts typed requests, runs at most one task per kind at a time, enforces
//! per-kind timeouts and collision policies, and keeps a bounded, observable
//! history of every request for UI layers to render.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   TaskRequest<K>      TaskRequest<K>      cancel(id) / close()
//!        │                   │                    │
//!        ▼                   ▼                    ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Controller (cloneable handle)                                    │
//! │  - rejects unknown kinds synchronously (MissingFactory)           │
//! │  - sends commands to the actor, reads snapshots from `watch`      │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                ▼ Command
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  ControllerActor (single writer)                                  │
//! │  - History (insertion-ordered, pruned to history_limit)           │
//! │  - Slot per kind (one running, FIFO queue)                        │
//! │  - Factories (config at submit, fresh task at start)              │
//! └──────┬─────────────────┬──────────────────┬───────────────┬───────┘
//!        ▼ spawn           ▼ spawn            │ snapshot      │ Event
//!   ┌──────────┐      ┌──────────┐            ▼               ▼
//!   │ run_once │      │ run_once │      watch channel   Bus (broadcast)
//!   │ timeout  │      │ timeout  │            │               │
//!   └────┬─────┘      └────┬─────┘        observe()    subscriber_listener
//!        └── Completion ───┘                                  │
//!                 ▲                                     SubscriberSet
//!                 └─────────── back to the actor         ┌────┴────┐
//!                                                     LogWriter  custom
//! ```
//!
//! ### Lifecycle
//! ```text
//! submit ──► Pending ──► (slot free, precondition ok) ──► Running ──► Finished
//!               │                                           │      (Succeeded | Failed)
//!               ├─ SkipIfActive and kind busy ──► Finished(Skipped)
//!               ├─ precondition false at dequeue ──► Finished(Skipped)
//!               └─ cancel / close ──► Finished(Failed(Canceled))
//! ```
//!
//! ## Features
//! | Area              | Description                                                 | Key types / traits                            |
//! |-------------------|-------------------------------------------------------------|-----------------------------------------------|
//! | **Controller**    | Submit, cancel, observe and close.                          | [`Controller`], [`ControllerBuilder`]         |
//! | **Tasks**         | Define tasks as trait objects or closures.                  | [`Task`], [`TaskFn`], [`TaskContext`]         |
//! | **Factories**     | Per-kind provider and configuration.                        | [`TaskFactory`], [`FnFactory`], [`TaskConfig`]|
//! | **State**         | Observable lifecycle records and progress.                  | [`TaskState`], [`Outcome`], [`Progress`]      |
//! | **Subscriber API**| Hook into controller events (logging, metrics, ...).        | [`Subscribe`], [`Event`]                      |
//! | **Reporting**     | Problem/exception sinks for failures.                       | [`Reporter`], [`ErrorReport`]                 |
//! | **Errors**        | Typed errors for the handle and for task outcomes.          | [`ControllerError`], [`TaskError`]            |
//! | **Configuration** | History limit and channel capacities.                       | [`ControllerConfig`]                          |
//!
//! ## Optional features
//! - `logging` (default): exports the [`LogWriter`] subscriber (events → `tracing`).
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use futures::StreamExt;
//! use taskwarden::{
//!     CollisionPolicy, ControllerBuilder, ControllerConfig, FnFactory, TaskConfig, TaskContext,
//!     TaskError, TaskFn, TaskOutput, TaskRequest,
//! };
//!
//! #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
//! enum Kind { Download }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let download = FnFactory::arc(
//!         TaskConfig::default()
//!             .with_timeout(Some(Duration::from_secs(5)))
//!             .with_collision(CollisionPolicy::SkipIfActive),
//!         || {
//!             TaskFn::arc(|ctx: TaskContext| async move {
//!                 ctx.progress().send("fetching");
//!                 Ok::<_, TaskError>(TaskOutput::new(42u32))
//!             })
//!         },
//!     );
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn taskwarden::Subscribe>> = vec![Arc::new(taskwarden::LogWriter)];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn taskwarden::Subscribe>> = Vec::new();
//!
//!     let controller = ControllerBuilder::new(ControllerConfig::default())
//!         .with_factory(Kind::Download, download)
//!         .with_subscribers(subs)
//!         .build();
//!
//!     let req = TaskRequest::new(Kind::Download);
//!     let id = req.id();
//!     controller.submit(req)?;
//!
//!     let mut updates = controller.observe();
//!     while let Some(states) = updates.next().await {
//!         if let Some(state) = states.iter().find(|s| s.id() == id && s.is_finished()) {
//!             assert_eq!(state.result().and_then(|r| r.get::<u32>()), Some(&42));
//!             break;
//!         }
//!     }
//!
//!     controller.close();
//!     controller.wait_closed().await;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod reporters;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use self::core::{Clock, Controller, ControllerBuilder, ControllerConfig, SystemClock};
pub use error::{ControllerError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use reporters::{ErrorReport, LogExceptions, LogProblems, Reporter, ReporterRef};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{
    CollisionPolicy, ErrorSeverity, ExecutionState, FactoryRef, FnFactory, Outcome, Payload,
    Precondition, Progress, ProgressSender, StateError, Task, TaskArgs, TaskConfig, TaskContext,
    TaskFactory, TaskFn, TaskId, TaskKind, TaskOutput, TaskRef, TaskRequest, TaskState,
};

// Optional: expose the built-in tracing subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::{LogWriter, message_for};
