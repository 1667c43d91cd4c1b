//! # Task abstractions and the request/state model.
//!
//! This module provides the core task-related types:
//! - [`Task`] - trait for implementing async cancelable tasks
//! - [`TaskFn`] - function-based task implementation
//! - [`TaskFactory`] / [`TaskConfig`] - per-kind provider and configuration
//! - [`TaskRequest`] / [`TaskId`] - immutable submission record
//! - [`TaskState`] / [`Outcome`] - lifecycle record exposed to observers
//! - [`Progress`] / [`ProgressSender`] - per-task progress channel

mod factory;
mod payload;
mod policy;
mod progress;
mod request;
mod state;
mod task;
mod task_fn;

pub use factory::{FactoryRef, FnFactory, Precondition, TaskConfig, TaskFactory};
pub use payload::{Payload, TaskArgs, TaskOutput};
pub use policy::{CollisionPolicy, ErrorSeverity};
pub use progress::{Progress, ProgressSender};
pub use request::{TaskId, TaskKind, TaskRequest};
pub use state::{ExecutionState, Outcome, StateError, TaskState};
pub use task::{Task, TaskContext, TaskRef};
pub use task_fn::TaskFn;

pub(crate) use progress::ProgressHub;
