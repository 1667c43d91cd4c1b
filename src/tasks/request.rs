//! # Task requests and their identity.
//!
//! A [`TaskRequest`] is the immutable submission record: a generated [`TaskId`],
//! the task kind, opaque arguments and an optional origin tag. Two requests with the
//! same id are the same submission; the controller ignores re-submissions.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use uuid::Uuid;

use super::payload::TaskArgs;

/// Discriminator selecting a factory and grouping requests into slots.
///
/// Usually a small user-defined enum. Blanket-implemented for every type that
/// satisfies the bounds.
pub trait TaskKind: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> TaskKind for T where T: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// Unique identity of a submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TaskId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Immutable request to run one task of kind `K`.
///
/// ## Example
/// ```rust
/// use taskwarden::TaskRequest;
///
/// #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// enum Kind { Sync }
///
/// let req = TaskRequest::new(Kind::Sync)
///     .with_args(String::from("full"))
///     .with_origin("app-start");
/// let rerun = req.to_new_task();
///
/// assert_ne!(req.id(), rerun.id());
/// assert_eq!(rerun.args().get::<String>().map(String::as_str), Some("full"));
/// ```
#[derive(Clone, Debug)]
pub struct TaskRequest<K> {
    id: TaskId,
    kind: K,
    args: TaskArgs,
    origin: Option<Arc<str>>,
}

impl<K: TaskKind> TaskRequest<K> {
    /// Creates a request with a fresh id and no arguments.
    pub fn new(kind: K) -> Self {
        Self {
            id: TaskId::new(),
            kind,
            args: TaskArgs::empty(),
            origin: None,
        }
    }

    /// Returns a new request with the given arguments attached.
    pub fn with_args<T: std::any::Any + Send + Sync>(mut self, args: T) -> Self {
        self.args = TaskArgs::new(args);
        self
    }

    /// Returns a new request tagged with where it was submitted from.
    pub fn with_origin(mut self, origin: impl Into<Arc<str>>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Copies kind, arguments and origin into a request with a new identity.
    pub fn to_new_task(&self) -> Self {
        Self {
            id: TaskId::new(),
            kind: self.kind,
            args: self.args.clone(),
            origin: self.origin.clone(),
        }
    }

    /// Request identity.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Task kind.
    pub fn kind(&self) -> K {
        self.kind
    }

    /// Opaque arguments.
    pub fn args(&self) -> &TaskArgs {
        &self.args
    }

    /// Origin tag, if any.
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }
}

impl<K> PartialEq for TaskRequest<K> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<K> Eq for TaskRequest<K> {}
