//! # Task factories and per-kind configuration.
//!
//! A [`TaskFactory`] is registered once per task kind. The controller asks it for a
//! [`TaskConfig`] when a request is submitted and for a fresh [`TaskRef`] when the
//! request actually starts.
//!
//! ## Sentinel values
//! - `timeout = None` or `Some(0s)` → no timeout.
//! - no precondition → always met.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::policy::{CollisionPolicy, ErrorSeverity};
use super::task::TaskRef;

/// Predicate evaluated when a queued request reaches the head of its slot.
pub type Precondition = Arc<dyn Fn() -> bool + Send + Sync>;

/// Execution configuration for one task kind.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use taskwarden::{CollisionPolicy, ErrorSeverity, TaskConfig};
///
/// let cfg = TaskConfig::default()
///     .with_timeout(Some(Duration::from_secs(30)))
///     .with_collision(CollisionPolicy::SkipIfActive)
///     .with_severity(ErrorSeverity::Alert)
///     .with_precondition(|| true);
///
/// assert_eq!(cfg.timeout(), Some(Duration::from_secs(30)));
/// assert!(cfg.preconditions_met());
/// ```
#[derive(Clone, Default)]
pub struct TaskConfig {
    timeout: Option<Duration>,
    collision: CollisionPolicy,
    severity: ErrorSeverity,
    precondition: Option<Precondition>,
}

impl TaskConfig {
    /// Returns a new config with updated timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns a new config with updated collision policy.
    pub fn with_collision(mut self, collision: CollisionPolicy) -> Self {
        self.collision = collision;
        self
    }

    /// Returns a new config with updated error severity.
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Returns a new config gated by `precondition`.
    pub fn with_precondition<F>(mut self, precondition: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.precondition = Some(Arc::new(precondition));
        self
    }

    /// Effective timeout (`0s` is treated as none).
    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.filter(|d| !d.is_zero())
    }

    /// Collision policy.
    #[inline]
    pub fn collision(&self) -> CollisionPolicy {
        self.collision
    }

    /// Error severity.
    #[inline]
    pub fn severity(&self) -> ErrorSeverity {
        self.severity
    }

    /// Evaluates the precondition now.
    pub fn preconditions_met(&self) -> bool {
        self.precondition.as_ref().is_none_or(|check| check())
    }
}

impl fmt::Debug for TaskConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskConfig")
            .field("timeout", &self.timeout)
            .field("collision", &self.collision)
            .field("severity", &self.severity)
            .field("precondition", &self.precondition.is_some())
            .finish()
    }
}

/// Provider of task instances and configuration for one kind.
pub trait TaskFactory: Send + Sync + 'static {
    /// Configuration applied to a request of this kind; called on submit.
    fn config(&self) -> TaskConfig;

    /// Fresh task instance; called when a request starts running.
    fn provide(&self) -> TaskRef;
}

/// Shared handle to a factory.
pub type FactoryRef = Arc<dyn TaskFactory>;

/// Closure-backed factory with a fixed configuration.
///
/// ```rust
/// use taskwarden::{FnFactory, TaskConfig, TaskContext, TaskError, TaskFn, TaskOutput};
///
/// let factory = FnFactory::new(TaskConfig::default(), || {
///     TaskFn::arc(|_ctx: TaskContext| async { Ok::<_, TaskError>(TaskOutput::empty()) })
/// });
/// # let _ = factory;
/// ```
pub struct FnFactory<F> {
    config: TaskConfig,
    provider: F,
}

impl<F> FnFactory<F> {
    /// Creates a factory from a config and a task provider.
    pub fn new(config: TaskConfig, provider: F) -> Self {
        Self { config, provider }
    }

    /// Same as [`FnFactory::new`], returned as a shared handle.
    pub fn arc(config: TaskConfig, provider: F) -> Arc<Self> {
        Arc::new(Self::new(config, provider))
    }
}

impl<F, T> TaskFactory for FnFactory<F>
where
    F: Fn() -> Arc<T> + Send + Sync + 'static,
    T: super::task::Task,
{
    fn config(&self) -> TaskConfig {
        self.config.clone()
    }

    fn provide(&self) -> TaskRef {
        (self.provider)()
    }
}
