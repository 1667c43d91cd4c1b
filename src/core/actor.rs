//! # Controller actor: the single writer of all task state.
//!
//! One tokio task owns the history, the per-kind slots and the table of running
//! executions. Handles talk to it through [`Command`]s; executions report back
//! through [`Completion`]s. After every mutation the actor prunes the history and
//! publishes a full snapshot on a `watch` channel.
//!
//! ## Flow
//! ```text
//! Controller ── Command ──► ┌──────────────────┐ ── snapshot ──► watch ──► observers
//!                           │ ControllerActor  │ ── Event ─────► Bus
//! run_once  ── Completion ─►│ history / slots  │ ── ErrorReport ► reporters
//!     ▲                     └────────┬─────────┘
//!     └──────── tokio::spawn ────────┘ (one per running request)
//! ```
//!
//! ## Rules
//! - At most one running request per kind; the rest wait FIFO in the kind's slot.
//! - A slot is freed only when its execution has actually returned, so two bodies of
//!   the same kind never overlap, even right after a cancel.
//! - Preconditions are evaluated when a request reaches the head of its slot.
//! - User code called on the actor (factory, precondition, reporters) never takes it
//!   down: a panic there fails only the request involved.
//! - Every terminal transition publishes exactly one terminal event.
//! - On close, pending requests are cancelled; running ones finish normally and the
//!   actor exits when nothing is running any more.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::{
    clock::Clock,
    config::ControllerConfig,
    history::History,
    runner::{guarded, run_once},
    slot::SlotState,
};
use crate::{
    error::TaskError,
    events::{Bus, Event, EventKind},
    reporters::{ErrorReport, ReporterRef},
    tasks::{
        CollisionPolicy, ExecutionState, FactoryRef, Outcome, ProgressHub, ProgressSender,
        TaskConfig, TaskContext, TaskId, TaskKind, TaskOutput, TaskRequest, TaskState,
    },
};

/// Messages sent by controller handles.
pub(super) enum Command<K> {
    Submit(TaskRequest<K>),
    Cancel(TaskId),
    Close,
}

/// Result of one execution, sent by its spawned task.
pub(super) struct Completion {
    pub id: TaskId,
    pub result: Result<TaskOutput, TaskError>,
}

/// Bookkeeping for a running request.
struct Execution<K> {
    kind: K,
    token: CancellationToken,
}

/// Everything the actor needs besides its channels.
pub(super) struct ActorParts<K> {
    pub cfg: ControllerConfig,
    pub factories: Arc<HashMap<K, FactoryRef>>,
    pub clock: Arc<dyn Clock>,
    pub bus: Bus,
    pub problems: ReporterRef,
    pub exceptions: ReporterRef,
    pub snapshots: watch::Sender<Vec<TaskState<K>>>,
}

pub(super) struct ControllerActor<K: TaskKind> {
    cfg: ControllerConfig,
    factories: Arc<HashMap<K, FactoryRef>>,
    clock: Arc<dyn Clock>,
    bus: Bus,
    problems: ReporterRef,
    exceptions: ReporterRef,
    snapshots: watch::Sender<Vec<TaskState<K>>>,

    history: History<K>,
    slots: HashMap<K, SlotState>,
    running: HashMap<TaskId, Execution<K>>,
    done_tx: mpsc::UnboundedSender<Completion>,
    closing: bool,
}

impl<K: TaskKind> ControllerActor<K> {
    pub fn new(parts: ActorParts<K>, done_tx: mpsc::UnboundedSender<Completion>) -> Self {
        Self {
            cfg: parts.cfg,
            factories: parts.factories,
            clock: parts.clock,
            bus: parts.bus,
            problems: parts.problems,
            exceptions: parts.exceptions,
            snapshots: parts.snapshots,
            history: History::new(),
            slots: HashMap::new(),
            running: HashMap::new(),
            done_tx,
            closing: false,
        }
    }

    /// Main loop. Returns once the controller is closed and nothing runs.
    ///
    /// All handles being dropped counts as a close.
    pub async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command<K>>,
        mut done_rx: mpsc::UnboundedReceiver<Completion>,
    ) {
        let mut commands_open = true;

        loop {
            if self.closing && self.running.is_empty() {
                break;
            }

            tokio::select! {
                Some(done) = done_rx.recv() => self.on_completion(done),
                cmd = commands.recv(), if commands_open => match cmd {
                    Some(Command::Submit(req)) => self.on_submit(req),
                    Some(Command::Cancel(id)) => self.on_cancel(id),
                    Some(Command::Close) => self.on_close(),
                    None => {
                        commands_open = false;
                        self.on_close();
                    }
                },
            }
        }

        debug!(tracked = self.history.len(), "controller actor stopped");
    }

    fn on_submit(&mut self, req: TaskRequest<K>) {
        let id = req.id();
        if self.history.contains(id) {
            trace!(%id, "request already tracked; ignoring resubmission");
            return;
        }

        let kind = req.kind();
        let Some(factory) = self.factories.get(&kind) else {
            warn!(%id, kind = ?kind, "no factory for submitted kind; dropping request");
            return;
        };
        let (config, broken) = match guarded(|| factory.config()) {
            Ok(config) => (config, None),
            Err(reason) => {
                warn!(%id, kind = ?kind, %reason, "task factory panicked while configuring");
                (TaskConfig::default(), Some(reason))
            }
        };
        let hub = ProgressHub::new(self.cfg.progress_capacity_clamped());
        let state = TaskState::pending(req, self.clock.now(), hub);
        let collision = config.collision();

        let already_active = self.kind_is_active(kind);
        self.history.insert(state, config);
        self.bus.publish(
            Event::new(EventKind::TaskSubmitted)
                .with_task(label(kind))
                .with_id(id),
        );

        if let Some(reason) = broken {
            self.finish(id, Outcome::Failed(TaskError::Panicked { reason }), None);
        } else if self.closing {
            self.finish(id, Outcome::Failed(TaskError::Canceled), None);
        } else if already_active && collision == CollisionPolicy::SkipIfActive {
            self.finish(id, Outcome::Skipped, Some("a task of this kind is already active"));
        } else {
            self.slots.entry(kind).or_default().queue.push_back(id);
            self.schedule(kind);
        }
        self.publish();
    }

    fn on_cancel(&mut self, id: TaskId) {
        let Some(tracked) = self.history.get(id) else {
            trace!(%id, "cancel for unknown request ignored");
            return;
        };
        let kind = tracked.state.kind();

        match tracked.state.status() {
            ExecutionState::Finished => return,
            ExecutionState::Pending => {
                if let Some(slot) = self.slots.get_mut(&kind) {
                    slot.dequeue(id);
                }
            }
            ExecutionState::Running => {
                if let Some(exec) = self.running.get(&id) {
                    exec.token.cancel();
                }
            }
        }

        self.finish(id, Outcome::Failed(TaskError::Canceled), None);
        self.publish();
    }

    fn on_completion(&mut self, done: Completion) {
        let Some(exec) = self.running.remove(&done.id) else {
            return;
        };

        let outcome = match done.result {
            Ok(out) => Outcome::Succeeded(out),
            Err(err) => Outcome::Failed(err),
        };
        self.finish(done.id, outcome, None);

        if let Some(slot) = self.slots.get_mut(&exec.kind) {
            if slot.running == Some(done.id) {
                slot.running = None;
            }
        }
        self.schedule(exec.kind);
        self.publish();
    }

    fn on_close(&mut self) {
        if self.closing {
            return;
        }
        self.closing = true;

        let pending: Vec<TaskId> = self
            .history
            .active_ids()
            .into_iter()
            .filter(|id| !self.running.contains_key(id))
            .collect();
        for slot in self.slots.values_mut() {
            slot.queue.clear();
        }
        for id in &pending {
            self.finish(*id, Outcome::Failed(TaskError::Canceled), None);
        }

        info!(
            cancelled = pending.len(),
            running = self.running.len(),
            "controller closing"
        );
        self.bus.publish(Event::new(EventKind::ControllerClosed));
        self.publish();
    }

    /// Starts queued requests of `kind` while its slot is free.
    fn schedule(&mut self, kind: K) {
        if self.closing {
            return;
        }
        loop {
            let Some(slot) = self.slots.get_mut(&kind) else {
                return;
            };
            if slot.is_busy() {
                return;
            }
            let Some(id) = slot.queue.pop_front() else {
                return;
            };

            let met = match self.history.get(id) {
                Some(t) if t.state.is_active() => guarded(|| t.config.preconditions_met()),
                _ => continue,
            };
            match met {
                Ok(true) => {}
                Ok(false) => {
                    self.finish(id, Outcome::Skipped, Some("preconditions not met"));
                    continue;
                }
                Err(reason) => {
                    warn!(%id, kind = ?kind, %reason, "precondition panicked");
                    self.finish(id, Outcome::Failed(TaskError::Panicked { reason }), None);
                    continue;
                }
            }

            if self.start(id, kind) {
                return;
            }
        }
    }

    /// Spawns the execution of `id`. Returns `false` if it did not start, leaving
    /// the slot free.
    fn start(&mut self, id: TaskId, kind: K) -> bool {
        let Some(factory) = self.factories.get(&kind).cloned() else {
            self.finish(id, Outcome::Failed(TaskError::fail("no factory")), None);
            return false;
        };
        let task = match guarded(|| factory.provide()) {
            Ok(task) => task,
            Err(reason) => {
                warn!(%id, kind = ?kind, %reason, "task factory panicked while providing a task");
                self.finish(id, Outcome::Failed(TaskError::Panicked { reason }), None);
                return false;
            }
        };
        let now = self.clock.now();
        let Some(tracked) = self.history.get_mut(id) else {
            return false;
        };
        if !tracked.state.start(now) {
            return false;
        }

        let timeout = tracked.config.timeout();
        let token = CancellationToken::new();
        let ctx = TaskContext::new(
            id,
            tracked.state.request().args().clone(),
            ProgressSender::new(Arc::clone(tracked.state.progress_hub())),
            token.child_token(),
        );

        let mut ev = Event::new(EventKind::TaskStarting)
            .with_task(label(kind))
            .with_id(id);
        if let Some(t) = timeout {
            ev = ev.with_timeout(t);
        }
        self.bus.publish(ev);
        debug!(%id, kind = ?kind, timeout = ?timeout, "starting task");

        let done = self.done_tx.clone();
        tokio::spawn(async move {
            let result = run_once(task, ctx, timeout).await;
            let _ = done.send(Completion { id, result });
        });

        if let Some(slot) = self.slots.get_mut(&kind) {
            slot.running = Some(id);
        }
        self.running.insert(id, Execution { kind, token });
        true
    }

    /// Moves an active request to `Finished`, then emits its terminal event and,
    /// for failures, the error reports.
    ///
    /// No-op for unknown or already finished requests.
    fn finish(&mut self, id: TaskId, outcome: Outcome, note: Option<&'static str>) {
        let now = self.clock.now();
        let Some(tracked) = self.history.get_mut(id) else {
            return;
        };
        if !tracked.state.finish(now, outcome.clone()) {
            return;
        }

        let kind = tracked.state.kind();
        let severity = tracked.config.severity();
        let origin: Option<Arc<str>> = tracked.state.request().origin().map(Arc::from);
        let base = |k: EventKind| Event::new(k).with_task(label(kind)).with_id(id);

        let err = match outcome {
            Outcome::Succeeded(_) => {
                debug!(%id, kind = ?kind, "task succeeded");
                self.bus.publish(base(EventKind::TaskSucceeded));
                return;
            }
            Outcome::Skipped => {
                let reason = note.unwrap_or("skipped");
                debug!(%id, kind = ?kind, reason, "task skipped");
                self.bus
                    .publish(base(EventKind::TaskSkipped).with_reason(reason));
                return;
            }
            Outcome::Failed(err) => err,
        };

        let ev = match &err {
            TaskError::Timeout { timeout } => base(EventKind::TimeoutHit).with_timeout(*timeout),
            TaskError::Canceled => base(EventKind::TaskCanceled),
            TaskError::Fail { .. } | TaskError::Panicked { .. } => {
                base(EventKind::TaskFailed).with_reason(err.as_message())
            }
        };
        self.bus.publish(ev);
        debug!(%id, kind = ?kind, error = err.as_label(), "task finished with error");

        let report = ErrorReport {
            id,
            kind: label(kind),
            origin,
            error: err,
            severity,
        };
        deliver(&self.problems, &report, "problems");
        if severity.is_alert() {
            deliver(&self.exceptions, &report, "exceptions");
        }
    }

    /// Prunes the history, then publishes a snapshot.
    fn publish(&mut self) {
        for evicted in self.history.prune(self.cfg.history_limit_clamped()) {
            trace!(id = %evicted.id(), "evicted from history");
            self.bus.publish(
                Event::new(EventKind::TaskEvicted)
                    .with_task(label(evicted.kind()))
                    .with_id(evicted.id()),
            );
        }
        self.snapshots.send_replace(self.history.snapshot());
    }

    /// True if a request of `kind` is pending or still running.
    fn kind_is_active(&self, kind: K) -> bool {
        let Some(slot) = self.slots.get(&kind) else {
            return false;
        };
        let running_active = slot
            .running
            .and_then(|id| self.history.get(id))
            .is_some_and(|t| t.state.is_active());
        running_active || !slot.queue.is_empty()
    }
}

/// Hands `report` to one reporter. A panicking reporter loses the report.
fn deliver(reporter: &ReporterRef, report: &ErrorReport, sink: &'static str) {
    if let Err(reason) = guarded(|| reporter.report(report)) {
        warn!(id = %report.id, sink, %reason, "error reporter panicked");
    }
}

fn label<K: TaskKind>(kind: K) -> Arc<str> {
    Arc::from(format!("{kind:?}"))
}
