use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc, watch,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{
    actor::{ActorParts, ControllerActor},
    clock::{Clock, SystemClock},
    config::ControllerConfig,
    controller::Controller,
};
use crate::{
    events::{Bus, Event},
    reporters::{LogExceptions, LogProblems, ReporterRef},
    subscribers::{Subscribe, SubscriberSet},
    tasks::{FactoryRef, TaskKind},
};

/// Builder for a [`Controller`].
///
/// Factories are fixed at build time; a kind without a factory is rejected by
/// [`Controller::submit`].
pub struct ControllerBuilder<K: TaskKind> {
    cfg: ControllerConfig,
    factories: HashMap<K, FactoryRef>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    clock: Arc<dyn Clock>,
    problems: ReporterRef,
    exceptions: ReporterRef,
}

impl<K: TaskKind> ControllerBuilder<K> {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: ControllerConfig) -> Self {
        Self {
            cfg,
            factories: HashMap::new(),
            subscribers: Vec::new(),
            clock: Arc::new(SystemClock),
            problems: Arc::new(LogProblems),
            exceptions: Arc::new(LogExceptions),
        }
    }

    /// Registers the factory for `kind`, replacing any previous one.
    pub fn with_factory(mut self, kind: K, factory: FactoryRef) -> Self {
        if self.factories.insert(kind, factory).is_some() {
            debug!(kind = ?kind, "factory replaced");
        }
        self
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive controller events through dedicated workers with
    /// bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces the wall clock used for task timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the reporter notified of every task failure.
    pub fn with_problem_reporter(mut self, reporter: ReporterRef) -> Self {
        self.problems = reporter;
        self
    }

    /// Replaces the reporter notified of failures of `Alert` kinds.
    pub fn with_exception_reporter(mut self, reporter: ReporterRef) -> Self {
        self.exceptions = reporter;
        self
    }

    /// Spawns the controller actor (and the subscriber fan-out) and returns a handle.
    ///
    /// Must be called within a Tokio runtime.
    pub fn build(self) -> Controller<K> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let factories = Arc::new(self.factories);
        let (snap_tx, snap_rx) = watch::channel(Vec::new());
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let stopped = CancellationToken::new();

        let set = SubscriberSet::new(self.subscribers, bus.clone());
        if !set.is_empty() {
            debug!(subscribers = set.len(), "starting subscriber listener");
            tokio::spawn(subscriber_listener(bus.subscribe(), set, stopped.clone()));
        }

        let actor = ControllerActor::new(
            ActorParts {
                cfg: self.cfg,
                factories: Arc::clone(&factories),
                clock: self.clock,
                bus: bus.clone(),
                problems: self.problems,
                exceptions: self.exceptions,
                snapshots: snap_tx,
            },
            done_tx,
        );
        tokio::spawn(async move {
            actor.run(cmd_rx, done_rx).await;
            stopped.cancel();
        });

        Controller::new(cmd_tx, factories, snap_rx, bus)
    }
}

/// Forwards bus events to the subscriber set until the actor stops, then drains
/// what is left and waits for the workers.
async fn subscriber_listener(
    mut rx: broadcast::Receiver<Event>,
    set: SubscriberSet,
    stopped: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            res = rx.recv() => match res {
                Ok(ev) => set.emit(ev),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber listener lagged behind the bus");
                }
                Err(RecvError::Closed) => break,
            },
            _ = stopped.cancelled() => {
                while let Ok(ev) = rx.try_recv() {
                    set.emit(ev);
                }
                break;
            }
        }
    }
    set.shutdown().await;
}
