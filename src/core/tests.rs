use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::time::{self, Instant};

use super::{Clock, Controller, ControllerBuilder, ControllerConfig};
use crate::{
    CollisionPolicy, ControllerError, ErrorReport, ErrorSeverity, Event, EventKind, ExecutionState,
    FactoryRef, FnFactory, Progress, Reporter, StateError, Subscribe, TaskConfig, TaskContext,
    TaskError, TaskFactory, TaskFn, TaskId, TaskOutput, TaskRef, TaskRequest, TaskState,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Kind {
    Sleep,
    OtherSleep,
    Fail,
    Unregistered,
}

/// Wall clock that follows tokio's (paused) timer.
struct TokioClock {
    base: SystemTime,
    started: Instant,
}

impl TokioClock {
    fn arc() -> Arc<Self> {
        Arc::new(Self {
            base: SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
            started: Instant::now(),
        })
    }
}

impl Clock for TokioClock {
    fn now(&self) -> SystemTime {
        self.base + self.started.elapsed()
    }
}

#[derive(Default)]
struct Collector(Mutex<Vec<ErrorReport>>);

impl Collector {
    fn reports(&self) -> Vec<ErrorReport> {
        self.0.lock().expect("lock").clone()
    }
}

impl Reporter for Collector {
    fn report(&self, report: &ErrorReport) {
        self.0.lock().expect("lock").push(report.clone());
    }
}

/// Sleeps for `args` seconds (default 1) and returns the number of seconds slept.
fn sleeper(cfg: TaskConfig) -> FactoryRef {
    FnFactory::arc(cfg, || {
        TaskFn::arc(|ctx: TaskContext| async move {
            let secs = ctx.args().get::<u64>().copied().unwrap_or(1);
            time::sleep(Duration::from_secs(secs)).await;
            Ok::<_, TaskError>(TaskOutput::new(secs))
        })
    })
}

fn failing(cfg: TaskConfig) -> FactoryRef {
    FnFactory::arc(cfg, || {
        TaskFn::arc(|_ctx: TaskContext| async {
            time::sleep(Duration::from_millis(10)).await;
            Err::<TaskOutput, _>(TaskError::fail("boom"))
        })
    })
}

fn builder() -> ControllerBuilder<Kind> {
    ControllerBuilder::new(ControllerConfig::default())
        .with_clock(TokioClock::arc())
        .with_factory(Kind::Sleep, sleeper(TaskConfig::default()))
        .with_factory(Kind::OtherSleep, sleeper(TaskConfig::default()))
        .with_factory(Kind::Fail, failing(TaskConfig::default()))
}

/// Waits for the first snapshot that satisfies `pred`.
async fn wait_for<F>(ctl: &Controller<Kind>, pred: F) -> Vec<TaskState<Kind>>
where
    F: Fn(&[TaskState<Kind>]) -> bool,
{
    let mut updates = ctl.observe();
    while let Some(snapshot) = updates.next().await {
        if pred(&snapshot) {
            return snapshot;
        }
    }
    panic!("controller stopped before the condition was met");
}

fn find(snapshot: &[TaskState<Kind>], req: &TaskRequest<Kind>) -> TaskState<Kind> {
    snapshot
        .iter()
        .find(|s| s.id() == req.id())
        .cloned()
        .expect("request is tracked")
}

fn status_of(snapshot: &[TaskState<Kind>], req: &TaskRequest<Kind>) -> Option<ExecutionState> {
    snapshot
        .iter()
        .find(|s| s.id() == req.id())
        .map(TaskState::status)
}

/// Asserts that `state` ran for `expected` (timer granularity is one millisecond).
fn assert_ran_for(state: &TaskState<Kind>, expected: Duration) {
    let took = state
        .finished_at()
        .and_then(|f| f.duration_since(state.started_at()?).ok())
        .expect("started and finished");
    assert!(
        took >= expected && took < expected + Duration::from_millis(5),
        "ran for {took:?}, expected {expected:?}"
    );
}

fn all_finished(snapshot: &[TaskState<Kind>], reqs: &[&TaskRequest<Kind>]) -> bool {
    reqs.iter()
        .all(|r| status_of(snapshot, r) == Some(ExecutionState::Finished))
}

#[tokio::test(start_paused = true)]
async fn init_and_close_have_no_side_effects() {
    let problems = Arc::new(Collector::default());
    let ctl = builder().with_problem_reporter(problems.clone()).build();

    assert!(ctl.snapshot().is_empty());
    let first = ctl.observe().next().await.expect("initial snapshot");
    assert!(first.is_empty());

    ctl.close();
    ctl.close();
    ctl.wait_closed().await;

    assert!(ctl.is_closed());
    assert!(ctl.snapshot().is_empty());
    assert!(problems.reports().is_empty());
    assert_eq!(
        ctl.submit(TaskRequest::new(Kind::Sleep)),
        Err(ControllerError::Closed)
    );
}

#[tokio::test(start_paused = true)]
async fn missing_factory_is_rejected_synchronously() {
    let ctl = builder().build();

    let err = ctl
        .submit(TaskRequest::new(Kind::Unregistered))
        .expect_err("no factory");

    assert_eq!(
        err,
        ControllerError::MissingFactory {
            kind: "Unregistered".into()
        }
    );
    time::sleep(Duration::from_millis(1)).await;
    assert!(ctl.snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn task_runs_then_finishes_with_result() {
    let ctl = builder().build();
    let req = TaskRequest::new(Kind::Sleep).with_args(2u64);
    ctl.submit(req.clone()).expect("submit");

    let running = wait_for(&ctl, |s| status_of(s, &req) == Some(ExecutionState::Running)).await;
    let running = find(&running, &req);
    assert!(running.started_at().is_some());
    assert!(running.finished_at().is_none());
    assert!(running.result_or_error().is_err());
    let progress = running.progress();

    let done = wait_for(&ctl, |s| all_finished(s, &[&req])).await;
    let done = find(&done, &req);

    assert!(done.is_successful());
    assert_eq!(done.result().and_then(|r| r.get::<u64>()), Some(&2));
    assert!(done.error().is_none());
    assert!(done.started_at().expect("started") >= done.created_at());
    assert_ran_for(&done, Duration::from_secs(2));

    let seen: Vec<Progress> = progress.collect().await;
    assert_eq!(seen.last(), Some(&Progress::Finished));
}

#[tokio::test(start_paused = true)]
async fn progress_is_delivered_while_running() {
    let chatty = FnFactory::arc(TaskConfig::default(), || {
        TaskFn::arc(|ctx: TaskContext| async move {
            time::sleep(Duration::from_secs(1)).await;
            ctx.progress().send("half");
            time::sleep(Duration::from_secs(1)).await;
            ctx.progress().send("done");
            Ok::<_, TaskError>(TaskOutput::empty())
        })
    });
    let ctl = builder().with_factory(Kind::Sleep, chatty).build();
    let req = TaskRequest::new(Kind::Sleep);
    ctl.submit(req.clone()).expect("submit");

    let running = wait_for(&ctl, |s| status_of(s, &req) == Some(ExecutionState::Running)).await;
    let seen: Vec<Progress> = find(&running, &req).progress().collect().await;

    assert_eq!(
        seen,
        vec![
            Progress::Message("half".into()),
            Progress::Message("done".into()),
            Progress::Finished,
        ]
    );

    // Late observers only get the sentinel.
    let done = find(&ctl.snapshot(), &req);
    let late: Vec<Progress> = done.progress().collect().await;
    assert_eq!(late, vec![Progress::Finished]);
}

#[tokio::test(start_paused = true)]
async fn failing_task_records_error() {
    let ctl = builder().build();
    let req = TaskRequest::new(Kind::Fail);
    ctl.submit(req.clone()).expect("submit");

    let done = wait_for(&ctl, |s| all_finished(s, &[&req])).await;
    let done = find(&done, &req);

    assert!(done.is_failed());
    assert!(done.result().is_none());
    assert_eq!(done.error(), Some(&TaskError::fail("boom")));
    assert_eq!(
        done.result_or_error().err(),
        Some(StateError::Failed(TaskError::fail("boom")))
    );
}

#[tokio::test(start_paused = true)]
async fn cancel_interrupts_running_task() {
    let ctl = builder().build();
    let long = TaskRequest::new(Kind::Sleep).with_args(3_600u64);
    let next = TaskRequest::new(Kind::Sleep).with_args(1u64);
    ctl.submit(long.clone()).expect("submit");
    ctl.submit(next.clone()).expect("submit");

    wait_for(&ctl, |s| status_of(s, &long) == Some(ExecutionState::Running)).await;
    ctl.cancel(long.id());

    let snap = wait_for(&ctl, |s| all_finished(s, &[&long, &next])).await;
    let cancelled = find(&snap, &long);
    assert_eq!(cancelled.error(), Some(&TaskError::Canceled));
    assert!(cancelled.result().is_none());
    assert!(find(&snap, &next).is_successful());

    // Cancelling a finished request changes nothing.
    ctl.cancel(long.id());
    time::sleep(Duration::from_millis(1)).await;
    assert_eq!(ctl.get(long.id()).and_then(|s| s.error().cloned()), Some(TaskError::Canceled));
}

#[tokio::test(start_paused = true)]
async fn cancel_pending_task_never_runs() {
    let ctl = builder().build();
    let first = TaskRequest::new(Kind::Sleep).with_args(5u64);
    let queued = TaskRequest::new(Kind::Sleep);
    ctl.submit(first.clone()).expect("submit");
    ctl.submit(queued.clone()).expect("submit");
    ctl.cancel(queued.id());

    let snap = wait_for(&ctl, |s| all_finished(s, &[&first, &queued])).await;
    let queued = find(&snap, &queued);
    assert_eq!(queued.error(), Some(&TaskError::Canceled));
    assert!(queued.started_at().is_none());
    assert!(find(&snap, &first).is_successful());
}

#[tokio::test(start_paused = true)]
async fn same_kind_requests_are_queued() {
    let ctl = builder().build();
    let a = TaskRequest::new(Kind::Sleep).with_args(2u64);
    let b = TaskRequest::new(Kind::Sleep).with_args(2u64);
    ctl.submit(a.clone()).expect("submit");
    ctl.submit(b.clone()).expect("submit");

    let snap = wait_for(&ctl, |s| {
        status_of(s, &a) == Some(ExecutionState::Running)
            && status_of(s, &b) == Some(ExecutionState::Pending)
    })
    .await;
    assert!(find(&snap, &b).started_at().is_none());

    let snap = wait_for(&ctl, |s| all_finished(s, &[&a, &b])).await;
    let (a, b) = (find(&snap, &a), find(&snap, &b));
    assert!(a.is_successful() && b.is_successful());
    assert!(b.started_at().expect("b started") >= a.finished_at().expect("a finished"));
}

#[tokio::test(start_paused = true)]
async fn skip_if_active_skips_second_request() {
    let ctl = builder()
        .with_factory(
            Kind::Sleep,
            sleeper(TaskConfig::default().with_collision(CollisionPolicy::SkipIfActive)),
        )
        .build();
    let a = TaskRequest::new(Kind::Sleep);
    let b = TaskRequest::new(Kind::Sleep);
    ctl.submit(a.clone()).expect("submit");
    ctl.submit(b.clone()).expect("submit");

    let snap = wait_for(&ctl, |s| all_finished(s, &[&a, &b])).await;
    let skipped = find(&snap, &b);

    assert!(find(&snap, &a).is_successful());
    assert!(skipped.is_skipped());
    assert!(skipped.result().is_none());
    assert!(skipped.error().is_none());
    assert!(skipped.started_at().is_none());
    assert!(matches!(
        skipped.result_or_error(),
        Err(StateError::NoResult { skipped: true, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn precondition_is_checked_when_dequeued() {
    let ready = Arc::new(AtomicBool::new(false));
    let probe = ready.clone();
    let ctl = builder()
        .with_factory(
            Kind::Sleep,
            sleeper(TaskConfig::default().with_precondition(move || probe.load(Ordering::SeqCst))),
        )
        .build();

    let first = TaskRequest::new(Kind::Sleep);
    ctl.submit(first.clone()).expect("submit");
    let snap = wait_for(&ctl, |s| all_finished(s, &[&first])).await;
    assert!(find(&snap, &first).is_skipped());

    ready.store(true, Ordering::SeqCst);
    let second = first.to_new_task();
    ctl.submit(second.clone()).expect("submit");
    let snap = wait_for(&ctl, |s| all_finished(s, &[&second])).await;
    assert!(find(&snap, &second).is_successful());
}

#[tokio::test(start_paused = true)]
async fn collisions_only_within_the_same_kind() {
    let ctl = builder().build();
    let a = TaskRequest::new(Kind::Sleep).with_args(5u64);
    let b = TaskRequest::new(Kind::OtherSleep).with_args(5u64);
    ctl.submit(a.clone()).expect("submit");
    ctl.submit(b.clone()).expect("submit");

    wait_for(&ctl, |s| {
        status_of(s, &a) == Some(ExecutionState::Running)
            && status_of(s, &b) == Some(ExecutionState::Running)
    })
    .await;
    let snap = wait_for(&ctl, |s| all_finished(s, &[&a, &b])).await;
    assert!(find(&snap, &a).is_successful() && find(&snap, &b).is_successful());
}

#[tokio::test(start_paused = true)]
async fn resubmitting_the_same_request_is_a_noop() {
    let ctl = builder().build();
    let req = TaskRequest::new(Kind::Sleep);
    ctl.submit(req.clone()).expect("submit");
    ctl.submit(req.clone()).expect("resubmit");

    let snap = wait_for(&ctl, |s| all_finished(s, &[&req])).await;
    assert_eq!(snap.len(), 1);

    ctl.submit(req.clone()).expect("resubmit after finish");
    time::sleep(Duration::from_secs(5)).await;
    let snap = ctl.snapshot();
    assert_eq!(snap.len(), 1);
    assert!(find(&snap, &req).is_successful());
}

#[tokio::test(start_paused = true)]
async fn timeout_fails_the_task() {
    let ctl = builder()
        .with_factory(
            Kind::Sleep,
            sleeper(TaskConfig::default().with_timeout(Some(Duration::from_secs(1)))),
        )
        .build();
    let req = TaskRequest::new(Kind::Sleep).with_args(60u64);
    ctl.submit(req.clone()).expect("submit");

    let snap = wait_for(&ctl, |s| all_finished(s, &[&req])).await;
    let done = find(&snap, &req);
    assert_eq!(
        done.error(),
        Some(&TaskError::Timeout {
            timeout: Duration::from_secs(1)
        })
    );
    assert_ran_for(&done, Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn timeout_starts_when_execution_starts() {
    let ctl = builder()
        .with_factory(
            Kind::Sleep,
            sleeper(TaskConfig::default().with_timeout(Some(Duration::from_secs(3)))),
        )
        .build();
    let slow = TaskRequest::new(Kind::Sleep).with_args(5u64);
    let b = TaskRequest::new(Kind::Sleep).with_args(2u64);
    let c = TaskRequest::new(Kind::Sleep).with_args(2u64);
    for req in [&slow, &b, &c] {
        ctl.submit(req.clone()).expect("submit");
    }

    let snap = wait_for(&ctl, |s| all_finished(s, &[&slow, &b, &c])).await;
    assert!(matches!(
        find(&snap, &slow).error(),
        Some(TaskError::Timeout { .. })
    ));
    // `c` finishes 7s after submission: it would have timed out if its timer had
    // started while it was queued.
    assert!(find(&snap, &b).is_successful());
    assert!(find(&snap, &c).is_successful());
}

#[tokio::test(start_paused = true)]
async fn timeouts_of_different_kinds_are_independent() {
    let cfg = TaskConfig::default().with_timeout(Some(Duration::from_secs(2)));
    let ctl = builder()
        .with_factory(Kind::Sleep, sleeper(cfg.clone()))
        .with_factory(Kind::OtherSleep, sleeper(cfg))
        .build();
    let a = TaskRequest::new(Kind::Sleep).with_args(10u64);
    let b = TaskRequest::new(Kind::OtherSleep).with_args(10u64);
    let a2 = TaskRequest::new(Kind::Sleep).with_args(1u64);
    for req in [&a, &b, &a2] {
        ctl.submit(req.clone()).expect("submit");
    }

    let snap = wait_for(&ctl, |s| all_finished(s, &[&a, &b, &a2])).await;
    for req in [&a, &b] {
        let st = find(&snap, req);
        assert!(matches!(st.error(), Some(TaskError::Timeout { .. })));
        assert_ran_for(&st, Duration::from_secs(2));
    }
    assert!(find(&snap, &a2).is_successful());
}

#[tokio::test(start_paused = true)]
async fn history_is_pruned_to_the_newest_entries() {
    let instant = FnFactory::arc(TaskConfig::default(), || {
        TaskFn::arc(|_ctx: TaskContext| async { Ok::<_, TaskError>(TaskOutput::empty()) })
    });
    let ctl = builder().with_factory(Kind::Sleep, instant).build();

    let reqs: Vec<TaskRequest<Kind>> = (0..100).map(|_| TaskRequest::new(Kind::Sleep)).collect();
    for req in &reqs {
        ctl.submit(req.clone()).expect("submit");
    }

    let newest: Vec<_> = reqs[50..].iter().map(TaskRequest::id).collect();
    let snap = wait_for(&ctl, |s| {
        s.iter().all(TaskState::is_finished)
            && s.iter().map(TaskState::id).eq(newest.iter().copied())
    })
    .await;

    assert_eq!(snap.len(), 50);
    assert!(snap.iter().all(TaskState::is_successful));
}

#[tokio::test(start_paused = true)]
async fn silent_errors_only_reach_the_problem_reporter() {
    let problems = Arc::new(Collector::default());
    let exceptions = Arc::new(Collector::default());
    let ctl = builder()
        .with_problem_reporter(problems.clone())
        .with_exception_reporter(exceptions.clone())
        .build();
    let req = TaskRequest::new(Kind::Fail).with_origin("unit-test");
    ctl.submit(req.clone()).expect("submit");

    wait_for(&ctl, |s| all_finished(s, &[&req])).await;

    let reports = problems.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].id, req.id());
    assert_eq!(&*reports[0].kind, "Fail");
    assert_eq!(reports[0].origin.as_deref(), Some("unit-test"));
    assert_eq!(reports[0].error, TaskError::fail("boom"));
    assert_eq!(reports[0].severity, ErrorSeverity::Silent);
    assert!(exceptions.reports().is_empty());
}

#[tokio::test(start_paused = true)]
async fn alert_errors_reach_both_reporters() {
    let problems = Arc::new(Collector::default());
    let exceptions = Arc::new(Collector::default());
    let ctl = builder()
        .with_factory(
            Kind::Fail,
            failing(TaskConfig::default().with_severity(ErrorSeverity::Alert)),
        )
        .with_problem_reporter(problems.clone())
        .with_exception_reporter(exceptions.clone())
        .build();
    let req = TaskRequest::new(Kind::Fail);
    ctl.submit(req.clone()).expect("submit");

    wait_for(&ctl, |s| all_finished(s, &[&req])).await;

    assert_eq!(problems.reports().len(), 1);
    let alerts = exceptions.reports();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, ErrorSeverity::Alert);
}

#[tokio::test(start_paused = true)]
async fn panicking_task_is_recorded_as_failed() {
    let panicky = FnFactory::arc(TaskConfig::default(), || {
        TaskFn::arc(|_ctx: TaskContext| async {
            if true {
                panic!("kaboom");
            }
            Ok::<_, TaskError>(TaskOutput::empty())
        })
    });
    let ctl = builder().with_factory(Kind::Fail, panicky).build();
    let bad = TaskRequest::new(Kind::Fail);
    let good = TaskRequest::new(Kind::Sleep);
    ctl.submit(bad.clone()).expect("submit");
    ctl.submit(good.clone()).expect("submit");

    let snap = wait_for(&ctl, |s| all_finished(s, &[&bad, &good])).await;
    assert_eq!(
        find(&snap, &bad).error(),
        Some(&TaskError::Panicked {
            reason: "kaboom".into()
        })
    );
    assert!(find(&snap, &good).is_successful());

    // The controller keeps accepting work.
    let again = TaskRequest::new(Kind::Sleep);
    ctl.submit(again.clone()).expect("submit");
    wait_for(&ctl, |s| all_finished(s, &[&again])).await;
}

/// Factory that panics in `config()` or, when that succeeds, in `provide()`.
struct Broken {
    in_config: bool,
}

impl TaskFactory for Broken {
    fn config(&self) -> TaskConfig {
        if self.in_config {
            panic!("config exploded");
        }
        TaskConfig::default().with_severity(ErrorSeverity::Alert)
    }

    fn provide(&self) -> TaskRef {
        panic!("provide exploded")
    }
}

#[tokio::test(start_paused = true)]
async fn panicking_factory_precondition_or_reporter_fails_only_that_request() {
    let alerts = Arc::new(Collector::default());
    let exploding = |_: &ErrorReport| {
        if true {
            panic!("reporter exploded");
        }
    };
    let ctl = builder()
        .with_factory(
            Kind::Sleep,
            sleeper(TaskConfig::default().with_precondition(|| panic!("precondition exploded"))),
        )
        .with_factory(Kind::Fail, Arc::new(Broken { in_config: false }))
        .with_factory(Kind::Unregistered, Arc::new(Broken { in_config: true }))
        .with_problem_reporter(Arc::new(exploding))
        .with_exception_reporter(alerts.clone())
        .build();

    let other = TaskRequest::new(Kind::OtherSleep).with_args(5u64);
    ctl.submit(other.clone()).expect("submit");
    wait_for(&ctl, |s| status_of(s, &other) == Some(ExecutionState::Running)).await;

    let bad_precondition = TaskRequest::new(Kind::Sleep);
    let bad_provide = TaskRequest::new(Kind::Fail);
    let bad_config = TaskRequest::new(Kind::Unregistered);
    ctl.submit(bad_precondition.clone()).expect("submit");
    ctl.submit(bad_provide.clone()).expect("submit");
    ctl.submit(bad_config.clone()).expect("submit");

    let snap = wait_for(&ctl, |s| {
        all_finished(s, &[&bad_precondition, &bad_provide, &bad_config])
    })
    .await;
    let panicked = |reason: &str| {
        Some(TaskError::Panicked {
            reason: reason.into(),
        })
    };
    assert_eq!(
        find(&snap, &bad_precondition).error().cloned(),
        panicked("precondition exploded")
    );
    let provide = find(&snap, &bad_provide);
    assert_eq!(provide.error().cloned(), panicked("provide exploded"));
    assert!(provide.started_at().is_none());
    assert_eq!(
        find(&snap, &bad_config).error().cloned(),
        panicked("config exploded")
    );
    assert_eq!(status_of(&snap, &other), Some(ExecutionState::Running));

    // The alert reporter still hears about the failure after the problem reporter panicked.
    let reports = alerts.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].id, bad_provide.id());

    let snap = wait_for(&ctl, |s| all_finished(s, &[&other])).await;
    assert!(find(&snap, &other).is_successful());
    assert!(!ctl.is_closed());
    let again = TaskRequest::new(Kind::OtherSleep);
    ctl.submit(again.clone()).expect("still accepting work");
    wait_for(&ctl, |s| all_finished(s, &[&again])).await;
}

#[tokio::test(start_paused = true)]
async fn cancelling_an_unknown_id_is_a_noop() {
    let problems = Arc::new(Collector::default());
    let ctl = builder().with_problem_reporter(problems.clone()).build();
    let mut events = ctl.subscribe();

    ctl.cancel(TaskId::new());
    time::sleep(Duration::from_millis(1)).await;
    assert!(ctl.snapshot().is_empty());
    assert!(events.try_recv().is_err());

    let busy = TaskRequest::new(Kind::Sleep).with_args(2u64);
    ctl.submit(busy.clone()).expect("submit");
    wait_for(&ctl, |s| status_of(s, &busy) == Some(ExecutionState::Running)).await;
    ctl.cancel(TaskId::new());

    let snap = wait_for(&ctl, |s| all_finished(s, &[&busy])).await;
    assert_eq!(snap.len(), 1);
    assert!(find(&snap, &busy).is_successful());
    assert!(problems.reports().is_empty());

    let kinds: Vec<EventKind> = std::iter::from_fn(|| events.try_recv().ok())
        .map(|e| e.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::TaskSubmitted,
            EventKind::TaskStarting,
            EventKind::TaskSucceeded
        ]
    );
}

#[test]
fn submit_after_the_actor_is_gone_marks_the_handle_closed() {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime");
    let ctl = rt.block_on(async { builder().build() });
    drop(rt);

    assert!(!ctl.is_closed());
    assert_eq!(
        ctl.submit(TaskRequest::new(Kind::Sleep)),
        Err(ControllerError::Closed)
    );
    assert!(ctl.is_closed());
}

#[tokio::test(start_paused = true)]
async fn close_cancels_pending_and_lets_running_finish() {
    let ctl = builder().build();
    let running = TaskRequest::new(Kind::Sleep).with_args(2u64);
    let pending = TaskRequest::new(Kind::Sleep);
    ctl.submit(running.clone()).expect("submit");
    ctl.submit(pending.clone()).expect("submit");

    wait_for(&ctl, |s| status_of(s, &running) == Some(ExecutionState::Running)).await;
    ctl.close();
    assert_eq!(
        ctl.submit(TaskRequest::new(Kind::Sleep)),
        Err(ControllerError::Closed)
    );
    ctl.wait_closed().await;

    let snap = ctl.snapshot();
    assert!(find(&snap, &running).is_successful());
    assert_eq!(find(&snap, &pending).error(), Some(&TaskError::Canceled));
    assert!(snap.iter().all(TaskState::is_finished));

    // Observers see the last snapshot, then the end of the stream.
    let mut updates = ctl.observe();
    assert_eq!(updates.next().await.map(|s| s.len()), Some(2));
    assert!(updates.next().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn dropping_every_handle_shuts_the_actor_down() {
    let ctl = builder().build();
    let updates = ctl.observe();
    drop(ctl);

    let seen: Vec<Vec<TaskState<Kind>>> = updates.collect().await;
    assert!(!seen.is_empty());
    assert!(seen.iter().all(Vec::is_empty));
}

#[tokio::test(start_paused = true)]
async fn lifecycle_events_are_published_in_order() {
    let ctl = builder().build();
    let mut events = ctl.subscribe();
    let req = TaskRequest::new(Kind::Sleep);
    ctl.submit(req.clone()).expect("submit");
    wait_for(&ctl, |s| all_finished(s, &[&req])).await;

    let mut kinds = Vec::new();
    while let Ok(ev) = events.try_recv() {
        assert_eq!(ev.id, Some(req.id()));
        assert_eq!(ev.task.as_deref(), Some("Sleep"));
        kinds.push(ev.kind);
    }
    assert_eq!(
        kinds,
        vec![
            EventKind::TaskSubmitted,
            EventKind::TaskStarting,
            EventKind::TaskSucceeded
        ]
    );
}

#[derive(Default)]
struct KindRecorder(Mutex<Vec<EventKind>>);

impl KindRecorder {
    fn kinds(&self) -> Vec<EventKind> {
        self.0.lock().expect("lock").clone()
    }
}

#[async_trait]
impl Subscribe for KindRecorder {
    async fn on_event(&self, event: &Event) {
        self.0.lock().expect("lock").push(event.kind);
    }

    fn name(&self) -> &'static str {
        "kind-recorder"
    }
}

#[tokio::test(start_paused = true)]
async fn subscribers_receive_events_until_close() {
    let recorder = Arc::new(KindRecorder::default());
    let ctl = builder()
        .with_subscribers(vec![recorder.clone() as Arc<dyn Subscribe>])
        .build();
    let req = TaskRequest::new(Kind::Fail);
    ctl.submit(req.clone()).expect("submit");
    wait_for(&ctl, |s| all_finished(s, &[&req])).await;
    ctl.close();
    ctl.wait_closed().await;

    let mut seen = recorder.kinds();
    for _ in 0..100 {
        if seen.contains(&EventKind::ControllerClosed) {
            break;
        }
        time::sleep(Duration::from_millis(10)).await;
        seen = recorder.kinds();
    }
    assert_eq!(
        seen,
        vec![
            EventKind::TaskSubmitted,
            EventKind::TaskStarting,
            EventKind::TaskFailed,
            EventKind::ControllerClosed
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn to_new_task_runs_the_same_work_again() {
    let ctl = builder().build();
    let first = TaskRequest::new(Kind::Sleep).with_args(3u64).with_origin("ui");
    ctl.submit(first.clone()).expect("submit");
    let rerun = first.to_new_task();
    ctl.submit(rerun.clone()).expect("submit");

    let snap = wait_for(&ctl, |s| all_finished(s, &[&first, &rerun])).await;
    assert_eq!(snap.len(), 2);
    let again = find(&snap, &rerun);
    assert_eq!(again.result().and_then(|r| r.get::<u64>()), Some(&3));
    assert_eq!(again.request().origin(), Some("ui"));
}
