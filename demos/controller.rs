//! # Controller Example
//!
//! Shows the controller with both collision policies, a timeout and a cancel:
//! - Enqueue: same-kind requests run one by one
//! - SkipIfActive: same-kind requests are skipped while one is active
//! - Timeout: the timer starts when a request starts running
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example controller
//! ```

use std::{sync::Arc, time::Duration};

use futures::StreamExt;
use taskwarden::{
    CollisionPolicy, Controller, ControllerBuilder, ControllerConfig, ErrorSeverity, FactoryRef,
    FnFactory, LogWriter, Subscribe, TaskConfig, TaskContext, TaskError, TaskFn, TaskId,
    TaskOutput, TaskRequest, TaskState,
};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Job {
    Export,
    Sync,
    Upload,
}

/// Task that works for `args` milliseconds and reports progress every 200ms.
fn worker(cfg: TaskConfig) -> FactoryRef {
    FnFactory::arc(cfg, || {
        TaskFn::arc(|ctx: TaskContext| async move {
            let total = ctx.args().get::<u64>().copied().unwrap_or(600);
            let mut done = 0;
            while done < total {
                if ctx.is_cancelled() {
                    return Err(TaskError::Canceled);
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
                done += 200;
                ctx.progress().send(format!("{done}/{total}ms"));
            }
            Ok(TaskOutput::new(total))
        })
    })
}

fn render(states: &[TaskState<Job>]) {
    println!("---- {} tracked", states.len());
    for s in states {
        let outcome = match (s.result(), s.error(), s.is_skipped()) {
            (Some(out), _, _) => format!("ok {:?}", out.get::<u64>()),
            (_, Some(err), _) => format!("err {err}"),
            (_, _, true) => "skipped".to_string(),
            _ => String::new(),
        };
        println!("  {:<7?} {:<9?} {}", s.kind(), s.status(), outcome);
    }
}

/// Waits until `last` and everything before it has finished.
async fn settle(ctl: &Controller<Job>, last: TaskId) {
    let mut updates = ctl.observe();
    while let Some(states) = updates.next().await {
        let seen = states.iter().any(|s| s.id() == last);
        if seen && states.iter().all(|s| s.is_finished()) {
            render(&states);
            return;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
    let ctl = ControllerBuilder::new(ControllerConfig {
        history_limit: 8,
        ..ControllerConfig::default()
    })
    .with_subscribers(subs)
    .with_factory(Job::Export, worker(TaskConfig::default()))
    .with_factory(
        Job::Sync,
        worker(TaskConfig::default().with_collision(CollisionPolicy::SkipIfActive)),
    )
    .with_factory(
        Job::Upload,
        worker(
            TaskConfig::default()
                .with_timeout(Some(Duration::from_millis(500)))
                .with_severity(ErrorSeverity::Alert),
        ),
    )
    .build();

    println!("Demo 1: Enqueue, three exports run one after another");
    let mut last = None;
    for _ in 0..3 {
        let req = TaskRequest::new(Job::Export).with_args(400u64);
        last = Some(req.id());
        ctl.submit(req)?;
    }
    if let Some(last) = last {
        settle(&ctl, last).await;
    }

    println!("Demo 2: SkipIfActive, the second sync is skipped");
    let second = TaskRequest::new(Job::Sync);
    let last = second.id();
    ctl.submit(TaskRequest::new(Job::Sync))?;
    ctl.submit(second)?;
    settle(&ctl, last).await;

    println!("Demo 3: Timeout, a long upload fails, a short one succeeds");
    ctl.submit(TaskRequest::new(Job::Upload).with_args(2_000u64))?;
    let short = TaskRequest::new(Job::Upload).with_args(200u64);
    let last = short.id();
    ctl.submit(short)?;
    settle(&ctl, last).await;

    println!("Demo 4: Cancel a running export");
    let long = TaskRequest::new(Job::Export).with_args(5_000u64);
    let id = long.id();
    ctl.submit(long)?;
    tokio::time::sleep(Duration::from_millis(300)).await;
    if let Some(state) = ctl.get(id) {
        let mut progress = state.progress();
        if let Some(p) = progress.next().await {
            println!("  progress: {p:?}");
        }
    }
    ctl.cancel(id);
    settle(&ctl, id).await;

    ctl.close();
    ctl.wait_closed().await;
    Ok(())
}
