// src/exec/task_runner.rs

//! Runs one scheduled task and reports its outcome.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::context::BuildContext;
use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::serve::DevServer;
use crate::tasks;
use crate::types::TaskId;
use crate::watch::{build_profiles, spawn_watcher};

/// Run a single task.
///
/// Finite tasks end with exactly one `TaskCompleted`. Long-lived tasks send
/// `TaskProgressed` once started and then stay up until cancelled; a failure
/// to start is reported as `TaskCompleted` with `Failed`.
pub async fn run_task(
    task: ScheduledTask,
    ctx: Arc<BuildContext>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    cancel_rx: oneshot::Receiver<()>,
) {
    let id = task.id;
    let run_id = task.run_id;
    info!(task = %id, run_id, "starting task");

    let result = match id {
        TaskId::Watch => run_watch(&ctx, &runtime_tx, cancel_rx).await,
        TaskId::Serve => run_server(&ctx, &runtime_tx, cancel_rx).await,
        _ => run_finite(id, ctx, &runtime_tx).await,
    };

    if let Err(err) = result {
        error!(task = %id, run_id, error = %format!("{err:#}"), "task execution error");
        let _ = runtime_tx
            .send(RuntimeEvent::TaskCompleted {
                task: id,
                outcome: TaskOutcome::Failed(format!("{err:#}")),
            })
            .await;
    }
}

async fn run_finite(
    id: TaskId,
    ctx: Arc<BuildContext>,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> Result<()> {
    let outcome = tokio::task::spawn_blocking(move || tasks::execute(id, &ctx))
        .await
        .with_context(|| format!("task '{id}' panicked"))?;

    info!(task = %id, %outcome, "task finished");

    runtime_tx
        .send(RuntimeEvent::TaskCompleted { task: id, outcome })
        .await
        .with_context(|| format!("sending TaskCompleted event for task '{id}' to runtime"))
}

async fn report_started(id: TaskId, runtime_tx: &mpsc::Sender<RuntimeEvent>) -> Result<()> {
    runtime_tx
        .send(RuntimeEvent::TaskProgressed { task: id })
        .await
        .with_context(|| format!("sending TaskProgressed event for task '{id}' to runtime"))
}

async fn run_watch(
    ctx: &Arc<BuildContext>,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
    cancel_rx: oneshot::Receiver<()>,
) -> Result<()> {
    let profiles = build_profiles(ctx.config())?;
    let handle = spawn_watcher(ctx.root(), profiles, runtime_tx.clone())?;
    report_started(TaskId::Watch, runtime_tx).await?;

    let _ = cancel_rx.await;
    debug!("stopping file watcher");
    drop(handle);
    Ok(())
}

async fn run_server(
    ctx: &Arc<BuildContext>,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
    cancel_rx: oneshot::Receiver<()>,
) -> Result<()> {
    let settings = ctx.config().server();
    let server = DevServer::bind(Arc::clone(ctx), settings.port).await?;
    if settings.open {
        info!(url = %format!("http://{}/", server.local_addr()?), "open this address in a browser");
    }
    report_started(TaskId::Serve, runtime_tx).await?;

    tokio::select! {
        res = server.run() => {
            // Already reported as started; a later crash only gets logged.
            if let Err(err) = res {
                error!(error = %format!("{err:#}"), "dev server stopped");
            } else {
                warn!("dev server exited");
            }
        }
        _ = cancel_rx => debug!("stopping dev server"),
    }
    Ok(())
}
