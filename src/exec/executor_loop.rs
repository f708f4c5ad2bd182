// src/exec/executor_loop.rs

//! Executor loop that tracks running tasks.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::context::BuildContext;
use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::exec::task_runner::run_task;
use crate::types::TaskId;

/// A task the executor has started.
///
/// `cancel` stops a long-lived task; finite tasks ignore it and run to
/// completion.
struct ActiveTask {
    cancel: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

/// Spawn the background executor loop.
///
/// Each scheduled task runs in its own Tokio task. A long-lived task that is
/// already running is not started twice; its earlier start satisfies the new
/// run. When the returned sender is dropped, every long-lived task is
/// cancelled.
pub fn spawn_executor(
    ctx: Arc<BuildContext>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        let mut active: HashMap<TaskId, ActiveTask> = HashMap::new();

        while let Some(task) = rx.recv().await {
            handle_scheduled_task(task, &ctx, &mut active, &runtime_tx).await;
        }

        for (id, mut task) in active.drain() {
            if let Some(cancel) = task.cancel.take() {
                if cancel.send(()).is_ok() {
                    debug!(task = %id, "cancelled on executor shutdown");
                }
            }
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}

async fn handle_scheduled_task(
    task: ScheduledTask,
    ctx: &Arc<BuildContext>,
    active: &mut HashMap<TaskId, ActiveTask>,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) {
    if let Some(existing) = active.get(&task.id) {
        if !existing.handle.is_finished() {
            if task.long_lived {
                debug!(
                    task = %task.id,
                    run_id = task.run_id,
                    "long-lived task already running; synthesizing progress"
                );
                let _ = runtime_tx
                    .send(RuntimeEvent::TaskProgressed { task: task.id })
                    .await;
                return;
            }
            warn!(
                task = %task.id,
                run_id = task.run_id,
                "previous instance still running; starting another"
            );
        }
    }

    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    let rt_tx = runtime_tx.clone();
    let ctx = Arc::clone(ctx);
    let id = task.id;

    let handle = tokio::spawn(async move {
        run_task(task, ctx, rt_tx, cancel_rx).await;
        debug!(task = %id, "task runner future finished");
    });

    active.insert(
        id,
        ActiveTask {
            cancel: Some(cancel_tx),
            handle,
        },
    );
}
