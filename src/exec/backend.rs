// src/exec/backend.rs

//! Pluggable executor backend.
//!
//! The runtime talks to an `ExecutorBackend` instead of a raw channel, so
//! tests can record scheduled tasks and answer with synthetic events.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::context::BuildContext;
use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::errors::{Error, Result};

use super::executor_loop::spawn_executor;

/// How scheduled tasks get executed.
pub trait ExecutorBackend: Send {
    /// Dispatch the given tasks. Outcomes come back as `RuntimeEvent`s.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Backend that forwards tasks to the background executor loop.
pub struct RealExecutorBackend {
    tx: mpsc::Sender<ScheduledTask>,
}

impl RealExecutorBackend {
    /// Spawns the executor loop immediately; must be called inside a Tokio
    /// runtime.
    pub fn new(ctx: Arc<BuildContext>, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        let tx = spawn_executor(ctx, runtime_tx);
        Self { tx }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.tx.clone();

        Box::pin(async move {
            for task in tasks {
                tx.send(task).await.map_err(Error::from)?;
            }
            Ok(())
        })
    }
}
