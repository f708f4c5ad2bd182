// src/serve/reload.rs

//! Fan-out of "output changed" notifications to connected browsers.

use tokio::sync::broadcast;
use tracing::debug;

use crate::types::TaskId;

/// A task finished writing into the output tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadSignal {
    pub task: TaskId,
}

/// Broadcast hub shared by every task and the dev server.
///
/// Cloning yields another handle to the same channel.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    tx: broadcast::Sender<ReloadSignal>,
}

impl ReloadHub {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(16);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadSignal> {
        self.tx.subscribe()
    }

    /// Notify subscribers; a hub nobody listens to is a no-op.
    pub fn notify(&self, task: TaskId) {
        match self.tx.send(ReloadSignal { task }) {
            Ok(n) => debug!(task = %task, subscribers = n, "reload signal sent"),
            Err(_) => debug!(task = %task, "reload signal dropped; no subscribers"),
        }
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}
