// src/engine/mod.rs

//! Orchestration engine for sitepipe.
//!
//! This module ties together:
//! - the task scheduler
//! - the trigger queue (what happens when triggers arrive while a run is active)
//! - the main runtime event loop that reacts to:
//!   - initial pipeline triggers and watch rebuild triggers
//!   - long-lived progress events
//!   - task completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::fmt;

use crate::types::TaskId;

/// Outcome of a task for the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// The task reported errors but carried on (development mode).
    Recovered { errors: usize },
    /// The task stopped; the pipeline cannot continue.
    Failed(String),
}

impl TaskOutcome {
    /// Whether dependents may run after this outcome.
    pub fn satisfies_dependents(&self) -> bool {
        !matches!(self, TaskOutcome::Failed(_))
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutcome::Success => f.write_str("success"),
            TaskOutcome::Recovered { errors } => write!(f, "recovered from {errors} error(s)"),
            TaskOutcome::Failed(msg) => write!(f, "failed: {msg}"),
        }
    }
}

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Pipeline start: the task and everything after it runs.
    Manual,
    /// A watched source changed: only the matching task is rebuilt.
    FileWatch,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Exit the runtime once the pipeline is idle and nothing is queued.
    /// Set for pipelines without long-lived tasks.
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from watchers, executors, etc.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A task should be (logically) triggered.
    TaskTriggered { task: TaskId, reason: TriggerReason },
    /// A long-lived task finished starting up.
    TaskProgressed { task: TaskId },
    /// A task finished with a concrete outcome.
    TaskCompleted { task: TaskId, outcome: TaskOutcome },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::TriggerQueue;
pub use runtime::Runtime;
