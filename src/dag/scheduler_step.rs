// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::task_info::ScheduledTask;
use crate::types::TaskId;

/// Structured result of a single scheduler "step".
///
/// Useful for tests that step the graph manually and make assertions about
/// what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks that became ready to run as a result of this step.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// Tasks newly marked as failed in this step (the failed task and any
    /// dependents it blocked).
    pub newly_failed: Vec<TaskId>,
    /// Whether this step finished the current run.
    pub run_just_finished: bool,
}
