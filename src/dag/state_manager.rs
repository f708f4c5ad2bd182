// src/dag/state_manager.rs

//! Per-run state management for tasks in the scheduler.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info, warn};

use crate::dag::DagGraph;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo, TriggerScope};
use crate::types::TaskId;

/// Manages per-run state transitions for tasks.
pub struct StateManager<'a> {
    graph: &'a DagGraph,
    tasks: &'a mut BTreeMap<TaskId, TaskInfo>,
    current_run_id: Option<u64>,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a DagGraph,
        tasks: &'a mut BTreeMap<TaskId, TaskInfo>,
        current_run_id: Option<u64>,
    ) -> Self {
        Self {
            graph,
            tasks,
            current_run_id,
        }
    }

    /// Include a triggered task (and, depending on `scope`, everything
    /// downstream of it) in this run.
    ///
    /// Tasks not yet part of the run are marked `Pending`; tasks already
    /// participating keep their current state.
    pub fn mark_pending(&mut self, root: TaskId, scope: TriggerScope) {
        let mut stack: Vec<TaskId> = vec![root];
        let mut visited: HashSet<TaskId> = HashSet::new();

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }

            let Some(info) = self.tasks.get_mut(&id) else {
                warn!(task = %id, "node in graph not present in tasks map");
                continue;
            };

            if info.run_state.is_none() {
                info.run_state = Some(RunState::Pending);
                debug!(task = %id, "marked Pending for this run");
            }

            match scope {
                TriggerScope::WithDependents => {
                    stack.extend(self.graph.dependents_of(id).iter().copied());
                }
                TriggerScope::TaskOnly => {
                    // Dependencies that never succeeded have to be built first.
                    let deps = self.graph.dependencies_of(id).iter().copied();
                    stack.extend(deps.filter(|dep| {
                        self.tasks
                            .get(dep)
                            .is_some_and(|d| d.run_state.is_none() && d.last_successful_run.is_none())
                    }));
                }
            }
        }
    }

    /// Mark all participating dependents (transitively) of a failed task as
    /// `DoneFailed` for this run.
    ///
    /// Returns the tasks newly marked as failed, excluding `failed_task`.
    pub fn mark_dependents_failed(&mut self, failed_task: TaskId) -> Vec<TaskId> {
        let mut stack: Vec<TaskId> = self.graph.dependents_of(failed_task).to_vec();
        let mut newly_failed = Vec::new();

        while let Some(id) = stack.pop() {
            if let Some(info) = self.tasks.get_mut(&id) {
                match info.run_state {
                    Some(RunState::Pending) | Some(RunState::Running) => {
                        info.run_state = Some(RunState::DoneFailed);
                        debug!(task = %id, "marking dependent as DoneFailed due to upstream failure");
                        newly_failed.push(id);
                        stack.extend(self.graph.dependents_of(id).iter().copied());
                    }
                    Some(RunState::DoneSuccess) | Some(RunState::DoneFailed) | None => {}
                }
            }
        }

        newly_failed
    }

    /// Collect `Pending` tasks whose dependencies are satisfied, mark them
    /// `Running`, and return them in execution order.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledTask> {
        let candidates: Vec<TaskId> = self
            .graph
            .tasks()
            .filter(|id| {
                self.tasks.get(id).is_some_and(|info| {
                    matches!(info.run_state, Some(RunState::Pending))
                        && ReadOnlyStateManager::new(&*self.tasks).deps_satisfied_for_info(info)
                })
            })
            .collect();

        let mut ready = Vec::with_capacity(candidates.len());
        for id in candidates {
            if let Some(info) = self.tasks.get_mut(&id) {
                let is_rerun = info.last_successful_run.is_some() || info.last_failed_run.is_some();
                info!(
                    task = %id,
                    run_id = self.current_run_id,
                    rerun = is_rerun,
                    "scheduling task"
                );

                info.run_state = Some(RunState::Running);
                ready.push(ScheduledTask::from_task_info(
                    info,
                    self.current_run_id.unwrap_or(0),
                ));
            }
        }

        ready
    }

    /// Check if all tasks are in a terminal state.
    pub fn all_tasks_terminal(&self) -> bool {
        !self.tasks.values().any(|info| {
            matches!(
                info.run_state,
                Some(RunState::Pending) | Some(RunState::Running)
            )
        })
    }
}

/// A read-only view for checking dependency satisfaction.
pub struct ReadOnlyStateManager<'a> {
    tasks: &'a BTreeMap<TaskId, TaskInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tasks: &'a BTreeMap<TaskId, TaskInfo>) -> Self {
        Self { tasks }
    }

    /// Whether all dependencies of `info` are satisfied for the current run.
    ///
    /// Dependencies participating in this run must have settled successfully;
    /// dependencies outside the run count if they ever did.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        info.deps.iter().all(|dep_id| {
            let Some(dep) = self.tasks.get(dep_id) else {
                warn!(task = %info.id, dep = %dep_id, "dependency missing from tasks map");
                return false;
            };

            match dep.run_state {
                Some(RunState::DoneSuccess) => true,
                Some(RunState::DoneFailed) | Some(RunState::Pending) | Some(RunState::Running) => {
                    false
                }
                None => dep.last_successful_run.is_some(),
            }
        })
    }
}
