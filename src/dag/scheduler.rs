// src/dag/scheduler.rs

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::StateManager;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo, TaskRunState, TriggerScope};
use crate::engine::TaskOutcome;
use crate::types::TaskId;

/// Scheduler holds the immutable task graph plus mutable per-run state.
///
/// It is responsible for:
/// - remembering which tasks are part of the current run
/// - deciding when a triggered task is "ready" to run (deps satisfied)
/// - marking tasks as succeeded/failed/progressed
/// - failing dependents when a task fails
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tasks: BTreeMap<TaskId, TaskInfo>,
    /// Monotonically increasing run ID.
    run_counter: u64,
    /// Currently active run ID, or `None` if there is no active run.
    current_run_id: Option<u64>,
}

impl Scheduler {
    pub fn new(graph: DagGraph) -> Self {
        let tasks = graph
            .tasks()
            .map(|id| (id, TaskInfo::new(id, graph.dependencies_of(id).to_vec())))
            .collect();

        Self {
            graph,
            tasks,
            run_counter: 0,
            current_run_id: None,
        }
    }

    /// Returns `true` if there is currently no active run.
    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    /// Read-only view of the given task's run state.
    pub fn run_state_of(&self, task: TaskId) -> Option<TaskRunState> {
        let info = self.tasks.get(&task)?;
        Some(info.run_state.into())
    }

    /// Tasks participating in the *active* run.
    ///
    /// Empty when there is no active run, even though tasks may still carry
    /// a terminal `run_state` from the previous one.
    pub fn tasks_in_current_run(&self) -> Vec<TaskId> {
        if self.current_run_id.is_none() {
            return Vec::new();
        }

        self.tasks
            .values()
            .filter(|info| info.run_state.is_some())
            .map(|info| info.id)
            .collect()
    }

    /// Start a new run, resetting per-run state but keeping historical success
    /// information (for dependency satisfaction on later runs).
    pub fn start_new_run(&mut self) {
        self.run_counter += 1;
        self.current_run_id = Some(self.run_counter);

        for info in self.tasks.values_mut() {
            info.run_state = None;
        }

        debug!(run_id = self.run_counter, "scheduler: starting new run");
    }

    /// Handle a trigger for a task.
    pub fn handle_trigger(&mut self, task: TaskId, scope: TriggerScope) -> Vec<ScheduledTask> {
        self.trigger_step_internal(task, scope).newly_scheduled
    }

    /// Handle "progress" from a long-lived task.
    pub fn handle_progress(&mut self, task: TaskId) -> Vec<ScheduledTask> {
        self.progress_step_internal(task).newly_scheduled
    }

    /// Handle completion of a task with a concrete outcome.
    pub fn handle_completion(&mut self, task: TaskId, outcome: &TaskOutcome) -> Vec<ScheduledTask> {
        self.completion_step_internal(task, outcome).newly_scheduled
    }

    /// Manual-step variant of `handle_trigger` returning a [`SchedulerStep`].
    pub fn step_trigger(&mut self, task: TaskId, scope: TriggerScope) -> SchedulerStep {
        self.trigger_step_internal(task, scope)
    }

    /// Manual-step variant of `handle_completion` returning a [`SchedulerStep`].
    pub fn step_completion(&mut self, task: TaskId, outcome: &TaskOutcome) -> SchedulerStep {
        self.completion_step_internal(task, outcome)
    }

    /// Clear `current_run_id` once every task is terminal.
    ///
    /// Returns `true` if this call transitioned the scheduler to idle.
    fn maybe_finish_run(&mut self) -> bool {
        if self.current_run_id.is_none() {
            return false;
        }

        let manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);

        if manager.all_tasks_terminal() {
            info!(
                run_id = self.current_run_id,
                "scheduler: all tasks terminal; marking run as finished"
            );
            self.current_run_id = None;
            true
        } else {
            false
        }
    }

    fn trigger_step_internal(&mut self, task: TaskId, scope: TriggerScope) -> SchedulerStep {
        if !self.tasks.contains_key(&task) {
            warn!(task = %task, "trigger for task outside the pipeline; ignoring");
            return SchedulerStep::default();
        }

        if self.current_run_id.is_none() {
            self.start_new_run();
        }

        let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
        manager.mark_pending(task, scope);
        let newly_scheduled = manager.collect_new_ready_tasks();
        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            newly_failed: Vec::new(),
            run_just_finished,
        }
    }

    fn progress_step_internal(&mut self, task: TaskId) -> SchedulerStep {
        let Some(run_id) = self.current_run_id else {
            warn!(task = %task, "progress with no active run; ignoring");
            return SchedulerStep::default();
        };

        let Some(info) = self.tasks.get_mut(&task) else {
            warn!(task = %task, "progress from unknown task; ignoring");
            return SchedulerStep::default();
        };

        debug!(task = %task, run_id, "task reported progress; marking DoneSuccess for this run");
        info.run_state = Some(RunState::DoneSuccess);
        info.last_successful_run = Some(run_id);

        let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
        let newly_scheduled = manager.collect_new_ready_tasks();
        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            newly_failed: Vec::new(),
            run_just_finished,
        }
    }

    fn completion_step_internal(&mut self, task: TaskId, outcome: &TaskOutcome) -> SchedulerStep {
        let Some(run_id) = self.current_run_id else {
            warn!(task = %task, "completion with no active run; ignoring");
            return SchedulerStep::default();
        };

        let mut newly_scheduled = Vec::new();
        let mut newly_failed = Vec::new();

        match self.tasks.get_mut(&task) {
            Some(info) => {
                if outcome.satisfies_dependents() {
                    info.run_state = Some(RunState::DoneSuccess);
                    info.last_successful_run = Some(run_id);
                    debug!(task = %task, run_id, outcome = %outcome, "task settled");
                    let mut manager =
                        StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
                    newly_scheduled.extend(manager.collect_new_ready_tasks());
                } else {
                    info.run_state = Some(RunState::DoneFailed);
                    info.last_failed_run = Some(run_id);
                    warn!(task = %task, run_id, outcome = %outcome, "task failed; failing dependents in this run");
                    newly_failed.push(task);
                    let mut manager =
                        StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
                    newly_failed.append(&mut manager.mark_dependents_failed(task));
                }
            }
            None => {
                warn!(task = %task, "completion for unknown task; ignoring");
            }
        }

        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            newly_failed,
            run_just_finished,
        }
    }
}
