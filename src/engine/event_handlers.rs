// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::BTreeSet;

use tracing::debug;

use crate::dag::{ScheduledTask, Scheduler, TaskRunState, TriggerScope};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeOptions, TaskOutcome, TriggerReason};
use crate::types::TaskId;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// The pipeline is finished; exit cleanly.
    RequestExit,
    /// A task failed; stop the pipeline and report the failure.
    Abort { task: TaskId, message: String },
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

fn scope_for(reason: TriggerReason) -> TriggerScope {
    match reason {
        TriggerReason::Manual => TriggerScope::WithDependents,
        TriggerReason::FileWatch => TriggerScope::TaskOnly,
    }
}

/// Handle a task trigger event.
///
/// - Idle scheduler: start a new run seeded with this trigger plus anything
///   already queued.
/// - Active run, task not in it: merge it into the current run.
/// - Active run, task already in it: record it in the queue for a later run.
pub fn handle_task_trigger(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    task: TaskId,
    reason: TriggerReason,
) -> CoreStep {
    let mut commands = Vec::new();
    let scope = scope_for(reason);

    if scheduler.is_idle() {
        let queued = queue.drain_pending();
        let mut step = start_new_run_from_triggers(scheduler, &[(task, scope)]);
        commands.append(&mut step.commands);
        let mut step = merge_into_run(scheduler, &queued);
        commands.append(&mut step.commands);
        return CoreStep::running(commands);
    }

    match scheduler.run_state_of(task) {
        None => {
            debug!(task = %task, "trigger for task outside the pipeline; ignoring");
        }
        Some(TaskRunState::NotInRun) => {
            let newly_ready = scheduler.handle_trigger(task, scope);
            if !newly_ready.is_empty() {
                commands.push(CoreCommand::DispatchTasks(newly_ready));
            }
        }
        Some(_already_in_run) => {
            queue.record_trigger(task);
        }
    }

    CoreStep::running(commands)
}

/// Handle a task progress event.
pub fn handle_task_progress(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    options: &RuntimeOptions,
    task: TaskId,
) -> CoreStep {
    let mut commands = Vec::new();

    let newly_ready = scheduler.handle_progress(task);
    if !newly_ready.is_empty() {
        commands.push(CoreCommand::DispatchTasks(newly_ready));
    }

    commands.append(&mut maybe_start_queued_run(scheduler, queue));
    finish_step(scheduler, queue, options, commands)
}

/// Handle a task completion event.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    options: &RuntimeOptions,
    task: TaskId,
    outcome: TaskOutcome,
) -> CoreStep {
    if let TaskOutcome::Failed(message) = &outcome {
        scheduler.handle_completion(task, &outcome);
        return CoreStep {
            commands: vec![CoreCommand::Abort {
                task,
                message: message.clone(),
            }],
            keep_running: false,
        };
    }

    let mut commands = Vec::new();

    let newly_ready = scheduler.handle_completion(task, &outcome);
    if !newly_ready.is_empty() {
        commands.push(CoreCommand::DispatchTasks(newly_ready));
    }

    commands.append(&mut maybe_start_queued_run(scheduler, queue));
    finish_step(scheduler, queue, options, commands)
}

/// Seed a new run from the given triggers.
pub fn start_new_run_from_triggers(
    scheduler: &mut Scheduler,
    triggers: &[(TaskId, TriggerScope)],
) -> CoreStep {
    if triggers.is_empty() {
        return CoreStep::running(Vec::new());
    }

    scheduler.start_new_run();

    let mut all_ready = Vec::new();
    for (task, scope) in triggers {
        all_ready.extend(scheduler.handle_trigger(*task, *scope));
    }

    let mut commands = Vec::new();
    if !all_ready.is_empty() {
        commands.push(CoreCommand::DispatchTasks(all_ready));
    }
    CoreStep::running(commands)
}

/// Merge queued rebuilds into the active run, skipping tasks already in it.
fn merge_into_run(scheduler: &mut Scheduler, queued: &[TaskId]) -> CoreStep {
    let in_run: BTreeSet<TaskId> = scheduler.tasks_in_current_run().into_iter().collect();

    let mut all_ready = Vec::new();
    for task in queued.iter().filter(|t| !in_run.contains(t)) {
        all_ready.extend(scheduler.handle_trigger(*task, TriggerScope::TaskOnly));
    }

    let mut commands = Vec::new();
    if !all_ready.is_empty() {
        commands.push(CoreCommand::DispatchTasks(all_ready));
    }
    CoreStep::running(commands)
}

/// If the scheduler is idle and there are queued triggers, start a new run.
fn maybe_start_queued_run(scheduler: &mut Scheduler, queue: &mut TriggerQueue) -> Vec<CoreCommand> {
    if !scheduler.is_idle() {
        return Vec::new();
    }

    let triggers: Vec<(TaskId, TriggerScope)> = queue
        .drain_pending()
        .into_iter()
        .map(|t| (t, TriggerScope::TaskOnly))
        .collect();

    start_new_run_from_triggers(scheduler, &triggers).commands
}

fn finish_step(
    scheduler: &Scheduler,
    queue: &TriggerQueue,
    options: &RuntimeOptions,
    mut commands: Vec<CoreCommand>,
) -> CoreStep {
    let done = options.exit_when_idle && scheduler.is_idle() && queue.is_empty();
    if done {
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running: !done,
    }
}
