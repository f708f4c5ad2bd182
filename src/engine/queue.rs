// src/engine/queue.rs

use std::collections::{BTreeSet, VecDeque};

use tracing::{debug, warn};

use crate::types::{TaskId, TriggerWhileRunningBehaviour};

/// Rebuild triggers that arrive while a run is already executing.
///
/// - Each queued entry is a *batch* of tasks to rebuild together in one
///   future run.
/// - `max_runs` bounds how many batches are kept; the oldest is dropped
///   when it overflows.
/// - When the runtime goes idle it calls [`TriggerQueue::drain_pending`],
///   which merges every batch into the task set of the next run.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    max_runs: usize,
    runs: VecDeque<BTreeSet<TaskId>>,
}

impl TriggerQueue {
    /// `max_runs` is clamped to at least 1.
    pub fn new(behaviour: TriggerWhileRunningBehaviour, max_runs: usize) -> Self {
        Self {
            behaviour,
            max_runs: max_runs.max(1),
            runs: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn behaviour(&self) -> TriggerWhileRunningBehaviour {
        self.behaviour
    }

    /// Record that a task was triggered while a run is in progress.
    ///
    /// - `Queue`: merge into the last batch (creating one if needed).
    /// - `Cancel`: forget earlier batches and keep only this task.
    pub fn record_trigger(&mut self, task: TaskId) {
        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                if let Some(last_batch) = self.runs.back_mut() {
                    let inserted = last_batch.insert(task);
                    debug!(task = %task, inserted, "merged trigger into last queued batch");
                } else {
                    self.runs.push_back(BTreeSet::from([task]));
                    debug!(task = %task, "created first queued batch");
                }

                if self.runs.len() > self.max_runs {
                    warn!(
                        current_batches = self.runs.len(),
                        max_runs = self.max_runs,
                        "exceeded queue_length; dropping oldest queued batches"
                    );
                    while self.runs.len() > self.max_runs {
                        self.runs.pop_front();
                    }
                }
            }
            TriggerWhileRunningBehaviour::Cancel => {
                debug!(task = %task, "resetting queued batches to this task only");
                self.runs.clear();
                self.runs.push_back(BTreeSet::from([task]));
            }
        }
    }

    /// Drain all queued batches into a single, ordered task list.
    pub fn drain_pending(&mut self) -> Vec<TaskId> {
        let mut merged: BTreeSet<TaskId> = BTreeSet::new();
        while let Some(batch) = self.runs.pop_front() {
            merged.extend(batch);
        }

        let tasks: Vec<TaskId> = merged.into_iter().collect();
        if !tasks.is_empty() {
            debug!(drained = tasks.len(), "drained queued triggers into new run");
        }
        tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_mode_coalesces_triggers() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 1);
        q.record_trigger(TaskId::Js);
        q.record_trigger(TaskId::Scss);
        q.record_trigger(TaskId::Js);
        assert_eq!(q.drain_pending(), vec![TaskId::Scss, TaskId::Js]);
        assert!(q.is_empty());
    }

    #[test]
    fn cancel_mode_keeps_only_latest() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Cancel, 4);
        q.record_trigger(TaskId::Js);
        q.record_trigger(TaskId::Html);
        assert_eq!(q.drain_pending(), vec![TaskId::Html]);
    }

    #[test]
    fn zero_length_is_clamped() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 0);
        q.record_trigger(TaskId::Fonts);
        assert!(!q.is_empty());
        assert_eq!(q.behaviour(), TriggerWhileRunningBehaviour::Queue);
    }
}
