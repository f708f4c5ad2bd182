// tests/scheduler_properties.rs

use std::collections::BTreeSet;

use proptest::prelude::*;
use sitepipe::dag::{DagGraph, Pipeline, Scheduler, TaskRunState, TriggerScope};
use sitepipe::engine::TaskOutcome;
use sitepipe::types::TaskId;

fn pipelines() -> impl Strategy<Value = Pipeline> {
    prop_oneof![
        Just(Pipeline::production()),
        Just(Pipeline::development()),
        proptest::sample::select(vec![
            TaskId::Clean,
            TaskId::Html,
            TaskId::Scss,
            TaskId::ScssMin,
            TaskId::Js,
            TaskId::Images,
            TaskId::Vendor,
            TaskId::Fonts,
            TaskId::Others,
        ])
        .prop_map(Pipeline::single),
    ]
}

proptest! {
    /// Whatever each task reports, a run always ends, and no task starts
    /// before everything it depends on has finished.
    #[test]
    fn runs_terminate_and_respect_dependencies(
        pipeline in pipelines(),
        failing in proptest::collection::btree_set(0..11usize, 0..3),
    ) {
        let graph = DagGraph::from_pipeline(&pipeline).unwrap();
        let failing: BTreeSet<TaskId> = failing.into_iter().map(|i| TaskId::ALL[i]).collect();
        let mut scheduler = Scheduler::new(graph.clone());

        let mut ready = Vec::new();
        for root in graph.roots() {
            ready.extend(scheduler.handle_trigger(root, TriggerScope::WithDependents));
        }

        let mut finished: BTreeSet<TaskId> = BTreeSet::new();
        let mut steps = 0;
        while let Some(task) = ready.pop() {
            steps += 1;
            prop_assert!(steps <= 64, "scheduler did not converge");

            for dep in graph.dependencies_of(task.id) {
                prop_assert!(finished.contains(dep), "{} started before {}", task.id, dep);
            }

            let next = if task.long_lived {
                scheduler.handle_progress(task.id)
            } else if failing.contains(&task.id) {
                scheduler.handle_completion(task.id, &TaskOutcome::Failed("boom".into()))
            } else {
                scheduler.handle_completion(task.id, &TaskOutcome::Success)
            };
            finished.insert(task.id);
            ready.extend(next);
        }

        prop_assert!(scheduler.is_idle());
        for task in graph.tasks() {
            prop_assert!(!matches!(
                scheduler.run_state_of(task),
                Some(TaskRunState::Pending | TaskRunState::Running)
            ));
        }
    }
}
