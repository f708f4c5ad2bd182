// src/dag/pipeline.rs

//! Series/parallel composition of tasks.
//!
//! A [`Pipeline`] is declared as a tree of [`Step`]s and then flattened into
//! "must-complete-before" edges for [`crate::dag::DagGraph`]:
//!
//! - `Series([a, b])` adds an edge from every exit of `a` to every entry of `b`.
//! - `Parallel([a, b])` adds no edges between `a` and `b`; the group's entries
//!   and exits are the union of its members'.

use crate::types::TaskId;

/// One node of a pipeline declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Task(TaskId),
    Series(Vec<Step>),
    Parallel(Vec<Step>),
}

impl From<TaskId> for Step {
    fn from(id: TaskId) -> Self {
        Step::Task(id)
    }
}

/// Run the given steps one after another.
pub fn series<I, S>(steps: I) -> Step
where
    I: IntoIterator<Item = S>,
    S: Into<Step>,
{
    Step::Series(steps.into_iter().map(Into::into).collect())
}

/// Run the given steps concurrently; the group completes when all do.
pub fn parallel<I, S>(steps: I) -> Step
where
    I: IntoIterator<Item = S>,
    S: Into<Step>,
{
    Step::Parallel(steps.into_iter().map(Into::into).collect())
}

/// A named, fully static composition of tasks.
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: &'static str,
    root: Step,
}

impl Pipeline {
    pub fn new(name: &'static str, root: Step) -> Self {
        Self { name, root }
    }

    /// `clean → html → {scss-min, js} → {images, vendor, fonts, others}`.
    pub fn production() -> Self {
        Self::new(
            "build",
            series([
                Step::Task(TaskId::Clean),
                Step::Task(TaskId::Html),
                parallel([TaskId::ScssMin, TaskId::Js]),
                parallel([TaskId::Images, TaskId::Vendor, TaskId::Fonts, TaskId::Others]),
            ]),
        )
    }

    /// Same shape as [`Pipeline::production`] with expanded stylesheets, then
    /// `{watch, serve}`.
    pub fn development() -> Self {
        Self::new(
            "dev",
            series([
                Step::Task(TaskId::Clean),
                Step::Task(TaskId::Html),
                parallel([TaskId::Scss, TaskId::Js]),
                parallel([TaskId::Images, TaskId::Vendor, TaskId::Fonts, TaskId::Others]),
                parallel([TaskId::Watch, TaskId::Serve]),
            ]),
        )
    }

    /// A pipeline consisting of a single task.
    pub fn single(task: TaskId) -> Self {
        Self::new(task.as_str(), Step::Task(task))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn root(&self) -> &Step {
        &self.root
    }

    /// Whether the pipeline contains tasks that never complete, in which case
    /// the process keeps running after the first pass.
    pub fn is_long_lived(&self) -> bool {
        self.tasks().iter().any(|t| t.is_long_lived())
    }

    /// All tasks, in declaration order.
    pub fn tasks(&self) -> Vec<TaskId> {
        let mut out = Vec::new();
        collect_tasks(&self.root, &mut out);
        out
    }

    /// Flatten the composition into `(before, after)` edges.
    pub fn edges(&self) -> Vec<(TaskId, TaskId)> {
        let mut edges = Vec::new();
        compile(&self.root, &mut edges);
        edges
    }
}

fn collect_tasks(step: &Step, out: &mut Vec<TaskId>) {
    match step {
        Step::Task(id) => out.push(*id),
        Step::Series(steps) | Step::Parallel(steps) => {
            for s in steps {
                collect_tasks(s, out);
            }
        }
    }
}

/// Returns the step's `(entries, exits)`.
fn compile(step: &Step, edges: &mut Vec<(TaskId, TaskId)>) -> (Vec<TaskId>, Vec<TaskId>) {
    match step {
        Step::Task(id) => (vec![*id], vec![*id]),
        Step::Parallel(steps) => {
            let mut entries = Vec::new();
            let mut exits = Vec::new();
            for s in steps {
                let (en, ex) = compile(s, edges);
                entries.extend(en);
                exits.extend(ex);
            }
            (entries, exits)
        }
        Step::Series(steps) => {
            let mut entries: Option<Vec<TaskId>> = None;
            let mut prev_exits: Vec<TaskId> = Vec::new();

            for s in steps {
                let (en, ex) = compile(s, edges);
                if en.is_empty() {
                    // Empty groups neither block nor get blocked.
                    continue;
                }
                for before in &prev_exits {
                    for after in &en {
                        edges.push((*before, *after));
                    }
                }
                if entries.is_none() {
                    entries = Some(en);
                }
                prev_exits = ex;
            }

            (entries.unwrap_or_default(), prev_exits)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_of_parallels_links_every_exit_to_every_entry() {
        let p = Pipeline::new(
            "t",
            series([parallel([TaskId::Scss, TaskId::Js]), parallel([TaskId::Images, TaskId::Fonts])]),
        );
        let mut edges = p.edges();
        edges.sort();
        assert_eq!(
            edges,
            vec![
                (TaskId::Scss, TaskId::Images),
                (TaskId::Scss, TaskId::Fonts),
                (TaskId::Js, TaskId::Images),
                (TaskId::Js, TaskId::Fonts),
            ]
        );
    }

    #[test]
    fn empty_groups_are_transparent() {
        let p = Pipeline::new(
            "t",
            series([
                Step::Task(TaskId::Clean),
                Step::Parallel(Vec::new()),
                Step::Task(TaskId::Html),
            ]),
        );
        assert_eq!(p.edges(), vec![(TaskId::Clean, TaskId::Html)]);
    }

    #[test]
    fn only_development_is_long_lived() {
        assert!(Pipeline::development().is_long_lived());
        assert!(!Pipeline::production().is_long_lived());
        assert!(!Pipeline::single(TaskId::Js).is_long_lived());
    }

    #[test]
    fn production_uses_minified_styles_and_development_expanded() {
        assert!(Pipeline::production().tasks().contains(&TaskId::ScssMin));
        assert!(!Pipeline::production().tasks().contains(&TaskId::Scss));
        assert!(Pipeline::development().tasks().contains(&TaskId::Scss));
        assert!(!Pipeline::development().tasks().contains(&TaskId::ScssMin));
    }
}
