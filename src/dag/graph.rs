// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::pipeline::Pipeline;
use crate::errors::{Result, SitepipeError};
use crate::types::TaskId;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Direct dependencies: tasks that must complete before this one can run.
    deps: Vec<TaskId>,
    /// Direct dependents: tasks that wait for this one.
    dependents: Vec<TaskId>,
}

/// In-memory task graph keyed by task id.
///
/// Built once per process from a [`Pipeline`]; acyclicity and uniqueness of
/// tasks are checked at construction.
#[derive(Debug, Clone)]
pub struct DagGraph {
    nodes: HashMap<TaskId, DagNode>,
    /// Task ids in a valid execution order.
    order: Vec<TaskId>,
}

impl DagGraph {
    pub fn from_pipeline(pipeline: &Pipeline) -> Result<Self> {
        let tasks = pipeline.tasks();
        let mut nodes: HashMap<TaskId, DagNode> = HashMap::new();

        for task in &tasks {
            if nodes.insert(*task, DagNode::default()).is_some() {
                return Err(SitepipeError::ConfigError(format!(
                    "task '{}' appears more than once in pipeline '{}'",
                    task,
                    pipeline.name()
                )));
            }
        }

        let edges = pipeline.edges();
        for (before, after) in &edges {
            if let Some(node) = nodes.get_mut(after) {
                node.deps.push(*before);
            }
            if let Some(node) = nodes.get_mut(before) {
                node.dependents.push(*after);
            }
        }

        let order = validate_dag(&tasks, &edges)?;

        Ok(Self { nodes, order })
    }

    /// Return all task ids in execution order.
    pub fn tasks(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.order.iter().copied()
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, task: TaskId) -> &[TaskId] {
        self.nodes
            .get(&task)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, task: TaskId) -> &[TaskId] {
        self.nodes
            .get(&task)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Tasks with no dependencies.
    pub fn roots(&self) -> Vec<TaskId> {
        self.tasks()
            .filter(|t| self.dependencies_of(*t).is_empty())
            .collect()
    }

    /// Whether `before` must (transitively) complete before `after` starts.
    pub fn precedes(&self, before: TaskId, after: TaskId) -> bool {
        let mut stack: Vec<TaskId> = self.dependencies_of(after).to_vec();
        let mut seen: Vec<TaskId> = Vec::new();

        while let Some(current) = stack.pop() {
            if current == before {
                return true;
            }
            if seen.contains(&current) {
                continue;
            }
            seen.push(current);
            stack.extend_from_slice(self.dependencies_of(current));
        }

        false
    }
}

/// Topologically sort the graph, failing on cycles.
///
/// Edge direction: dep -> task.
fn validate_dag(tasks: &[TaskId], edges: &[(TaskId, TaskId)]) -> Result<Vec<TaskId>> {
    let mut graph: DiGraphMap<TaskId, ()> = DiGraphMap::new();

    for task in tasks {
        graph.add_node(*task);
    }
    for (before, after) in edges {
        graph.add_edge(*before, *after, ());
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order),
        Err(cycle) => Err(SitepipeError::DagCycle(format!(
            "cycle detected in task graph involving task '{}'",
            cycle.node_id()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::pipeline::series;

    #[test]
    fn duplicate_tasks_are_rejected() {
        let p = Pipeline::new("dup", series([TaskId::Js, TaskId::Js]));
        assert!(matches!(
            DagGraph::from_pipeline(&p),
            Err(SitepipeError::ConfigError(_))
        ));
    }

    #[test]
    fn production_graph_has_clean_as_only_root() {
        let g = DagGraph::from_pipeline(&Pipeline::production()).unwrap();
        assert_eq!(g.roots(), vec![TaskId::Clean]);
        assert_eq!(g.dependencies_of(TaskId::Html), &[TaskId::Clean]);
        assert!(g.precedes(TaskId::Html, TaskId::Fonts));
        assert!(!g.precedes(TaskId::Js, TaskId::ScssMin));
    }

    #[test]
    fn execution_order_respects_edges() {
        let g = DagGraph::from_pipeline(&Pipeline::development()).unwrap();
        let order: Vec<TaskId> = g.tasks().collect();
        let pos = |t: TaskId| order.iter().position(|x| *x == t).unwrap();
        assert_eq!(order[0], TaskId::Clean);
        assert!(pos(TaskId::Html) < pos(TaskId::Scss));
        assert!(pos(TaskId::Others) < pos(TaskId::Serve));
    }
}
