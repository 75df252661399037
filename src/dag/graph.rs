// src/dag/graph.rs

//! Static definition of tasks and their directed edges.

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::task::{Task, TaskId};
use crate::errors::{EtldagError, Result};

/// Immutable DAG of tasks, built once at startup and shared read-only across
/// runs.
///
/// Insertion order is preserved so batch contents and dry-run output are
/// stable across invocations.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    tasks: HashMap<TaskId, Task>,
    order: Vec<TaskId>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task to the graph.
    ///
    /// Fails if a task with the same identifier already exists.
    pub fn add_task(&mut self, task: Task) -> Result<()> {
        if self.tasks.contains_key(&task.id) {
            return Err(EtldagError::DuplicateTask(task.id.clone()));
        }
        self.order.push(task.id.clone());
        self.tasks.insert(task.id.clone(), task);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Task identifiers in insertion order.
    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    /// Direct dependencies of a task.
    pub fn dependencies_of(&self, id: &str) -> &[TaskId] {
        self.tasks.get(id).map(|t| t.deps.as_slice()).unwrap_or(&[])
    }

    /// Check that every referenced dependency exists and that the edges form
    /// no cycle.
    pub fn validate(&self) -> Result<()> {
        for id in &self.order {
            for dep in self.dependencies_of(id) {
                if !self.tasks.contains_key(dep) {
                    return Err(EtldagError::DanglingDependency {
                        task: id.clone(),
                        dep: dep.clone(),
                    });
                }
            }
        }

        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for id in &self.order {
            graph.add_node(id.as_str());
            for dep in self.dependencies_of(id) {
                graph.add_edge(dep.as_str(), id.as_str(), ());
            }
        }

        toposort(&graph, None)
            .map_err(|cycle| EtldagError::DagCycle(cycle.node_id().to_string()))?;

        Ok(())
    }

    /// Partition the tasks into topological batches.
    ///
    /// Each batch contains every task whose dependencies lie entirely in
    /// earlier batches, so all tasks within one batch may run concurrently
    /// and a batch may not start before the previous one fully resolved.
    /// Recomputed from the immutable graph on every call.
    ///
    /// On a cyclic graph this stops early rather than looping; `validate()`
    /// is the operation that reports cycles as errors.
    pub fn topological_batches(&self) -> Vec<Vec<TaskId>> {
        let mut placed: HashSet<TaskId> = HashSet::new();
        let mut batches: Vec<Vec<TaskId>> = Vec::new();

        while placed.len() < self.order.len() {
            let batch: Vec<TaskId> = self
                .order
                .iter()
                .filter(|id| {
                    !placed.contains(id.as_str())
                        && self
                            .dependencies_of(id)
                            .iter()
                            .all(|dep| placed.contains(dep.as_str()))
                })
                .cloned()
                .collect();

            if batch.is_empty() {
                break;
            }

            placed.extend(batch.iter().cloned());
            batches.push(batch);
        }

        batches
    }
}
