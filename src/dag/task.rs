// src/dag/task.rs

//! A single task: identifier, dependencies, retry policy and unit of work.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::TaskError;
use crate::run::context::RunContext;
use crate::run::retry::RetryPolicy;

/// Canonical task identifier type, unique within one graph.
pub type TaskId = String;

/// Opaque payload handed from a task to its dependents.
pub type TaskValue = serde_json::Value;

/// Success values of a task's direct dependencies, keyed by dependency id.
///
/// Assembled by the runner from the result store; a task never performs an
/// ambient lookup by arbitrary identifier.
pub type TaskInputs = BTreeMap<TaskId, TaskValue>;

/// A task's unit of work, fixed at graph-construction time.
#[async_trait]
pub trait Work: Send + Sync {
    async fn execute(
        &self,
        ctx: &RunContext,
        inputs: &TaskInputs,
    ) -> Result<TaskValue, TaskError>;
}

/// Immutable description of one node in the dependency graph.
#[derive(Clone)]
pub struct Task {
    pub id: TaskId,
    /// Direct upstream task identifiers; all must succeed before this task
    /// may start.
    pub deps: Vec<TaskId>,
    pub retry: RetryPolicy,
    pub work: Arc<dyn Work>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, work: Arc<dyn Work>) -> Self {
        Self {
            id: id.into(),
            deps: Vec::new(),
            retry: RetryPolicy::default(),
            work,
        }
    }

    /// Add an upstream dependency.
    pub fn after(mut self, dep: impl Into<TaskId>) -> Self {
        self.deps.push(dep.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("deps", &self.deps)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
