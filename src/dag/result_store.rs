// src/dag/result_store.rs

//! Per-run store of task results.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use tracing::warn;

use crate::dag::task::{TaskId, TaskValue};
use crate::errors::TaskError;

/// Result of one task within one run.
///
/// A task's entry moves `Pending -> terminal` exactly once; retries happen
/// inside a single `Pending` window and never re-open a terminal state.
#[derive(Debug, Clone)]
pub enum TaskResult {
    Pending,
    Success(TaskValue),
    Failed { error: TaskError, attempts: u32 },
}

impl TaskResult {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskResult::Pending)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskResult::Success(_))
    }
}

/// In-memory map from task identifier to its latest result, scoped to one
/// run.
///
/// Writes are single-writer-per-key: the runner publishes each task's result
/// exactly once, so the mutex only guards the atomic publish itself.
#[derive(Debug, Default)]
pub struct ResultStore {
    results: Mutex<HashMap<TaskId, TaskResult>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TaskId, TaskResult>> {
        match self.results.lock() {
            Ok(guard) => guard,
            // A poisoned lock means a publish panicked; the map itself is
            // still a valid snapshot of everything published before.
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Record that a task has been dispatched for this run.
    pub fn mark_pending(&self, id: &str) {
        self.lock().insert(id.to_string(), TaskResult::Pending);
    }

    /// Publish a task's terminal result.
    pub fn publish(&self, id: &str, result: TaskResult) {
        let mut results = self.lock();
        if let Some(existing) = results.get(id)
            && existing.is_terminal()
        {
            warn!(task = %id, "result already terminal; ignoring second publish");
            return;
        }
        results.insert(id.to_string(), result);
    }

    pub fn get(&self, id: &str) -> Option<TaskResult> {
        self.lock().get(id).cloned()
    }

    /// The Success value of a task, if it reached Success.
    pub fn success_value(&self, id: &str) -> Option<TaskValue> {
        match self.lock().get(id) {
            Some(TaskResult::Success(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// All tasks with a Failed terminal state, with their root-cause errors.
    pub fn failures(&self) -> BTreeMap<TaskId, TaskError> {
        self.lock()
            .iter()
            .filter_map(|(id, result)| match result {
                TaskResult::Failed { error, .. } => Some((id.clone(), error.clone())),
                _ => None,
            })
            .collect()
    }

    /// Number of recorded results (any state).
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
