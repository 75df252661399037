// src/errors.rs

//! Crate-wide error types and the per-task error taxonomy.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtldagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Duplicate task in DAG: {0}")]
    DuplicateTask(String),

    #[error("Cycle detected in DAG involving task: {0}")]
    DagCycle(String),

    #[error("Task '{task}' depends on unknown task '{dep}'")]
    DanglingDependency { task: String, dep: String },

    #[error("Run {run_id} finished with {failed} failed task(s)")]
    RunFailed { run_id: u64, failed: usize },

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, EtldagError>;

/// Terminal error of a single task attempt.
///
/// The retry executor consults [`TaskError::is_retryable`] to decide whether
/// a failed attempt consumes retry budget or surfaces immediately:
///
/// - `Extraction` and `SinkWrite` are transient faults and are retried.
/// - `Schema` means the upstream payload broke its contract; re-running with
///   the same payload cannot help.
/// - `GateTimeout` bounds its own wait internally, so the gate task runs a
///   single attempt.
/// - `DependencyFailed` and `Cancelled` are synthetic: the runner records
///   them without ever invoking the task's work.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskError {
    #[error("readiness gate not ready within {timeout_secs}s")]
    GateTimeout { timeout_secs: u64 },

    #[error("extraction failed with status {status}: {message}")]
    Extraction { status: u16, message: String },

    #[error("schema violation: {0}")]
    Schema(String),

    #[error("sink write failed: {0}")]
    SinkWrite(String),

    #[error("dependency '{dep}' failed")]
    DependencyFailed { dep: String },

    #[error("run cancelled before the task started")]
    Cancelled,

    #[error("internal task failure: {0}")]
    Internal(String),
}

impl TaskError {
    /// Whether a failed attempt with this error may consume retry budget.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskError::Extraction { .. } | TaskError::SinkWrite(_))
    }
}
