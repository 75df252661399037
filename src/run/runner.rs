// src/run/runner.rs

//! Batch-by-batch execution of a dependency graph.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::dag::graph::DependencyGraph;
use crate::dag::result_store::TaskResult;
use crate::dag::task::{Task, TaskId, TaskInputs};
use crate::errors::TaskError;
use crate::run::context::RunContext;
use crate::run::retry::execute_with_retry;

/// Final outcome of one run.
///
/// A failed run carries the complete set of failed tasks with their
/// root-cause errors, not just the first failure, so an operator can see
/// every affected source in one place.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Success {
        run_id: u64,
    },
    Failed {
        run_id: u64,
        failures: BTreeMap<TaskId, TaskError>,
    },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success { .. })
    }

    pub fn run_id(&self) -> u64 {
        match self {
            RunOutcome::Success { run_id } | RunOutcome::Failed { run_id, .. } => *run_id,
        }
    }
}

/// Executes a [`DependencyGraph`] for one run at a time.
///
/// The graph is immutable and shared; all mutable state lives in the
/// [`RunContext`] handed to [`Runner::run`].
#[derive(Debug)]
pub struct Runner {
    graph: Arc<DependencyGraph>,
}

impl Runner {
    pub fn new(graph: Arc<DependencyGraph>) -> Self {
        Self { graph }
    }

    /// Execute every task of the graph, batch by batch.
    ///
    /// Within a batch all runnable tasks execute concurrently, each wrapped
    /// by its retry policy; the next batch starts only once the whole batch
    /// is terminal. A task whose dependency failed is short-circuited to
    /// Failed without running and without consuming retry budget. If the
    /// run's cancellation signal is set, tasks in not-yet-started batches
    /// are recorded as cancelled instead of launched.
    pub async fn run(&self, ctx: RunContext) -> RunOutcome {
        let ctx = Arc::new(ctx);
        let batches = self.graph.topological_batches();

        info!(
            run_id = ctx.run_id(),
            logical_date = %ctx.logical_date(),
            tasks = self.graph.len(),
            batches = batches.len(),
            "starting run"
        );

        for batch in batches {
            if ctx.is_cancelled() {
                for id in &batch {
                    ctx.results().publish(
                        id,
                        TaskResult::Failed {
                            error: TaskError::Cancelled,
                            attempts: 0,
                        },
                    );
                }
                continue;
            }

            self.run_batch(&ctx, batch).await;
        }

        let failures = ctx.results().failures();
        if failures.is_empty() {
            info!(run_id = ctx.run_id(), "run completed successfully");
            RunOutcome::Success {
                run_id: ctx.run_id(),
            }
        } else {
            warn!(
                run_id = ctx.run_id(),
                failed = failures.len(),
                "run finished with failures"
            );
            RunOutcome::Failed {
                run_id: ctx.run_id(),
                failures,
            }
        }
    }

    async fn run_batch(&self, ctx: &Arc<RunContext>, batch: Vec<TaskId>) {
        let mut join_set: JoinSet<(TaskId, TaskResult)> = JoinSet::new();

        for id in &batch {
            let Some(task) = self.graph.task(id) else {
                // Cannot happen on a validated graph.
                warn!(task = %id, "batch references unknown task; skipping");
                continue;
            };

            match collect_inputs(ctx, task) {
                Ok(inputs) => {
                    ctx.results().mark_pending(id);
                    let task = task.clone();
                    let ctx = Arc::clone(ctx);
                    join_set.spawn(async move {
                        let outcome = execute_with_retry(&task, &ctx, &inputs).await;
                        let result = match outcome.result {
                            Ok(value) => TaskResult::Success(value),
                            Err(error) => TaskResult::Failed {
                                error,
                                attempts: outcome.attempts,
                            },
                        };
                        (task.id, result)
                    });
                }
                Err(dep) => {
                    debug!(
                        task = %id,
                        run_id = ctx.run_id(),
                        dep = %dep,
                        "upstream failed; short-circuiting"
                    );
                    ctx.results().publish(
                        id,
                        TaskResult::Failed {
                            error: TaskError::DependencyFailed { dep },
                            attempts: 0,
                        },
                    );
                }
            }
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((id, result)) => {
                    match &result {
                        TaskResult::Success(_) => {
                            info!(task = %id, run_id = ctx.run_id(), "task succeeded")
                        }
                        TaskResult::Failed { error, attempts } => {
                            warn!(
                                task = %id,
                                run_id = ctx.run_id(),
                                attempts,
                                error = %error,
                                "task failed"
                            )
                        }
                        TaskResult::Pending => {}
                    }
                    ctx.results().publish(&id, result);
                }
                Err(join_err) => {
                    warn!(
                        run_id = ctx.run_id(),
                        error = %join_err,
                        "task aborted before reporting a result"
                    );
                }
            }
        }

        // A panicked task leaves its entry Pending; record it as failed so
        // the batch stays terminal and dependents short-circuit.
        for id in &batch {
            if let Some(result) = ctx.results().get(id)
                && !result.is_terminal()
            {
                ctx.results().publish(
                    id,
                    TaskResult::Failed {
                        error: TaskError::Internal("task stopped without a result".to_string()),
                        attempts: 0,
                    },
                );
            }
        }
    }
}

/// Gather the Success values of a task's direct dependencies.
///
/// Returns the identifier of the first non-successful dependency instead,
/// which becomes the short-circuit reason.
fn collect_inputs(ctx: &RunContext, task: &Task) -> Result<TaskInputs, TaskId> {
    let mut inputs = TaskInputs::new();
    for dep in &task.deps {
        match ctx.results().success_value(dep) {
            Some(value) => {
                inputs.insert(dep.clone(), value);
            }
            None => return Err(dep.clone()),
        }
    }
    Ok(inputs)
}
