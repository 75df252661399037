// src/run/retry.rs

//! Bounded-retry execution of a single task's unit of work.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::dag::task::{Task, TaskInputs, TaskValue};
use crate::errors::TaskError;
use crate::run::context::RunContext;

/// Maximum attempt count and fixed inter-attempt delay for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least 1; a task always gets one
    /// attempt.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Single attempt, no delay. Used for tasks that bound their own wait,
    /// like the readiness gate.
    pub fn no_retries() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }
}

/// Result of driving one task through its retry policy.
#[derive(Debug)]
pub struct AttemptOutcome {
    pub result: Result<TaskValue, TaskError>,
    /// How many times the unit of work was actually invoked.
    pub attempts: u32,
}

/// Invoke the task's work, retrying retryable failures with the policy's
/// fixed delay, up to `max_attempts` invocations total.
///
/// The delay is an async sleep, so waiting never blocks sibling tasks.
/// Non-retryable errors surface immediately without consuming the remaining
/// budget. If the run is cancelled, the current attempt's failure is
/// surfaced as-is and no further attempt starts.
pub async fn execute_with_retry(
    task: &Task,
    ctx: &RunContext,
    inputs: &TaskInputs,
) -> AttemptOutcome {
    let policy = task.retry;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        debug!(
            task = %task.id,
            run_id = ctx.run_id(),
            attempt,
            max_attempts = policy.max_attempts,
            "invoking task work"
        );

        let err = match task.work.execute(ctx, inputs).await {
            Ok(value) => {
                return AttemptOutcome {
                    result: Ok(value),
                    attempts: attempt,
                };
            }
            Err(err) => err,
        };

        if !err.is_retryable() {
            warn!(
                task = %task.id,
                run_id = ctx.run_id(),
                attempt,
                error = %err,
                "non-retryable failure; surfacing immediately"
            );
            return AttemptOutcome {
                result: Err(err),
                attempts: attempt,
            };
        }

        if attempt >= policy.max_attempts {
            warn!(
                task = %task.id,
                run_id = ctx.run_id(),
                attempt,
                error = %err,
                "retry budget exhausted"
            );
            return AttemptOutcome {
                result: Err(err),
                attempts: attempt,
            };
        }

        if ctx.is_cancelled() {
            warn!(
                task = %task.id,
                run_id = ctx.run_id(),
                attempt,
                error = %err,
                "run cancelled; not retrying"
            );
            return AttemptOutcome {
                result: Err(err),
                attempts: attempt,
            };
        }

        debug!(
            task = %task.id,
            run_id = ctx.run_id(),
            attempt,
            delay_secs = policy.delay.as_secs(),
            "attempt failed; retrying after delay"
        );
        sleep(policy.delay).await;
    }
}
