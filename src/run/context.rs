// src/run/context.rs

//! Per-run execution state.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::dag::result_store::ResultStore;

/// State exclusively owned by one run of the graph.
///
/// Created when a scheduled tick fires and discarded once the run reaches a
/// terminal state; nothing in here is shared across runs.
#[derive(Debug)]
pub struct RunContext {
    run_id: u64,
    /// Logical timestamp of the run (the tick it was scheduled for), not the
    /// wall clock at which tasks happen to execute.
    logical_date: DateTime<Utc>,
    results: ResultStore,
    cancel: CancellationToken,
}

impl RunContext {
    pub fn new(run_id: u64, logical_date: DateTime<Utc>) -> Self {
        Self::with_cancellation(run_id, logical_date, CancellationToken::new())
    }

    pub fn with_cancellation(
        run_id: u64,
        logical_date: DateTime<Utc>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            run_id,
            logical_date,
            results: ResultStore::new(),
            cancel,
        }
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn logical_date(&self) -> DateTime<Utc> {
        self.logical_date
    }

    pub fn results(&self) -> &ResultStore {
        &self.results
    }

    /// Whether an operator-triggered abort has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}
