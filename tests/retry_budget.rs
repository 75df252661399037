// tests/retry_budget.rs

//! Retry ceiling and delay behaviour, observed under tokio's paused clock.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use etldag::dag::{DependencyGraph, Task};
use etldag::errors::TaskError;
use etldag::run::{RetryPolicy, RunContext, RunOutcome, Runner};
use etldag_test_utils::fakes::fn_work;
use etldag_test_utils::init_tracing;
use serde_json::json;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn always_failing_work_runs_exactly_max_attempts_with_fixed_delay() {
    init_tracing();

    let instants: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));

    let mut graph = DependencyGraph::new();
    {
        let instants = Arc::clone(&instants);
        graph
            .add_task(
                Task::new(
                    "flaky",
                    fn_work(move |_, _| {
                        instants.lock().unwrap().push(Instant::now());
                        Err(TaskError::Extraction {
                            status: 503,
                            message: "still down".to_string(),
                        })
                    }),
                )
                .with_retry(RetryPolicy::new(3, Duration::from_secs(60))),
            )
            .unwrap();
    }
    graph.validate().unwrap();

    let runner = Runner::new(Arc::new(graph));
    let outcome = runner.run(RunContext::new(1, Utc::now())).await;
    assert!(!outcome.is_success());

    let instants = instants.lock().unwrap().clone();
    assert_eq!(instants.len(), 3, "work must run exactly max_attempts times");
    assert_eq!(instants[1] - instants[0], Duration::from_secs(60));
    assert_eq!(instants[2] - instants[1], Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn non_retryable_error_consumes_no_retry_budget() {
    init_tracing();

    let calls = Arc::new(AtomicU32::new(0));

    let mut graph = DependencyGraph::new();
    {
        let calls = Arc::clone(&calls);
        graph
            .add_task(
                Task::new(
                    "broken_contract",
                    fn_work(move |_, _| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err(TaskError::Schema("field 'main' missing".to_string()))
                    }),
                )
                .with_retry(RetryPolicy::new(3, Duration::from_secs(60))),
            )
            .unwrap();
    }
    graph.validate().unwrap();

    let runner = Runner::new(Arc::new(graph));
    let outcome = runner.run(RunContext::new(1, Utc::now())).await;

    let RunOutcome::Failed { failures, .. } = outcome else {
        panic!("expected a failed run");
    };
    assert!(matches!(
        failures.get("broken_contract"),
        Some(TaskError::Schema(_))
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_recover_within_budget() {
    init_tracing();

    let calls = Arc::new(AtomicU32::new(0));

    let mut graph = DependencyGraph::new();
    {
        let calls = Arc::clone(&calls);
        graph
            .add_task(
                Task::new(
                    "eventually_up",
                    fn_work(move |_, _| {
                        if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                            Err(TaskError::Extraction {
                                status: 503,
                                message: "warming up".to_string(),
                            })
                        } else {
                            Ok(json!({ "ok": true }))
                        }
                    }),
                )
                .with_retry(RetryPolicy::new(3, Duration::from_secs(60))),
            )
            .unwrap();
    }
    graph.validate().unwrap();

    let runner = Runner::new(Arc::new(graph));
    let outcome = runner.run(RunContext::new(1, Utc::now())).await;

    assert!(outcome.is_success());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}
