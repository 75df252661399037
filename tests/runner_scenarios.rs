// tests/runner_scenarios.rs

//! End-to-end runner behaviour on the gate -> fan-out -> fan-in shape.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use etldag::dag::{DependencyGraph, Task};
use etldag::errors::TaskError;
use etldag::run::{RetryPolicy, RunContext, RunOutcome, Runner};
use etldag_test_utils::fakes::{fn_work, ok_work};
use etldag_test_utils::init_tracing;
use serde_json::json;

fn quick_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::from_secs(1))
}

#[tokio::test(start_paused = true)]
async fn failed_branch_short_circuits_dependents_and_fan_in() {
    init_tracing();

    let extract_b_calls = Arc::new(AtomicU32::new(0));
    let transform_b_calls = Arc::new(AtomicU32::new(0));
    let load_calls = Arc::new(AtomicU32::new(0));

    let mut graph = DependencyGraph::new();
    graph
        .add_task(
            Task::new("gate", ok_work(json!({ "ready": true })))
                .with_retry(RetryPolicy::no_retries()),
        )
        .unwrap();
    graph
        .add_task(
            Task::new("extract_a", ok_work(json!({ "v": 1 })))
                .after("gate")
                .with_retry(quick_retry(3)),
        )
        .unwrap();
    {
        let calls = Arc::clone(&extract_b_calls);
        graph
            .add_task(
                Task::new(
                    "extract_b",
                    fn_work(move |_, _| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err(TaskError::Extraction {
                            status: 500,
                            message: "upstream down".to_string(),
                        })
                    }),
                )
                .after("gate")
                .with_retry(quick_retry(3)),
            )
            .unwrap();
    }
    graph
        .add_task(
            Task::new(
                "transform_a",
                fn_work(|_, inputs| Ok(inputs.get("extract_a").cloned().unwrap_or(json!(null)))),
            )
            .after("extract_a")
            .with_retry(quick_retry(3)),
        )
        .unwrap();
    {
        let calls = Arc::clone(&transform_b_calls);
        graph
            .add_task(
                Task::new(
                    "transform_b",
                    fn_work(move |_, _| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(json!(null))
                    }),
                )
                .after("extract_b")
                .with_retry(quick_retry(3)),
            )
            .unwrap();
    }
    {
        let calls = Arc::clone(&load_calls);
        graph
            .add_task(
                Task::new(
                    "load",
                    fn_work(move |_, _| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(json!(null))
                    }),
                )
                .after("transform_a")
                .after("transform_b")
                .with_retry(quick_retry(3)),
            )
            .unwrap();
    }
    graph.validate().unwrap();

    let runner = Runner::new(Arc::new(graph));
    let outcome = runner.run(RunContext::new(1, Utc::now())).await;

    let RunOutcome::Failed { failures, .. } = outcome else {
        panic!("expected a failed run");
    };

    let failed: Vec<&str> = failures.keys().map(|s| s.as_str()).collect();
    assert_eq!(failed, vec!["extract_b", "load", "transform_b"]);
    assert!(matches!(
        failures.get("extract_b"),
        Some(TaskError::Extraction { status: 500, .. })
    ));
    assert!(matches!(
        failures.get("transform_b"),
        Some(TaskError::DependencyFailed { dep }) if dep == "extract_b"
    ));
    assert!(matches!(
        failures.get("load"),
        Some(TaskError::DependencyFailed { .. })
    ));

    assert_eq!(extract_b_calls.load(Ordering::SeqCst), 3);
    assert_eq!(transform_b_calls.load(Ordering::SeqCst), 0);
    assert_eq!(load_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn all_branches_succeed_and_fan_in_runs_once_after_them() {
    init_tracing();

    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let log = |name: &'static str, events: &Arc<Mutex<Vec<String>>>| {
        let events = Arc::clone(events);
        fn_work(move |_, _| {
            events.lock().unwrap().push(name.to_string());
            Ok(json!(name))
        })
    };

    let mut graph = DependencyGraph::new();
    graph
        .add_task(Task::new("gate", log("gate", &events)))
        .unwrap();
    graph
        .add_task(Task::new("extract_a", log("extract_a", &events)).after("gate"))
        .unwrap();
    graph
        .add_task(Task::new("extract_b", log("extract_b", &events)).after("gate"))
        .unwrap();
    graph
        .add_task(Task::new("transform_a", log("transform_a", &events)).after("extract_a"))
        .unwrap();
    graph
        .add_task(Task::new("transform_b", log("transform_b", &events)).after("extract_b"))
        .unwrap();
    graph
        .add_task(
            Task::new("load", log("load", &events))
                .after("transform_a")
                .after("transform_b"),
        )
        .unwrap();
    graph.validate().unwrap();

    let runner = Runner::new(Arc::new(graph));
    let outcome = runner.run(RunContext::new(7, Utc::now())).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.run_id(), 7);

    let events = events.lock().unwrap().clone();
    assert_eq!(events.len(), 6, "every task ran exactly once: {events:?}");
    assert_eq!(events.first().map(String::as_str), Some("gate"));
    assert_eq!(events.last().map(String::as_str), Some("load"));

    let load_pos = events.iter().position(|e| e == "load").unwrap();
    for task in ["transform_a", "transform_b"] {
        let pos = events.iter().position(|e| e == task).unwrap();
        assert!(pos < load_pos, "{task} must finish before load");
    }
}

#[tokio::test]
async fn tasks_receive_only_their_declared_dependency_values() {
    init_tracing();

    let observed: Arc<Mutex<Option<(usize, Option<serde_json::Value>)>>> =
        Arc::new(Mutex::new(None));

    let mut graph = DependencyGraph::new();
    graph
        .add_task(Task::new("a", ok_work(json!(42))))
        .unwrap();
    graph.add_task(Task::new("b", ok_work(json!("ignored")))).unwrap();
    {
        let observed = Arc::clone(&observed);
        graph
            .add_task(
                Task::new(
                    "c",
                    fn_work(move |_, inputs| {
                        *observed.lock().unwrap() =
                            Some((inputs.len(), inputs.get("a").cloned()));
                        Ok(json!(null))
                    }),
                )
                .after("a"),
            )
            .unwrap();
    }
    graph.validate().unwrap();

    let runner = Runner::new(Arc::new(graph));
    let outcome = runner.run(RunContext::new(1, Utc::now())).await;
    assert!(outcome.is_success());

    // "c" sees exactly its declared dependency "a", never the unrelated "b".
    let observed = observed.lock().unwrap().clone();
    assert_eq!(observed, Some((1, Some(json!(42)))));
}
