// tests/graph_validation.rs

use etldag::dag::{DependencyGraph, Task};
use etldag::errors::EtldagError;
use etldag_test_utils::fakes::ok_work;
use serde_json::json;

fn task(id: &str, deps: &[&str]) -> Task {
    let mut t = Task::new(id, ok_work(json!(null)));
    for dep in deps {
        t = t.after(*dep);
    }
    t
}

#[test]
fn duplicate_task_is_rejected() {
    let mut graph = DependencyGraph::new();
    graph.add_task(task("a", &[])).unwrap();

    let err = graph.add_task(task("a", &[])).unwrap_err();
    assert!(matches!(err, EtldagError::DuplicateTask(name) if name == "a"));
}

#[test]
fn dangling_dependency_fails_validation() {
    let mut graph = DependencyGraph::new();
    graph.add_task(task("a", &["ghost"])).unwrap();

    let err = graph.validate().unwrap_err();
    assert!(matches!(
        err,
        EtldagError::DanglingDependency { task, dep } if task == "a" && dep == "ghost"
    ));
}

#[test]
fn cycle_fails_validation() {
    let mut graph = DependencyGraph::new();
    graph.add_task(task("a", &["c"])).unwrap();
    graph.add_task(task("b", &["a"])).unwrap();
    graph.add_task(task("c", &["b"])).unwrap();

    let err = graph.validate().unwrap_err();
    assert!(matches!(err, EtldagError::DagCycle(_)));
}

#[test]
fn self_dependency_is_a_cycle() {
    let mut graph = DependencyGraph::new();
    graph.add_task(task("a", &["a"])).unwrap();

    let err = graph.validate().unwrap_err();
    assert!(matches!(err, EtldagError::DagCycle(_)));
}

#[test]
fn batches_follow_gate_fanout_fanin_shape() {
    let mut graph = DependencyGraph::new();
    graph.add_task(task("gate", &[])).unwrap();
    graph.add_task(task("extract_a", &["gate"])).unwrap();
    graph.add_task(task("extract_b", &["gate"])).unwrap();
    graph.add_task(task("transform_a", &["extract_a"])).unwrap();
    graph.add_task(task("transform_b", &["extract_b"])).unwrap();
    graph
        .add_task(task("load", &["transform_a", "transform_b"]))
        .unwrap();
    graph.validate().unwrap();

    let batches = graph.topological_batches();
    assert_eq!(
        batches,
        vec![
            vec!["gate".to_string()],
            vec!["extract_a".to_string(), "extract_b".to_string()],
            vec!["transform_a".to_string(), "transform_b".to_string()],
            vec!["load".to_string()],
        ]
    );
}

#[test]
fn batches_are_recomputed_identically_on_each_call() {
    let mut graph = DependencyGraph::new();
    graph.add_task(task("a", &[])).unwrap();
    graph.add_task(task("b", &["a"])).unwrap();
    graph.add_task(task("c", &["a"])).unwrap();

    assert_eq!(graph.topological_batches(), graph.topological_batches());
}
