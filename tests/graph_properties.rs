// tests/graph_properties.rs

use std::collections::{HashMap, HashSet};

use etldag::dag::{DependencyGraph, Task};
use etldag_test_utils::fakes::ok_work;
use proptest::prelude::*;
use serde_json::json;

// Strategy for an arbitrary acyclic dependency structure: task N may only
// depend on tasks 0..N-1, which rules out cycles by construction.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
    })
}

proptest! {
    #[test]
    fn every_task_lands_in_exactly_one_batch_after_its_deps(raw_deps in dag_strategy(12)) {
        let num_tasks = raw_deps.len();
        let mut graph = DependencyGraph::new();

        for (i, potential_deps) in raw_deps.iter().enumerate() {
            // Sanitize dependencies: only allow deps < i.
            let mut deps: HashSet<usize> = HashSet::new();
            for dep in potential_deps {
                if i > 0 {
                    deps.insert(dep % i);
                }
            }

            let mut task = Task::new(format!("task_{i}"), ok_work(json!(null)));
            for dep in deps {
                task = task.after(format!("task_{dep}"));
            }
            graph.add_task(task).unwrap();
        }

        prop_assert!(graph.validate().is_ok());

        let batches = graph.topological_batches();
        let mut batch_of: HashMap<String, usize> = HashMap::new();

        for (index, batch) in batches.iter().enumerate() {
            for id in batch {
                prop_assert!(
                    batch_of.insert(id.clone(), index).is_none(),
                    "task {} appears in more than one batch",
                    id
                );
            }
        }

        prop_assert_eq!(batch_of.len(), num_tasks, "not every task was batched");

        for id in graph.task_ids() {
            for dep in graph.dependencies_of(id) {
                prop_assert!(
                    batch_of[dep.as_str()] < batch_of[id],
                    "task {} scheduled no later than its dependency {}",
                    id,
                    dep
                );
            }
        }
    }
}
