// src/etl/branch.rs

//! Graph construction: one gate, one branch template per source, one load.
//!
//! Every extract/transform pair is instantiated from the same template,
//! parametrized by the configured source; the load task's dependency set is
//! the full set of transform tasks, which makes it the fan-in barrier.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use crate::config::model::{ConfigFile, SourceSpec};
use crate::dag::graph::DependencyGraph;
use crate::dag::task::{Task, TaskId, TaskInputs, TaskValue, Work};
use crate::errors::{Result, TaskError};
use crate::etl::{Extractor, ReadinessGate, Sink, Transformer};
use crate::run::context::RunContext;
use crate::run::retry::RetryPolicy;

pub const GATE_TASK_ID: &str = "check_api_ready";
pub const LOAD_TASK_ID: &str = "load_to_storage";

pub fn extract_task_id(source: &str) -> TaskId {
    format!("extract_{source}")
}

pub fn transform_task_id(source: &str) -> TaskId {
    format!("transform_{source}")
}

/// The pluggable collaborators a pipeline graph is wired against.
pub struct Collaborators {
    pub gate: Arc<dyn ReadinessGate>,
    pub extractor: Arc<dyn Extractor>,
    pub transformer: Arc<dyn Transformer>,
    pub sink: Arc<dyn Sink>,
}

/// Build and validate the pipeline graph for the configured sources.
pub fn build_graph(cfg: &ConfigFile, collab: &Collaborators) -> Result<DependencyGraph> {
    let retry = RetryPolicy::new(
        cfg.run.max_attempts,
        Duration::from_secs(cfg.run.retry_delay_secs),
    );

    let mut graph = DependencyGraph::new();

    graph.add_task(
        Task::new(
            GATE_TASK_ID,
            Arc::new(GateWork {
                gate: Arc::clone(&collab.gate),
                poll_interval: Duration::from_secs(cfg.api.poll_interval_secs),
                timeout: Duration::from_secs(cfg.api.ready_timeout_secs),
            }),
        )
        // The gate bounds its own wait; retrying it would double the window.
        .with_retry(RetryPolicy::no_retries()),
    )?;

    let mut load = Task::new(
        LOAD_TASK_ID,
        Arc::new(LoadWork {
            sink: Arc::clone(&collab.sink),
        }),
    )
    .with_retry(retry);

    for source in &cfg.sources {
        let extract_id = extract_task_id(&source.name);
        let transform_id = transform_task_id(&source.name);

        graph.add_task(
            Task::new(
                extract_id.clone(),
                Arc::new(ExtractWork {
                    extractor: Arc::clone(&collab.extractor),
                    source: source.clone(),
                }),
            )
            .after(GATE_TASK_ID)
            .with_retry(retry),
        )?;

        graph.add_task(
            Task::new(
                transform_id.clone(),
                Arc::new(TransformWork {
                    transformer: Arc::clone(&collab.transformer),
                    sink: Arc::clone(&collab.sink),
                    source_id: source.name.clone(),
                    upstream: extract_id.clone(),
                }),
            )
            .after(extract_id)
            .with_retry(retry),
        )?;

        load = load.after(transform_id);
    }

    graph.add_task(load)?;
    graph.validate()?;
    Ok(graph)
}

/// Polls the readiness gate until it passes or the window closes.
struct GateWork {
    gate: Arc<dyn ReadinessGate>,
    poll_interval: Duration,
    timeout: Duration,
}

#[async_trait]
impl Work for GateWork {
    async fn execute(
        &self,
        _ctx: &RunContext,
        _inputs: &TaskInputs,
    ) -> std::result::Result<TaskValue, TaskError> {
        let started = Instant::now();

        loop {
            match self.gate.is_ready().await {
                Ok(true) => {
                    info!("readiness gate passed");
                    return Ok(json!({ "ready": true }));
                }
                Ok(false) => debug!("gate probe: not ready"),
                Err(err) => debug!(error = %err, "gate probe failed; treating as not ready"),
            }

            if started.elapsed() >= self.timeout {
                return Err(TaskError::GateTimeout {
                    timeout_secs: self.timeout.as_secs(),
                });
            }

            sleep(self.poll_interval).await;
        }
    }
}

/// Pulls the raw record for one source.
struct ExtractWork {
    extractor: Arc<dyn Extractor>,
    source: SourceSpec,
}

#[async_trait]
impl Work for ExtractWork {
    async fn execute(
        &self,
        _ctx: &RunContext,
        _inputs: &TaskInputs,
    ) -> std::result::Result<TaskValue, TaskError> {
        self.extractor.extract(&self.source).await
    }
}

/// Normalizes the upstream payload and writes it through to the staging
/// area. The append is idempotent per (source, run), so a retried transform
/// cannot duplicate rows.
struct TransformWork {
    transformer: Arc<dyn Transformer>,
    sink: Arc<dyn Sink>,
    source_id: String,
    upstream: TaskId,
}

#[async_trait]
impl Work for TransformWork {
    async fn execute(
        &self,
        ctx: &RunContext,
        inputs: &TaskInputs,
    ) -> std::result::Result<TaskValue, TaskError> {
        let raw = inputs.get(&self.upstream).ok_or_else(|| {
            TaskError::Internal(format!("missing payload from '{}'", self.upstream))
        })?;

        let record = self.transformer.transform(raw)?;
        self.sink
            .append(&self.source_id, ctx.run_id(), &record)
            .await?;

        serde_json::to_value(&record).map_err(|err| TaskError::Internal(err.to_string()))
    }
}

/// The fan-in task: uploads every staged dataset, exactly once per run.
struct LoadWork {
    sink: Arc<dyn Sink>,
}

#[async_trait]
impl Work for LoadWork {
    async fn execute(
        &self,
        _ctx: &RunContext,
        _inputs: &TaskInputs,
    ) -> std::result::Result<TaskValue, TaskError> {
        let report = self.sink.flush_all().await?;

        if !report.failures.is_empty() {
            return Err(TaskError::SinkWrite(format!(
                "{} staged file(s) failed to upload: {}",
                report.failures.len(),
                report.failures.join(", ")
            )));
        }

        info!(uploaded = report.uploaded.len(), "bulk upload complete");
        serde_json::to_value(&report).map_err(|err| TaskError::Internal(err.to_string()))
    }
}
