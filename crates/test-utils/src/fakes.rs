//! Fake work units and collaborators for exercising the engine without
//! HTTP or disk.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use etldag::config::SourceSpec;
use etldag::dag::{TaskInputs, TaskValue, Work};
use etldag::errors::TaskError;
use etldag::etl::transform::NormalizedRecord;
use etldag::etl::{Extractor, FlushReport, RawRecord, ReadinessGate, Sink};
use etldag::run::RunContext;

/// Wraps a plain closure as a unit of work.
pub struct FnWork<F> {
    f: F,
}

#[async_trait]
impl<F> Work for FnWork<F>
where
    F: Fn(&RunContext, &TaskInputs) -> Result<TaskValue, TaskError> + Send + Sync,
{
    async fn execute(
        &self,
        ctx: &RunContext,
        inputs: &TaskInputs,
    ) -> Result<TaskValue, TaskError> {
        (self.f)(ctx, inputs)
    }
}

pub fn fn_work<F>(f: F) -> Arc<dyn Work>
where
    F: Fn(&RunContext, &TaskInputs) -> Result<TaskValue, TaskError> + Send + Sync + 'static,
{
    Arc::new(FnWork { f })
}

/// Work that always succeeds with the given value.
pub fn ok_work(value: TaskValue) -> Arc<dyn Work> {
    fn_work(move |_, _| Ok(value.clone()))
}

/// Work that always fails with the given error.
pub fn fail_work(error: TaskError) -> Arc<dyn Work> {
    fn_work(move |_, _| Err(error.clone()))
}

/// Gate that always answers the same.
pub struct StaticGate {
    pub ready: bool,
}

#[async_trait]
impl ReadinessGate for StaticGate {
    async fn is_ready(&self) -> Result<bool, TaskError> {
        Ok(self.ready)
    }
}

/// Extractor with one fixed response per source, repeated on every call.
///
/// Call counts are recorded so tests can assert retry budgets.
#[derive(Default)]
pub struct ScriptedExtractor {
    responses: Mutex<HashMap<String, Result<RawRecord, TaskError>>>,
    calls: Mutex<HashMap<String, u32>>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_response(&self, source: &str, response: Result<RawRecord, TaskError>) {
        self.responses
            .lock()
            .unwrap()
            .insert(source.to_string(), response);
    }

    pub fn calls(&self, source: &str) -> u32 {
        *self.calls.lock().unwrap().get(source).unwrap_or(&0)
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn extract(&self, source: &SourceSpec) -> Result<RawRecord, TaskError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(source.name.clone())
            .or_insert(0) += 1;

        match self.responses.lock().unwrap().get(&source.name) {
            Some(response) => response.clone(),
            None => Err(TaskError::Extraction {
                status: 0,
                message: format!("no scripted response for '{}'", source.name),
            }),
        }
    }
}

/// Sink that records appends in memory and counts flushes.
#[derive(Default)]
pub struct RecordingSink {
    appended: Mutex<Vec<(String, u64, NormalizedRecord)>>,
    flush_calls: AtomicU32,
    fail_appends_for: Mutex<HashSet<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `append` fail for the given source.
    pub fn fail_appends_for(&self, source: &str) {
        self.fail_appends_for
            .lock()
            .unwrap()
            .insert(source.to_string());
    }

    pub fn appended(&self) -> Vec<(String, u64, NormalizedRecord)> {
        self.appended.lock().unwrap().clone()
    }

    pub fn flush_count(&self) -> u32 {
        self.flush_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sink for RecordingSink {
    async fn append(
        &self,
        source_id: &str,
        run_id: u64,
        record: &NormalizedRecord,
    ) -> Result<(), TaskError> {
        if self.fail_appends_for.lock().unwrap().contains(source_id) {
            return Err(TaskError::SinkWrite(format!(
                "append refused for '{source_id}'"
            )));
        }
        self.appended
            .lock()
            .unwrap()
            .push((source_id.to_string(), run_id, record.clone()));
        Ok(())
    }

    async fn flush_all(&self) -> Result<FlushReport, TaskError> {
        self.flush_calls.fetch_add(1, Ordering::SeqCst);

        let mut uploaded: Vec<String> = self
            .appended
            .lock()
            .unwrap()
            .iter()
            .map(|(source, _, _)| format!("{source}.csv"))
            .collect();
        uploaded.sort();
        uploaded.dedup();

        Ok(FlushReport {
            uploaded,
            failures: Vec::new(),
        })
    }
}

/// A raw payload shaped like the weather API's observation response.
pub fn sample_weather_payload(city: &str) -> RawRecord {
    json!({
        "name": city,
        "weather": [{ "description": "scattered clouds" }],
        "main": {
            "temp": 303.15,
            "feels_like": 305.15,
            "temp_min": 301.15,
            "temp_max": 306.15,
            "pressure": 1008.0,
            "humidity": 74.0
        },
        "wind": { "speed": 3.6 },
        "dt": 1718531400,
        "timezone": 19800,
        "sys": {
            "sunrise": 1718496000,
            "sunset": 1718543400
        }
    })
}
