// src/etl/sink.rs

//! CSV staging sink with idempotent per-run appends.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::errors::TaskError;
use crate::etl::transform::NormalizedRecord;
use crate::etl::{FlushReport, Sink};
use crate::fs::FileSystem;

const CSV_HEADER: &str = "run_id,city,description,temperature_c,feels_like_c,\
min_temp_c,max_temp_c,pressure,humidity,wind_speed,time_of_record,sunrise_local,sunset_local";

/// Stages one CSV dataset per source under `staging_dir` and uploads the
/// staged files to `destination` on flush.
///
/// Rows are keyed by run id: appending again for the same run replaces the
/// existing row instead of duplicating it, so a retried branch cannot
/// corrupt the dataset. The whole file is rewritten on every append; a
/// source's dataset is only ever touched by its own branch within a run.
#[derive(Debug)]
pub struct CsvStagingSink {
    fs: Arc<dyn FileSystem>,
    staging_dir: PathBuf,
    destination: PathBuf,
}

impl CsvStagingSink {
    pub fn new(fs: Arc<dyn FileSystem>, staging_dir: PathBuf, destination: PathBuf) -> Self {
        Self {
            fs,
            staging_dir,
            destination,
        }
    }

    fn dataset_path(&self, source_id: &str) -> PathBuf {
        self.staging_dir.join(format!("{source_id}.csv"))
    }
}

#[async_trait]
impl Sink for CsvStagingSink {
    async fn append(
        &self,
        source_id: &str,
        run_id: u64,
        record: &NormalizedRecord,
    ) -> Result<(), TaskError> {
        let path = self.dataset_path(source_id);
        let mut rows: Vec<String> = Vec::new();

        if self.fs.exists(&path) {
            let existing = self.fs.read_to_string(&path).map_err(sink_err)?;
            rows.extend(
                existing
                    .lines()
                    .skip(1)
                    .filter(|line| !line.is_empty())
                    .filter(|line| !row_belongs_to_run(line, run_id))
                    .map(str::to_string),
            );
        }

        rows.push(csv_row(run_id, record));

        let mut contents = String::from(CSV_HEADER);
        for row in &rows {
            contents.push('\n');
            contents.push_str(row);
        }
        contents.push('\n');

        self.fs.write(&path, contents.as_bytes()).map_err(sink_err)?;
        debug!(
            source = %source_id,
            run_id,
            rows = rows.len(),
            "staged record"
        );
        Ok(())
    }

    async fn flush_all(&self) -> Result<FlushReport, TaskError> {
        let mut report = FlushReport::default();

        if !self.fs.exists(&self.staging_dir) {
            return Ok(report);
        }

        let mut paths = self.fs.read_dir(&self.staging_dir).map_err(sink_err)?;
        paths.sort();

        for path in paths {
            if path.extension().and_then(|ext| ext.to_str()) != Some("csv") {
                continue;
            }
            let Some(filename) = path.file_name().and_then(|n| n.to_str()).map(String::from)
            else {
                continue;
            };

            let upload = self
                .fs
                .read_to_string(&path)
                .and_then(|contents| {
                    self.fs
                        .write(&self.destination.join(&filename), contents.as_bytes())
                });

            match upload {
                Ok(()) => {
                    info!(file = %filename, "uploaded staged dataset");
                    report.uploaded.push(filename);
                }
                Err(err) => {
                    warn!(file = %filename, error = %err, "failed to upload staged dataset");
                    report.failures.push(filename);
                }
            }
        }

        Ok(report)
    }
}

fn sink_err(err: anyhow::Error) -> TaskError {
    TaskError::SinkWrite(err.to_string())
}

/// The run id is the first CSV column.
fn row_belongs_to_run(line: &str, run_id: u64) -> bool {
    line.split(',').next() == Some(run_id.to_string().as_str())
}

fn csv_row(run_id: u64, r: &NormalizedRecord) -> String {
    format!(
        "{},{},{},{},{},{},{},{},{},{},{},{},{}",
        run_id,
        csv_escape(&r.city),
        csv_escape(&r.description),
        r.temperature_c,
        r.feels_like_c,
        r.min_temp_c,
        r.max_temp_c,
        r.pressure,
        r.humidity,
        r.wind_speed,
        r.time_of_record,
        r.sunrise_local,
        r.sunset_local,
    )
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
