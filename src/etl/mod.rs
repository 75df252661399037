// src/etl/mod.rs

//! ETL collaborators and the weather pipeline built on the task engine.
//!
//! The engine in [`crate::dag`] and [`crate::run`] knows nothing about
//! weather; everything source-specific lives here:
//!
//! - [`ReadinessGate`], [`Extractor`], [`Transformer`] and [`Sink`] are the
//!   collaborator seams, so tests can substitute fakes and the engine stays
//!   decoupled from HTTP and storage.
//! - [`weather`] implements the gate and extractor against the weather API.
//! - [`transform`] normalizes raw API payloads.
//! - [`sink`] stages per-source CSV datasets and uploads them.
//! - [`branch`] instantiates the gate -> extract -> transform -> load graph
//!   from the configured source list.

pub mod branch;
pub mod sink;
pub mod transform;
pub mod weather;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::model::SourceSpec;
use crate::errors::TaskError;
use crate::etl::transform::NormalizedRecord;

/// Raw payload pulled for one source; an opaque structured document.
pub type RawRecord = serde_json::Value;

/// Pre-flight check gating the whole run.
#[async_trait]
pub trait ReadinessGate: Send + Sync {
    /// One readiness probe. `Ok(false)` and `Err` both mean "not ready yet";
    /// the gate task keeps polling until its timeout window closes.
    async fn is_ready(&self) -> Result<bool, TaskError>;
}

/// Pulls the raw record for one source.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, source: &SourceSpec) -> Result<RawRecord, TaskError>;
}

/// Pure raw-to-normalized conversion.
pub trait Transformer: Send + Sync {
    fn transform(&self, raw: &RawRecord) -> Result<NormalizedRecord, TaskError>;
}

/// Durable, idempotent record store.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Append one record to the per-source staging dataset.
    ///
    /// Must be safe under retry: appending the same (source, run) record
    /// twice leaves exactly one copy in the dataset.
    async fn append(
        &self,
        source_id: &str,
        run_id: u64,
        record: &NormalizedRecord,
    ) -> Result<(), TaskError>;

    /// Upload every staged dataset to the destination store.
    ///
    /// Re-running must leave the destination in the same final state as a
    /// single run (overwrite, not append, at the storage boundary).
    async fn flush_all(&self) -> Result<FlushReport, TaskError>;
}

/// What `flush_all` managed to upload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FlushReport {
    pub uploaded: Vec<String>,
    pub failures: Vec<String>,
}
