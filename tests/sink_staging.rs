// tests/sink_staging.rs

//! Idempotent staging and overwrite-style uploads of the CSV sink.

use std::path::Path;
use std::sync::Arc;

use etldag::etl::Sink;
use etldag::etl::sink::CsvStagingSink;
use etldag::etl::transform::{NormalizedRecord, WeatherTransformer};
use etldag::etl::Transformer;
use etldag::fs::mock::MockFileSystem;
use etldag::fs::RealFileSystem;
use etldag_test_utils::fakes::sample_weather_payload;
use etldag_test_utils::init_tracing;

fn record(city: &str) -> NormalizedRecord {
    WeatherTransformer
        .transform(&sample_weather_payload(city))
        .expect("sample payload is well-formed")
}

fn mock_sink() -> (MockFileSystem, CsvStagingSink) {
    let fs = MockFileSystem::new();
    let sink = CsvStagingSink::new(
        Arc::new(fs.clone()),
        "staging".into(),
        "store".into(),
    );
    (fs, sink)
}

fn data_rows(contents: &str) -> Vec<&str> {
    contents.lines().skip(1).filter(|l| !l.is_empty()).collect()
}

#[tokio::test]
async fn appending_twice_for_the_same_run_keeps_one_copy() {
    init_tracing();

    let (fs, sink) = mock_sink();
    let rec = record("Chennai");

    sink.append("chennai", 1, &rec).await.unwrap();
    sink.append("chennai", 1, &rec).await.unwrap();

    let contents = fs
        .file_content(Path::new("staging/chennai.csv"))
        .expect("dataset staged");
    let rows = data_rows(&contents);
    assert_eq!(rows.len(), 1);
    assert!(rows[0].starts_with("1,Chennai,"));
}

#[tokio::test]
async fn datasets_accumulate_across_runs() {
    init_tracing();

    let (fs, sink) = mock_sink();

    sink.append("chennai", 1, &record("Chennai")).await.unwrap();
    sink.append("chennai", 2, &record("Chennai")).await.unwrap();
    // A retried branch in run 2 rewrites only run 2's row.
    sink.append("chennai", 2, &record("Chennai")).await.unwrap();

    let contents = fs
        .file_content(Path::new("staging/chennai.csv"))
        .expect("dataset staged");
    let rows = data_rows(&contents);
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().any(|r| r.starts_with("1,")));
    assert!(rows.iter().any(|r| r.starts_with("2,")));
}

#[tokio::test]
async fn flush_uploads_every_staged_dataset_and_is_rerunnable() {
    init_tracing();

    let (fs, sink) = mock_sink();
    sink.append("chennai", 1, &record("Chennai")).await.unwrap();
    sink.append("mumbai", 1, &record("Mumbai")).await.unwrap();

    let report = sink.flush_all().await.unwrap();
    assert_eq!(report.uploaded, vec!["chennai.csv", "mumbai.csv"]);
    assert!(report.failures.is_empty());

    let staged = fs.file_content(Path::new("staging/chennai.csv")).unwrap();
    let uploaded = fs.file_content(Path::new("store/chennai.csv")).unwrap();
    assert_eq!(staged, uploaded);

    // Re-running the upload leaves the destination in the same final state.
    let again = sink.flush_all().await.unwrap();
    assert_eq!(again.uploaded, vec!["chennai.csv", "mumbai.csv"]);
    assert_eq!(
        fs.file_content(Path::new("store/chennai.csv")).unwrap(),
        uploaded
    );
}

#[tokio::test]
async fn flush_reports_failed_uploads_per_file() {
    init_tracing();

    let (fs, sink) = mock_sink();
    sink.append("chennai", 1, &record("Chennai")).await.unwrap();
    fs.fail_writes_under(Path::new("store"));

    let report = sink.flush_all().await.unwrap();
    assert!(report.uploaded.is_empty());
    assert_eq!(report.failures, vec!["chennai.csv"]);
}

#[tokio::test]
async fn flush_with_nothing_staged_uploads_nothing() {
    init_tracing();

    let (_fs, sink) = mock_sink();
    let report = sink.flush_all().await.unwrap();
    assert!(report.uploaded.is_empty());
    assert!(report.failures.is_empty());
}

#[tokio::test]
async fn staging_and_upload_work_on_a_real_filesystem() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let staging = dir.path().join("staging");
    let store = dir.path().join("store");
    let sink = CsvStagingSink::new(Arc::new(RealFileSystem), staging.clone(), store.clone());

    sink.append("chennai", 1, &record("Chennai")).await.unwrap();
    let report = sink.flush_all().await.unwrap();

    assert_eq!(report.uploaded, vec!["chennai.csv"]);
    let uploaded = std::fs::read_to_string(store.join("chennai.csv")).unwrap();
    assert!(uploaded.starts_with("run_id,city,"));
    assert!(uploaded.contains("1,Chennai,"));
}
