// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod etl;
pub mod fs;
pub mod logging;
pub mod run;
pub mod trigger;

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::errors::{EtldagError, Result};
use crate::etl::branch::{self, Collaborators};
use crate::etl::sink::CsvStagingSink;
use crate::etl::transform::WeatherTransformer;
use crate::etl::weather::WeatherApi;
use crate::fs::RealFileSystem;
use crate::run::{RunContext, RunOutcome, Runner};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the weather API client, transformer and staging sink
/// - the task graph (built once, reused every tick)
/// - the calendar trigger loop
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let probe_query = cfg
        .sources
        .first()
        .map(|s| s.query.clone())
        .unwrap_or_default();

    let api = Arc::new(WeatherApi::from_config(&cfg.api, &probe_query)?);
    let sink = Arc::new(CsvStagingSink::new(
        Arc::new(RealFileSystem),
        cfg.storage.staging_dir.clone(),
        cfg.storage.destination.clone(),
    ));

    let collab = Collaborators {
        gate: api.clone(),
        extractor: api,
        transformer: Arc::new(WeatherTransformer),
        sink,
    };

    // Built once; every scheduled tick reuses the same immutable graph.
    let graph = Arc::new(branch::build_graph(&cfg, &collab)?);
    let runner = Runner::new(graph);

    // Ctrl-C → cancel the current run and stop the trigger loop.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            cancel.cancel();
        });
    }

    let mut run_counter: u64 = 0;

    if args.once {
        run_counter += 1;
        let ctx = RunContext::with_cancellation(run_counter, Utc::now(), cancel.child_token());
        let outcome = runner.run(ctx).await;
        report_outcome(&outcome);
        return match outcome {
            RunOutcome::Success { .. } => Ok(()),
            RunOutcome::Failed { run_id, failures } => Err(EtldagError::RunFailed {
                run_id,
                failed: failures.len(),
            }),
        };
    }

    loop {
        let tick = trigger::next_tick(Utc::now(), cfg.schedule.interval);
        info!(tick = %tick, "waiting for next scheduled run");

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("shutdown requested; stopping trigger loop");
                break;
            }
            _ = trigger::wait_until(tick) => {}
        }

        run_counter += 1;
        let ctx = RunContext::with_cancellation(run_counter, tick, cancel.child_token());
        let outcome = runner.run(ctx).await;
        report_outcome(&outcome);

        if cancel.is_cancelled() {
            break;
        }
    }

    Ok(())
}

/// Final operator-facing summary: the complete set of failed tasks with
/// their root causes, not just the first failure.
fn report_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Success { run_id } => info!(run_id, "run succeeded"),
        RunOutcome::Failed { run_id, failures } => {
            warn!(run_id, failed = failures.len(), "run failed");
            for (task, error) in failures {
                warn!(run_id, task = %task, error = %error, "failed task");
            }
        }
    }
}

/// Simple dry-run output: print the pipeline implied by the config.
fn print_dry_run(cfg: &ConfigFile) {
    println!("etldag dry-run");
    println!("  run.max_attempts = {}", cfg.run.max_attempts);
    println!("  run.retry_delay_secs = {}", cfg.run.retry_delay_secs);
    println!("  schedule.interval = {:?}", cfg.schedule.interval);
    println!("  storage.staging_dir = {}", cfg.storage.staging_dir.display());
    println!("  storage.destination = {}", cfg.storage.destination.display());
    println!();

    println!("tasks:");
    println!("  - {}", branch::GATE_TASK_ID);
    for source in &cfg.sources {
        let extract = branch::extract_task_id(&source.name);
        let transform = branch::transform_task_id(&source.name);
        println!("  - {extract}");
        println!("      after: [{}]", branch::GATE_TASK_ID);
        println!("      query: {}", source.query);
        println!("  - {transform}");
        println!("      after: [{extract}]");
    }
    println!("  - {}", branch::LOAD_TASK_ID);
    println!(
        "      after: [{}]",
        cfg.sources
            .iter()
            .map(|s| branch::transform_task_id(&s.name))
            .collect::<Vec<_>>()
            .join(", ")
    );
}
