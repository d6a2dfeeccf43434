//! Orchestrator: composes session bring-up, the task queue, N workers and
//! the watchdog, waits for drain, and produces the final report.

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::browser_session::BrowserSession;
use crate::config::HarvestConfig;
use crate::inventory::read_inventory;
use crate::metrics::MetricsStore;
use crate::report::RunReport;
use crate::run_dir::RunDirectory;
use crate::tracking::{CheckpointStore, TrackingStore};

use super::pdf_lock::{DEFAULT_QUIESCENCE_DELAY, PdfLock};
use super::task_queue::TaskQueue;
use super::watchdog::watchdog_loop;
use super::worker::{WorkerContext, run_worker};

pub use crate::report::RunReport as Report;

/// Run one full harvest: bring up the browser session, build the pending
/// set, spawn workers and the watchdog, wait for drain, tear down, and
/// return the final report.
///
/// `run_dir` selects fresh-run-for-today vs. resuming an existing
/// directory verbatim (the `--resume <path>` CLI flag).
pub async fn run(config: HarvestConfig, run_dir: RunDirectory) -> Result<RunReport> {
    let started_at = Instant::now();
    let config = Arc::new(config);

    let session = BrowserSession::bring_up(&config, &run_dir.inventory_csv_path())
        .await
        .context("bringing up browser session")?;

    let inventory = read_inventory(&run_dir.inventory_csv_path(), config.reference_column())
        .context("reading exported inventory")?;
    let all_references: Vec<String> = inventory.into_iter().map(|r| r.reference).collect();
    info!(count = all_references.len(), "inventory loaded");

    let tracking = Arc::new(
        TrackingStore::load(run_dir.tracking_path()).context("loading tracking store")?,
    );
    let checkpoint = Arc::new(
        CheckpointStore::load(run_dir.checkpoint_path(), Utc::now())
            .context("loading checkpoint store")?,
    );
    let metrics = Arc::new(MetricsStore::new(run_dir.metrics_path()));

    let mut pending = tracking
        .pending_references(&all_references, &run_dir.pdfs_dir())
        .await;
    if config.max_downloads() > 0 && pending.len() > config.max_downloads() {
        pending.truncate(config.max_downloads());
    }
    info!(pending = pending.len(), "pending set built");

    let queue = Arc::new(TaskQueue::new(pending));
    let pdf_lock = Arc::new(PdfLock::new(DEFAULT_QUIESCENCE_DELAY));
    let fatal: Arc<std::sync::Mutex<Option<String>>> = Arc::new(std::sync::Mutex::new(None));

    let shutdown = CancellationToken::new();
    let ctrl_c_shutdown = shutdown.clone();
    let ctrl_c_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, requesting graceful shutdown");
            ctrl_c_shutdown.cancel();
        }
    });

    let watchdog_handle = tokio::spawn(watchdog_loop(
        queue.clone(),
        config.watchdog_interval(),
        config.stuck_threshold(),
        shutdown.clone(),
    ));

    let mut worker_handles = Vec::new();
    for (worker_id, page) in session.pages.iter().cloned().enumerate() {
        let ctx = WorkerContext {
            worker_id,
            browser: session.browser.clone(),
            page,
            queue: queue.clone(),
            pdf_lock: pdf_lock.clone(),
            tracking: tracking.clone(),
            checkpoint: checkpoint.clone(),
            metrics: metrics.clone(),
            pdfs_dir: run_dir.pdfs_dir(),
            config: config.clone(),
            shutdown: shutdown.clone(),
            fatal: fatal.clone(),
        };
        worker_handles.push(tokio::spawn(run_worker(ctx)));
    }

    for handle in worker_handles {
        handle.await.context("worker task panicked")?;
    }
    watchdog_handle.await.context("watchdog task panicked")?;
    shutdown.cancel();
    ctrl_c_task.abort();

    session.shutdown().await.context("shutting down browser session")?;

    if let Some(message) = fatal.lock().expect("fatal mutex poisoned").take() {
        return Err(crate::error::EngineError::SessionLost(message).into());
    }

    let checkpoint_snapshot = checkpoint.snapshot().await;
    let metrics_summary = metrics.summary().await;
    let terminal_failures = queue.terminal_failures().await;

    let report = RunReport::build(
        all_references.len(),
        &checkpoint_snapshot,
        &metrics_summary,
        terminal_failures,
        started_at.elapsed(),
        config.concurrent_contexts(),
    );
    info!(summary = %report.summary_line(), "run complete");

    Ok(report)
}
