//! Worker loop: pulls references from the task queue and drives them
//! through the processing procedure on its own page.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use chromiumoxide::{Browser, Page};
use tokio_util::sync::CancellationToken;

use crate::config::HarvestConfig;
use crate::metrics::{MetricsStore, StepTimings};
use crate::tracking::checkpoint_store::CheckpointStore;
use crate::tracking::tracking_store::TrackingStore;

use super::download::{client_with_page_cookies, download_pdf_bytes, write_pdf_atomic};
use super::page_timeout::with_page_timeout;
use super::pdf_lock::PdfLock;
use super::site;
use super::task_queue::TaskQueue;
use super::types::FailureKind;

/// Everything a worker needs that is shared across the whole run.
pub struct WorkerContext {
    pub worker_id: usize,
    pub browser: Arc<Browser>,
    pub page: Page,
    pub queue: Arc<TaskQueue>,
    pub pdf_lock: Arc<PdfLock>,
    pub tracking: Arc<TrackingStore>,
    pub checkpoint: Arc<CheckpointStore>,
    pub metrics: Arc<MetricsStore>,
    pub pdfs_dir: std::path::PathBuf,
    pub config: Arc<HarvestConfig>,
    pub shutdown: CancellationToken,
    /// Set by whichever worker first fails to re-authenticate after a
    /// detected session loss (spec.md §7: "if re-authentication fails,
    /// the run terminates fatally"). The orchestrator checks this after
    /// every worker has exited and surfaces it as a fatal error.
    pub fatal: Arc<std::sync::Mutex<Option<String>>>,
}

/// Run the worker loop to completion (exits once the queue is drained or
/// `shutdown` fires).
///
/// Step numbering in comments below refers to the worker loop procedure:
/// get a reference, run the processing procedure under a per-task deadline,
/// route the outcome back into the queue and the tracking/checkpoint stores.
pub async fn run_worker(ctx: WorkerContext) {
    loop {
        let reference = tokio::select! {
            () = ctx.shutdown.cancelled() => {
                info!(worker_id = ctx.worker_id, "shutdown requested, exiting");
                return;
            }
            got = ctx.queue.get(ctx.worker_id) => match got {
                Some(r) => r,
                None => {
                    let stats = ctx.queue.stats().await;
                    if stats.is_drained() {
                        info!(worker_id = ctx.worker_id, "queue drained, exiting");
                        return;
                    }
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    continue;
                }
            }
        };

        let started = Instant::now();
        let mut steps = StepTimings::default();
        let outcome = tokio::select! {
            () = ctx.shutdown.cancelled() => {
                warn!(
                    reference = %reference,
                    worker_id = ctx.worker_id,
                    "shutdown requested mid-task, abandoning in-flight attempt"
                );
                recover_page(&ctx).await;
                ctx.queue.fail(&reference, ctx.config.max_retries()).await;
                return;
            }
            result = with_page_timeout(
                process_reference(&ctx, &reference, &mut steps),
                ctx.config.task_timeout(),
                "process reference",
            ) => result,
        };
        let elapsed = started.elapsed();

        match outcome {
            Ok(()) => {
                ctx.queue.complete(&reference).await;
                if let Err(e) = ctx.tracking.mark_downloaded(&reference).await {
                    warn!(reference = %reference, error = %e, "failed to persist tracking update");
                }
                if let Err(e) = ctx.checkpoint.record_success(&reference).await {
                    warn!(reference = %reference, error = %e, "failed to persist checkpoint update");
                }
                ctx.metrics
                    .record_success(&reference, ctx.worker_id, elapsed, steps)
                    .await;
                info!(
                    reference = %reference,
                    worker_id = ctx.worker_id,
                    elapsed_ms = elapsed.as_millis(),
                    "download complete"
                );
            }
            Err(error) => {
                let kind = FailureKind::classify(&error);
                warn!(
                    reference = %reference,
                    worker_id = ctx.worker_id,
                    error = %error,
                    kind = %kind,
                    "processing attempt failed"
                );

                recover_page(&ctx).await;

                let terminal = ctx.queue.fail(&reference, ctx.config.max_retries()).await;
                ctx.metrics
                    .record_failure(&reference, ctx.worker_id, elapsed, kind, steps)
                    .await;
                if terminal {
                    if let Err(e) = ctx.tracking.mark_failed(&reference).await {
                        warn!(reference = %reference, error = %e, "failed to persist tracking update");
                    }
                    if let Err(e) = ctx.checkpoint.record_failure(&reference).await {
                        warn!(reference = %reference, error = %e, "failed to persist checkpoint update");
                    }
                    warn!(reference = %reference, "terminally failed after exhausting retries");
                } else {
                    // Jittered pause before the next queue pull so a retried
                    // reference doesn't immediately collide with the same
                    // transient condition across every worker at once.
                    tokio::time::sleep(jittered_retry_backoff()).await;
                }
            }
        }
    }
}

/// Steps a-e of the processing procedure for a single reference. Fills in
/// `steps` as each one completes, so a partially-completed attempt (one
/// that errors or times out partway through) still reports timings for
/// whichever steps it reached.
async fn process_reference(
    ctx: &WorkerContext,
    reference: &str,
    steps: &mut StepTimings,
) -> Result<()> {
    let step_started = Instant::now();

    // a. Filter the inventory grid down to this reference.
    // b. Open the detail view.
    site::filter_and_open_detail(&ctx.page, reference)
        .await
        .context("filtering and opening detail view")?;

    if session_lost(&ctx.page, ctx.config.login_url()).await {
        // Serialized under Lp per spec.md §7: re-authentication is the
        // other shared-browser-state interaction that must not race
        // against a sibling worker's own session-refresh attempt.
        let refresh_result = ctx.pdf_lock.run_exclusive(refresh_session(ctx)).await;
        if let Err(e) = refresh_result {
            let message = format!("re-authentication failed: {e:#}");
            let mut fatal = ctx.fatal.lock().expect("fatal mutex poisoned");
            if fatal.is_none() {
                *fatal = Some(message.clone());
            }
            drop(fatal);
            ctx.shutdown.cancel();
            return Err(e.context("re-authentication failed; aborting run"));
        }
        site::filter_and_open_detail(&ctx.page, reference)
            .await
            .context("filtering and opening detail view after session refresh")?;
    }
    steps.filter_and_open_detail_ms = Some(step_started.elapsed().as_millis());

    // c. Enter the PDF critical section.
    let step_started = Instant::now();
    let page = &ctx.page;
    let browser = ctx.browser.as_ref();
    let reference_owned = reference.to_string();
    let pdf_bytes = ctx
        .pdf_lock
        .run(
            async move {
                let known_targets = site::known_target_ids(browser)
                    .await
                    .context("snapshotting known target ids before click")?;

                site::click_create_pdf(page)
                    .await
                    .context("clicking create-pdf control")?;

                let popup = site::wait_for_pdf_popup(browser, &known_targets, Duration::from_secs(20))
                    .await
                    .context("awaiting PDF popup")?;

                let popup_url = popup
                    .url()
                    .await
                    .context("reading popup URL")?
                    .ok_or_else(|| anyhow::anyhow!("PDF popup reported no URL"))?;

                let client = client_with_page_cookies(page, &popup_url)
                    .await
                    .context("building authenticated client from page cookies")?;
                let bytes = download_pdf_bytes(&client, &popup_url)
                    .await
                    .with_context(|| format!("downloading PDF bytes for {reference_owned}"))?;

                popup.close().await.context("closing PDF popup")?;

                Ok::<_, anyhow::Error>(bytes)
            },
            || async { site::close_stray_pdf_popups(browser).await.map(|_| ()) },
        )
        .await
        .context("PDF critical section")?;
    steps.pdf_critical_section_ms = Some(step_started.elapsed().as_millis());

    // d. Atomically write the bytes under pdfs/<reference>.pdf.
    let step_started = Instant::now();
    let path = ctx.pdfs_dir.join(format!("{reference}.pdf"));
    write_pdf_atomic(&path, &pdf_bytes)
        .await
        .context("writing PDF to disk")?;
    steps.write_pdf_ms = Some(step_started.elapsed().as_millis());

    // e. Return the page to the inventory view.
    let step_started = Instant::now();
    site::open_inventory(&ctx.page, ctx.config.inventory_url())
        .await
        .context("returning to inventory view")?;
    steps.return_to_inventory_ms = Some(step_started.elapsed().as_millis());

    Ok(())
}

/// A short random delay in `[0, 500ms)` before a worker returns to the
/// queue after a retryable failure.
fn jittered_retry_backoff() -> Duration {
    use rand::Rng;
    Duration::from_millis(rand::rng().random_range(0..500))
}

async fn session_lost(page: &Page, login_url: &str) -> bool {
    match page.url().await {
        Ok(Some(url)) => site::looks_like_login_page(&url, login_url),
        _ => false,
    }
}

/// Re-authenticate on this worker's own page. Real re-authentication of the
/// shared context happens only once per run in practice, but each worker
/// that detects the symptom drives its own page back through login since
/// the context's cookies are shared — a successful login on any page
/// refreshes the session for all of them.
async fn refresh_session(ctx: &WorkerContext) -> Result<()> {
    warn!(worker_id = ctx.worker_id, "session appears lost, re-authenticating");
    ctx.page
        .goto(ctx.config.login_url())
        .await
        .context("navigating to login page for session refresh")?;
    ctx.page
        .wait_for_navigation()
        .await
        .context("waiting for login page navigation")?;
    site::login(&ctx.page, ctx.config.username(), ctx.config.password())
        .await
        .context("re-authenticating")?;
    site::accept_license_if_present(&ctx.page).await.ok();
    Ok(())
}

/// Best-effort recovery of this worker's page to a known-good state after
/// a failed attempt: close any popup it may have left open and return to
/// the inventory view, swallowing further errors since the worker will
/// retry or exit regardless.
async fn recover_page(ctx: &WorkerContext) {
    if let Err(e) = site::close_stray_pdf_popups(ctx.browser.as_ref()).await {
        warn!(worker_id = ctx.worker_id, error = %e, "failed to close stray popups during recovery");
    }
    if let Err(e) = site::open_inventory(&ctx.page, ctx.config.inventory_url()).await {
        warn!(worker_id = ctx.worker_id, error = %e, "failed to return to inventory view during recovery");
    }
}
