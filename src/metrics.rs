//! `run_data/metrics.json` — per-reference timings and outcomes plus a
//! summary block, written atomically like the tracking and checkpoint
//! stores it sits alongside.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::engine::FailureKind;
use crate::tracking::write_json_atomic;

/// Per-step timings for one reference's processing attempt (spec.md §4.3
/// steps a-e, with a/b folded together since the site module opens the
/// detail view as a single filter-then-click action). A step is `None` if
/// the attempt didn't reach it (e.g. a timeout during filtering leaves the
/// later steps unrecorded).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct StepTimings {
    pub filter_and_open_detail_ms: Option<u128>,
    pub pdf_critical_section_ms: Option<u128>,
    pub write_pdf_ms: Option<u128>,
    pub return_to_inventory_ms: Option<u128>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceMetric {
    pub reference: String,
    pub worker_id: usize,
    pub outcome: MetricOutcome,
    pub elapsed_ms: u128,
    pub steps: StepTimings,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetricOutcome {
    Success,
    Timeout,
    TransientPageError,
    SessionLost,
    Other,
}

impl From<FailureKind> for MetricOutcome {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::Timeout => Self::Timeout,
            FailureKind::TransientPageError => Self::TransientPageError,
            FailureKind::SessionLost => Self::SessionLost,
            FailureKind::Other => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetricsSummary {
    pub total_attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub average_seconds_per_success: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsDocument {
    pub per_reference: Vec<ReferenceMetric>,
    pub summary: MetricsSummary,
}

impl Default for MetricsDocument {
    fn default() -> Self {
        Self {
            per_reference: Vec::new(),
            summary: MetricsSummary::default(),
        }
    }
}

/// Accumulates per-reference timings in memory and persists the whole
/// document after every update, mirroring the tracking/checkpoint stores'
/// single-writer, write-every-time discipline.
pub struct MetricsStore {
    path: PathBuf,
    document: Mutex<MetricsDocument>,
}

impl MetricsStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            document: Mutex::new(MetricsDocument::default()),
        }
    }

    pub async fn record_success(
        &self,
        reference: &str,
        worker_id: usize,
        elapsed: Duration,
        steps: StepTimings,
    ) {
        self.record(reference, worker_id, MetricOutcome::Success, elapsed, steps)
            .await;
    }

    pub async fn record_failure(
        &self,
        reference: &str,
        worker_id: usize,
        elapsed: Duration,
        kind: FailureKind,
        steps: StepTimings,
    ) {
        self.record(reference, worker_id, kind.into(), elapsed, steps)
            .await;
    }

    async fn record(
        &self,
        reference: &str,
        worker_id: usize,
        outcome: MetricOutcome,
        elapsed: Duration,
        steps: StepTimings,
    ) {
        let mut document = self.document.lock().await;
        document.per_reference.push(ReferenceMetric {
            reference: reference.to_string(),
            worker_id,
            outcome,
            elapsed_ms: elapsed.as_millis(),
            steps,
            recorded_at: Utc::now(),
        });

        let summary = &mut document.summary;
        summary.total_attempts += 1;
        if outcome == MetricOutcome::Success {
            summary.successes += 1;
            let total_success_secs = document
                .per_reference
                .iter()
                .filter(|m| m.outcome == MetricOutcome::Success)
                .map(|m| m.elapsed_ms as f64 / 1000.0)
                .sum::<f64>();
            summary.average_seconds_per_success = total_success_secs / summary.successes as f64;
        } else {
            summary.failures += 1;
        }

        if let Err(e) = write_json_atomic(&self.path, &*document) {
            tracing::warn!(error = %e, "failed to persist metrics document");
        }
    }

    pub async fn summary(&self) -> MetricsSummary {
        self.document.lock().await.summary.clone()
    }
}
