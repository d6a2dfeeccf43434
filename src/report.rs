//! The orchestrator's final report: totals, per-outcome counts, timing
//! estimates and the terminal-failure list, per the component design's
//! end-of-run reporting requirement.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::metrics::MetricsSummary;
use crate::tracking::Checkpoint;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub total_references: usize,
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub average_seconds_per_success: f64,
    pub estimated_full_inventory_duration_secs: f64,
    pub wall_clock_secs: f64,
    pub terminal_failures: Vec<String>,
}

impl RunReport {
    #[must_use]
    pub fn build(
        total_references: usize,
        checkpoint: &Checkpoint,
        metrics: &MetricsSummary,
        terminal_failures: Vec<String>,
        wall_clock: Duration,
        concurrent_contexts: usize,
    ) -> Self {
        let concurrency = concurrent_contexts.max(1) as f64;
        let estimated_full_inventory_duration_secs = if metrics.average_seconds_per_success > 0.0 {
            metrics.average_seconds_per_success * total_references as f64 / concurrency
        } else {
            0.0
        };

        Self {
            total_references,
            attempted: checkpoint.attempted,
            succeeded: checkpoint.succeeded,
            failed: checkpoint.failed,
            average_seconds_per_success: metrics.average_seconds_per_success,
            estimated_full_inventory_duration_secs,
            wall_clock_secs: wall_clock.as_secs_f64(),
            terminal_failures,
        }
    }

    /// Human-readable summary line, logged at the end of a run.
    #[must_use]
    pub fn summary_line(&self) -> String {
        format!(
            "{} attempted, {} succeeded, {} failed, {:.1}s elapsed, avg {:.1}s/success, {} terminal failures",
            self.attempted,
            self.succeeded,
            self.failed,
            self.wall_clock_secs,
            self.average_seconds_per_success,
            self.terminal_failures.len()
        )
    }
}
