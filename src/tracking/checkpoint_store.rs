//! `run_data/checkpoint.json` — run-level progress counters.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use std::path::PathBuf;
use tracing::info;

use super::atomic_write::write_json_atomic;

/// Run-level counters. `attempted`/`succeeded`/`failed` are monotonic;
/// `consecutive_failures` resets to zero on every success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub run_started_at: DateTime<Utc>,
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub consecutive_failures: u64,
    pub last_reference: Option<String>,
    pub last_updated_at: DateTime<Utc>,
}

impl Checkpoint {
    fn new(run_started_at: DateTime<Utc>) -> Self {
        Self {
            run_started_at,
            attempted: 0,
            succeeded: 0,
            failed: 0,
            consecutive_failures: 0,
            last_reference: None,
            last_updated_at: run_started_at,
        }
    }
}

pub struct CheckpointStore {
    path: PathBuf,
    state: Mutex<Checkpoint>,
}

impl CheckpointStore {
    /// Load an existing checkpoint from `path`, or start a fresh one
    /// stamped with `run_started_at` if none exists.
    pub fn load(path: PathBuf, run_started_at: DateTime<Utc>) -> Result<Self> {
        let state = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading checkpoint file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parsing checkpoint file {}", path.display()))?
        } else {
            Checkpoint::new(run_started_at)
        };

        info!(
            attempted = state.attempted,
            succeeded = state.succeeded,
            failed = state.failed,
            "loaded checkpoint"
        );
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Record a successful download: `succeeded++`, `attempted++`,
    /// `consecutive_failures` reset to zero.
    pub async fn record_success(&self, reference: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.attempted += 1;
        state.succeeded += 1;
        state.consecutive_failures = 0;
        state.last_reference = Some(reference.to_string());
        state.last_updated_at = Utc::now();
        write_json_atomic(&self.path, &*state)
    }

    /// Record a terminal failure: `failed++`, `attempted++`,
    /// `consecutive_failures++`.
    pub async fn record_failure(&self, reference: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.attempted += 1;
        state.failed += 1;
        state.consecutive_failures += 1;
        state.last_reference = Some(reference.to_string());
        state.last_updated_at = Utc::now();
        write_json_atomic(&self.path, &*state)
    }

    pub async fn snapshot(&self) -> Checkpoint {
        self.state.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn success_resets_consecutive_failures() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::load(dir.path().join("checkpoint.json"), Utc::now()).unwrap();
        store.record_failure("A").await.unwrap();
        store.record_failure("B").await.unwrap();
        assert_eq!(store.snapshot().await.consecutive_failures, 2);

        store.record_success("C").await.unwrap();
        let snap = store.snapshot().await;
        assert_eq!(snap.consecutive_failures, 0);
        assert_eq!(snap.attempted, 3);
        assert_eq!(snap.succeeded, 1);
        assert_eq!(snap.failed, 2);
    }

    #[tokio::test]
    async fn reload_restores_counters() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("checkpoint.json");
        {
            let store = CheckpointStore::load(path.clone(), Utc::now()).unwrap();
            store.record_success("A").await.unwrap();
        }

        let reloaded = CheckpointStore::load(path, Utc::now()).unwrap();
        assert_eq!(reloaded.snapshot().await.succeeded, 1);
    }
}
