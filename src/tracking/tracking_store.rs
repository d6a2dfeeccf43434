//! `run_data/tracking.json` — per-reference terminal-outcome tracking.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::info;

use super::atomic_write::write_json_atomic;

/// A reference's terminal outcome. Absence of an entry means pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingStatus {
    Downloaded,
    Failed,
}

/// `reference -> status` persisted as a single JSON document.
///
/// **Invariant:** a reference already marked `Downloaded` is never
/// overwritten — `mark_downloaded` is a no-op if the entry already holds
/// that status, and nothing in this store ever demotes it.
pub struct TrackingStore {
    path: PathBuf,
    // `None` is the on-disk `null` the schema spells out for a pending
    // reference (spec.md §6) — a collaborator's `tracking.json` may
    // contain explicit `null` entries, not just omitted keys.
    entries: Mutex<HashMap<String, Option<TrackingStatus>>>,
}

impl TrackingStore {
    /// Load tracking state from `path` if it exists, otherwise start empty.
    pub fn load(path: PathBuf) -> Result<Self> {
        let entries = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading tracking file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parsing tracking file {}", path.display()))?
        } else {
            HashMap::new()
        };

        info!(count = entries.len(), path = %path.display(), "loaded tracking store");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Given the full inventory and the run's `pdfs/` directory, compute
    /// the set of references that still need work: references with no
    /// entry (or an explicit `null`), plus references marked `Failed`
    /// whose PDF file is absent from disk (the default requeue policy —
    /// see module docs).
    pub async fn pending_references(&self, inventory: &[String], pdfs_dir: &Path) -> Vec<String> {
        let entries = self.entries.lock().await;
        inventory
            .iter()
            .filter(|reference| {
                match entries.get(reference.as_str()).copied().flatten() {
                    None => true,
                    Some(TrackingStatus::Downloaded) => false,
                    Some(TrackingStatus::Failed) => {
                        !pdfs_dir.join(format!("{reference}.pdf")).exists()
                    }
                }
            })
            .cloned()
            .collect()
    }

    /// Mark `reference` as downloaded and persist. No-op if already
    /// downloaded — a successful status is never overwritten.
    pub async fn mark_downloaded(&self, reference: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        if entries.get(reference).copied().flatten() == Some(TrackingStatus::Downloaded) {
            return Ok(());
        }
        entries.insert(reference.to_string(), Some(TrackingStatus::Downloaded));
        write_json_atomic(&self.path, &*entries)
    }

    /// Mark `reference` as terminally failed and persist. No-op if the
    /// reference is already marked downloaded — success is never demoted.
    pub async fn mark_failed(&self, reference: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        if entries.get(reference).copied().flatten() == Some(TrackingStatus::Downloaded) {
            return Ok(());
        }
        entries.insert(reference.to_string(), Some(TrackingStatus::Failed));
        write_json_atomic(&self.path, &*entries)
    }

    pub async fn status(&self, reference: &str) -> Option<TrackingStatus> {
        self.entries.lock().await.get(reference).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn new_store_treats_every_reference_as_pending() {
        let dir = TempDir::new().unwrap();
        let store = TrackingStore::load(dir.path().join("tracking.json")).unwrap();
        let inventory = vec!["A".to_string(), "B".to_string()];
        let pending = store.pending_references(&inventory, dir.path()).await;
        assert_eq!(pending, inventory);
    }

    #[tokio::test]
    async fn downloaded_references_are_excluded_from_pending() {
        let dir = TempDir::new().unwrap();
        let store = TrackingStore::load(dir.path().join("tracking.json")).unwrap();
        store.mark_downloaded("A").await.unwrap();

        let inventory = vec!["A".to_string(), "B".to_string()];
        let pending = store.pending_references(&inventory, dir.path()).await;
        assert_eq!(pending, vec!["B".to_string()]);
    }

    #[tokio::test]
    async fn failed_reference_is_requeued_when_no_file_exists() {
        let dir = TempDir::new().unwrap();
        let store = TrackingStore::load(dir.path().join("tracking.json")).unwrap();
        store.mark_failed("A").await.unwrap();

        let inventory = vec!["A".to_string()];
        let pending = store.pending_references(&inventory, dir.path()).await;
        assert_eq!(pending, vec!["A".to_string()]);
    }

    #[tokio::test]
    async fn failed_reference_is_not_requeued_when_file_already_exists() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("A.pdf"), b"stale").unwrap();
        let store = TrackingStore::load(dir.path().join("tracking.json")).unwrap();
        store.mark_failed("A").await.unwrap();

        let inventory = vec!["A".to_string()];
        let pending = store.pending_references(&inventory, dir.path()).await;
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn downloaded_status_is_never_demoted_by_a_later_fail() {
        let dir = TempDir::new().unwrap();
        let store = TrackingStore::load(dir.path().join("tracking.json")).unwrap();
        store.mark_downloaded("A").await.unwrap();
        store.mark_failed("A").await.unwrap();
        assert_eq!(store.status("A").await, Some(TrackingStatus::Downloaded));
    }

    #[tokio::test]
    async fn explicit_null_entries_are_treated_as_pending() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tracking.json");
        std::fs::write(&path, r#"{"A": "downloaded", "B": null}"#).unwrap();

        let store = TrackingStore::load(path).unwrap();
        let inventory = vec!["A".to_string(), "B".to_string()];
        let pending = store.pending_references(&inventory, dir.path()).await;
        assert_eq!(pending, vec!["B".to_string()]);
    }

    #[tokio::test]
    async fn reloading_from_disk_restores_prior_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tracking.json");
        {
            let store = TrackingStore::load(path.clone()).unwrap();
            store.mark_downloaded("A").await.unwrap();
            store.mark_failed("B").await.unwrap();
        }

        let reloaded = TrackingStore::load(path).unwrap();
        assert_eq!(reloaded.status("A").await, Some(TrackingStatus::Downloaded));
        assert_eq!(reloaded.status("B").await, Some(TrackingStatus::Failed));
    }
}
