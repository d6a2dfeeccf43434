//! Run directory layout and creation.
//!
//! Every invocation gets its own directory under `download_root`, named by
//! date and suffixed with a numeric discriminator if a non-empty directory
//! of that name already exists, so two runs on the same day never collide.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};

/// The on-disk layout for a single harvest run: `pdfs/` for output PDFs,
/// `run_data/` for the tracking/checkpoint/metrics documents and the
/// exported inventory CSV.
#[derive(Debug, Clone)]
pub struct RunDirectory {
    root: PathBuf,
}

impl RunDirectory {
    /// Create (or reuse) the run directory for today under `download_root`.
    ///
    /// Reuse happens when `--resume` points back at an existing, non-empty
    /// directory; fresh runs instead get a numeric suffix appended so they
    /// never overwrite a prior run's outputs.
    pub fn create_for_today(download_root: &Path) -> Result<Self> {
        let date = Utc::now().format("%Y-%m-%d").to_string();
        Self::create(download_root, &date)
    }

    /// Resume an existing run directory verbatim, without date/suffix logic.
    pub fn resume(path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(path.join("pdfs")).context("creating pdfs/ directory")?;
        std::fs::create_dir_all(path.join("run_data")).context("creating run_data/ directory")?;
        Ok(Self { root: path })
    }

    fn create(download_root: &Path, base_name: &str) -> Result<Self> {
        std::fs::create_dir_all(download_root)
            .with_context(|| format!("creating download root {}", download_root.display()))?;

        let mut candidate = download_root.join(base_name);
        let mut suffix = 1u32;
        while directory_is_non_empty(&candidate) {
            candidate = download_root.join(format!("{base_name}-{suffix}"));
            suffix += 1;
        }

        std::fs::create_dir_all(candidate.join("pdfs")).context("creating pdfs/ directory")?;
        std::fs::create_dir_all(candidate.join("run_data"))
            .context("creating run_data/ directory")?;

        Ok(Self { root: candidate })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn pdfs_dir(&self) -> PathBuf {
        self.root.join("pdfs")
    }

    #[must_use]
    pub fn run_data_dir(&self) -> PathBuf {
        self.root.join("run_data")
    }

    #[must_use]
    pub fn pdf_path(&self, reference: &str) -> PathBuf {
        self.pdfs_dir().join(format!("{reference}.pdf"))
    }

    #[must_use]
    pub fn tracking_path(&self) -> PathBuf {
        self.run_data_dir().join("tracking.json")
    }

    #[must_use]
    pub fn checkpoint_path(&self) -> PathBuf {
        self.run_data_dir().join("checkpoint.json")
    }

    #[must_use]
    pub fn metrics_path(&self) -> PathBuf {
        self.run_data_dir().join("metrics.json")
    }

    #[must_use]
    pub fn inventory_csv_path(&self) -> PathBuf {
        self.run_data_dir().join("inventory.csv")
    }
}

fn directory_is_non_empty(path: &Path) -> bool {
    match std::fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_some(),
        Err(_) => false,
    }
}
