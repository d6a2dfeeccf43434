//! Core configuration type for the harvesting engine.

use std::path::PathBuf;

/// Configuration for a single harvest run.
///
/// **INVARIANT:** `download_root` is always an absolute path (normalized by
/// the builder), so every subsystem that joins a run-relative path onto it
/// behaves consistently regardless of the working directory the process was
/// launched from.
#[derive(Clone)]
pub struct HarvestConfig {
    pub(crate) username: String,
    pub(crate) password: String,
    pub(crate) login_url: String,
    pub(crate) inventory_url: String,
    pub(crate) download_root: PathBuf,
    pub(crate) headless: bool,
    pub(crate) block_resources: bool,
    pub(crate) max_downloads: usize,
    pub(crate) concurrent_contexts: usize,
    pub(crate) task_timeout_secs: u64,
    pub(crate) stuck_threshold_secs: u64,
    pub(crate) watchdog_interval_secs: u64,
    pub(crate) max_retries: u32,
    pub(crate) reference_column: String,
}

impl std::fmt::Debug for HarvestConfig {
    /// Redacts the password; everything else is operationally useful in logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HarvestConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("login_url", &self.login_url)
            .field("inventory_url", &self.inventory_url)
            .field("download_root", &self.download_root)
            .field("headless", &self.headless)
            .field("block_resources", &self.block_resources)
            .field("max_downloads", &self.max_downloads)
            .field("concurrent_contexts", &self.concurrent_contexts)
            .field("task_timeout_secs", &self.task_timeout_secs)
            .field("stuck_threshold_secs", &self.stuck_threshold_secs)
            .field("watchdog_interval_secs", &self.watchdog_interval_secs)
            .field("max_retries", &self.max_retries)
            .field("reference_column", &self.reference_column)
            .finish()
    }
}
