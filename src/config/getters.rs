//! Accessor methods for `HarvestConfig`.

use std::path::Path;
use std::time::Duration;

use super::types::HarvestConfig;

impl HarvestConfig {
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    #[must_use]
    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    #[must_use]
    pub fn inventory_url(&self) -> &str {
        &self.inventory_url
    }

    #[must_use]
    pub fn download_root(&self) -> &Path {
        &self.download_root
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn block_resources(&self) -> bool {
        self.block_resources
    }

    /// `0` means unlimited.
    #[must_use]
    pub fn max_downloads(&self) -> usize {
        self.max_downloads
    }

    #[must_use]
    pub fn concurrent_contexts(&self) -> usize {
        self.concurrent_contexts
    }

    #[must_use]
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }

    #[must_use]
    pub fn stuck_threshold(&self) -> Duration {
        Duration::from_secs(self.stuck_threshold_secs)
    }

    #[must_use]
    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_secs(self.watchdog_interval_secs)
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    #[must_use]
    pub fn reference_column(&self) -> &str {
        &self.reference_column
    }
}
