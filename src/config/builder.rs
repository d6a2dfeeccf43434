//! Type-safe builder for `HarvestConfig` using the typestate pattern.
//!
//! Required fields are threaded through distinct marker states so
//! `build()` is only callable once every required field has actually been
//! set, with the check done by the compiler rather than at runtime.

use anyhow::{Result, anyhow};
use std::marker::PhantomData;
use std::path::PathBuf;

use super::types::HarvestConfig;

pub struct WithCredentials;
pub struct WithTargetUrls;

pub struct HarvestConfigBuilder<State = ()> {
    username: Option<String>,
    password: Option<String>,
    download_root: Option<PathBuf>,
    login_url: Option<String>,
    inventory_url: Option<String>,
    headless: bool,
    block_resources: bool,
    max_downloads: usize,
    concurrent_contexts: usize,
    task_timeout_secs: u64,
    stuck_threshold_secs: u64,
    watchdog_interval_secs: u64,
    max_retries: u32,
    reference_column: String,
    _phantom: PhantomData<State>,
}

impl Default for HarvestConfigBuilder<()> {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            download_root: None,
            login_url: None,
            inventory_url: None,
            headless: true,
            block_resources: true,
            max_downloads: 0,
            concurrent_contexts: 5,
            task_timeout_secs: 180,
            stuck_threshold_secs: 300,
            watchdog_interval_secs: 60,
            max_retries: 2,
            reference_column: "reference".to_string(),
            _phantom: PhantomData,
        }
    }
}

impl HarvestConfigBuilder<()> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the login credentials and the directory downloads are rooted under.
    pub fn credentials(
        self,
        username: impl Into<String>,
        password: impl Into<String>,
        download_root: impl Into<PathBuf>,
    ) -> Result<HarvestConfigBuilder<WithCredentials>> {
        let download_root = download_root.into();
        let download_root = if download_root.is_absolute() {
            download_root
        } else {
            std::env::current_dir()
                .map_err(|e| anyhow!("failed to resolve current directory: {e}"))?
                .join(download_root)
        };

        Ok(HarvestConfigBuilder {
            username: Some(username.into()),
            password: Some(password.into()),
            download_root: Some(download_root),
            login_url: self.login_url,
            inventory_url: self.inventory_url,
            headless: self.headless,
            block_resources: self.block_resources,
            max_downloads: self.max_downloads,
            concurrent_contexts: self.concurrent_contexts,
            task_timeout_secs: self.task_timeout_secs,
            stuck_threshold_secs: self.stuck_threshold_secs,
            watchdog_interval_secs: self.watchdog_interval_secs,
            max_retries: self.max_retries,
            reference_column: self.reference_column,
            _phantom: PhantomData,
        })
    }
}

impl HarvestConfigBuilder<WithCredentials> {
    /// Set the target site's login page and inventory (grid) view URLs.
    pub fn target_urls(
        self,
        login_url: impl Into<String>,
        inventory_url: impl Into<String>,
    ) -> HarvestConfigBuilder<WithTargetUrls> {
        HarvestConfigBuilder {
            username: self.username,
            password: self.password,
            download_root: self.download_root,
            login_url: Some(login_url.into()),
            inventory_url: Some(inventory_url.into()),
            headless: self.headless,
            block_resources: self.block_resources,
            max_downloads: self.max_downloads,
            concurrent_contexts: self.concurrent_contexts,
            task_timeout_secs: self.task_timeout_secs,
            stuck_threshold_secs: self.stuck_threshold_secs,
            watchdog_interval_secs: self.watchdog_interval_secs,
            max_retries: self.max_retries,
            reference_column: self.reference_column,
            _phantom: PhantomData,
        }
    }
}

// Methods available regardless of builder state: state-independent setters
// applied before `build`.
impl<State> HarvestConfigBuilder<State> {
    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    #[must_use]
    pub fn block_resources(mut self, block: bool) -> Self {
        self.block_resources = block;
        self
    }

    #[must_use]
    pub fn max_downloads(mut self, max: usize) -> Self {
        self.max_downloads = max;
        self
    }

    /// Worker tab count. Spec names this `concurrentContexts` for backward
    /// compatibility with the GUI's configuration surface, even though it
    /// governs tabs within a single shared browser context, not contexts.
    #[must_use]
    pub fn concurrent_contexts(mut self, n: usize) -> Self {
        self.concurrent_contexts = n.max(1);
        self
    }

    #[must_use]
    pub fn task_timeout_secs(mut self, secs: u64) -> Self {
        self.task_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn stuck_threshold_secs(mut self, secs: u64) -> Self {
        self.stuck_threshold_secs = secs;
        self
    }

    #[must_use]
    pub fn watchdog_interval_secs(mut self, secs: u64) -> Self {
        self.watchdog_interval_secs = secs;
        self
    }

    #[must_use]
    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    #[must_use]
    pub fn reference_column(mut self, name: impl Into<String>) -> Self {
        self.reference_column = name.into();
        self
    }
}

// `build` is only callable once credentials and target URLs have both been set.
impl HarvestConfigBuilder<WithTargetUrls> {
    pub fn build(self) -> Result<HarvestConfig> {
        if self.concurrent_contexts == 0 {
            return Err(anyhow!("concurrent_contexts must be at least 1"));
        }

        Ok(HarvestConfig {
            username: self
                .username
                .ok_or_else(|| anyhow!("username is required"))?,
            password: self
                .password
                .ok_or_else(|| anyhow!("password is required"))?,
            download_root: self
                .download_root
                .ok_or_else(|| anyhow!("download_root is required"))?,
            login_url: self
                .login_url
                .ok_or_else(|| anyhow!("login_url is required"))?,
            inventory_url: self
                .inventory_url
                .ok_or_else(|| anyhow!("inventory_url is required"))?,
            headless: self.headless,
            block_resources: self.block_resources,
            max_downloads: self.max_downloads,
            concurrent_contexts: self.concurrent_contexts,
            task_timeout_secs: self.task_timeout_secs,
            stuck_threshold_secs: self.stuck_threshold_secs,
            watchdog_interval_secs: self.watchdog_interval_secs,
            max_retries: self.max_retries,
            reference_column: self.reference_column,
        })
    }
}
