//! Environment-variable configuration loading.
//!
//! The GUI this engine was extracted from fills in a `HarvestConfigBuilder`
//! directly; the CLI binary in this crate instead reads `HARVEST_*`
//! environment variables so the engine can be driven headlessly (CI,
//! scheduled runs) without a form to fill in.

use anyhow::{Context, Result};
use std::path::PathBuf;

use super::builder::HarvestConfigBuilder;
use super::types::HarvestConfig;

fn env_var(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("missing required environment variable {name}"))
}

fn env_parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Build a [`HarvestConfig`] from `HARVEST_*` environment variables.
///
/// Required: `HARVEST_USERNAME`, `HARVEST_PASSWORD`, `HARVEST_LOGIN_URL`,
/// `HARVEST_INVENTORY_URL`. Everything else falls back to the defaults in
/// [`HarvestConfigBuilder::default`].
pub fn from_env() -> Result<HarvestConfig> {
    let username = env_var("HARVEST_USERNAME")?;
    let password = env_var("HARVEST_PASSWORD")?;
    let login_url = env_var("HARVEST_LOGIN_URL")?;
    let inventory_url = env_var("HARVEST_INVENTORY_URL")?;
    let download_root: PathBuf = std::env::var("HARVEST_DOWNLOAD_ROOT")
        .unwrap_or_else(|_| "downloads".to_string())
        .into();

    HarvestConfigBuilder::new()
        .credentials(username, password, download_root)?
        .target_urls(login_url, inventory_url)
        .headless(env_parse_or("HARVEST_HEADLESS", true))
        .block_resources(env_parse_or("HARVEST_BLOCK_RESOURCES", true))
        .max_downloads(env_parse_or("HARVEST_MAX_DOWNLOADS", 0usize))
        .concurrent_contexts(env_parse_or("HARVEST_CONCURRENT_CONTEXTS", 5usize))
        .task_timeout_secs(env_parse_or("HARVEST_TASK_TIMEOUT_SECONDS", 180u64))
        .stuck_threshold_secs(env_parse_or("HARVEST_STUCK_THRESHOLD_SECONDS", 300u64))
        .watchdog_interval_secs(env_parse_or("HARVEST_WATCHDOG_INTERVAL_SECONDS", 60u64))
        .max_retries(env_parse_or("HARVEST_MAX_RETRIES", 2u32))
        .reference_column(
            std::env::var("HARVEST_REFERENCE_COLUMN").unwrap_or_else(|_| "reference".to_string()),
        )
        .build()
}
