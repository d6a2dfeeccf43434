//! Browser session bring-up: the strictly-serialized sequence that
//! produces an authenticated context with N ready worker pages.
//!
//! Per the component design, logging in from more than one context is
//! forbidden — the target site enforces a single active session — so
//! this whole sequence runs once, before any worker starts.

use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::network::SetBlockedUrLsParams;
use chromiumoxide::{Browser, Page};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::browser_profile::create_unique_profile;
use crate::browser_setup::launch_browser;
use crate::config::HarvestConfig;
use crate::engine::site;
use crate::error::EngineError;

/// URL glob patterns blocked when `block_resources` is enabled, covering
/// the static-asset kinds a PDF-harvesting run never needs to render.
const BLOCKED_URL_PATTERNS: &[&str] = &[
    "*.png", "*.jpg", "*.jpeg", "*.gif", "*.webp", "*.svg", "*.ico",
    "*.css", "*.woff", "*.woff2", "*.ttf", "*.otf", "*.eot",
    "*.mp4", "*.webm", "*.mp3", "*.ogg",
];

/// The live result of bring-up: the browser, its owned worker pages
/// (`pages[0]` already consumed for login, `pages[1..]` idle and
/// authenticated), and the handles needed to tear everything down.
pub struct BrowserSession {
    pub browser: Arc<Browser>,
    pub pages: Vec<Page>,
    pub profile_dir: PathBuf,
    handler_task: JoinHandle<()>,
}

impl BrowserSession {
    /// Run the full bring-up sequence: launch, optionally install the
    /// resource blocker, log in on `P0`, export the inventory, then open
    /// the remaining worker pages.
    pub async fn bring_up(
        config: &HarvestConfig,
        inventory_csv_path: &std::path::Path,
    ) -> Result<Self> {
        let profile = create_unique_profile().context("creating Chrome profile directory")?;
        let profile_dir = profile.path().to_path_buf();

        let (browser, handler_task, _user_data_dir) =
            launch_browser(config.headless(), Some(profile_dir.clone()))
                .await
                .map_err(|e| EngineError::BrowserLaunchFailed(e.to_string()))?;
        profile.into_path();
        let browser = Arc::new(browser);

        let p0 = browser
            .new_page("about:blank")
            .await
            .map_err(|e| EngineError::BrowserLaunchFailed(e.to_string()))?;
        if config.block_resources() {
            block_resources(&p0).await?;
        }

        info!("navigating to login page");
        p0.goto(config.login_url())
            .await
            .map_err(|e| EngineError::LoginFailed(e.to_string()))?;
        p0.wait_for_navigation()
            .await
            .map_err(|e| EngineError::LoginFailed(e.to_string()))?;

        site::login(&p0, config.username(), config.password())
            .await
            .map_err(|e| EngineError::LoginFailed(e.to_string()))?;
        site::accept_license_if_present(&p0)
            .await
            .map_err(|e| EngineError::LoginFailed(e.to_string()))?;

        site::open_inventory(&p0, config.inventory_url())
            .await
            .map_err(|e| EngineError::LoginFailed(e.to_string()))?;

        configure_download_directory(&p0, inventory_csv_path)
            .await
            .map_err(|e| EngineError::InventoryExportFailed(e.to_string()))?;
        export_inventory(&p0, inventory_csv_path)
            .await
            .map_err(|e| EngineError::InventoryExportFailed(e.to_string()))?;

        let mut pages = vec![p0];
        for i in 1..config.concurrent_contexts() {
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| EngineError::BrowserLaunchFailed(e.to_string()))?;
            if config.block_resources() {
                block_resources(&page).await?;
            }
            site::open_inventory(&page, config.inventory_url())
                .await
                .map_err(|e| EngineError::BrowserLaunchFailed(e.to_string()))?;
            info!(worker_id = i, "worker page ready");
            pages.push(page);
        }

        Ok(Self {
            browser,
            pages,
            profile_dir,
            handler_task,
        })
    }

    /// Close the context, stop the handler task, and remove the Chrome
    /// profile directory. Workers hold their own `Arc<Browser>` clone for
    /// the lifetime of their processing loop; callers must join every
    /// worker before calling this so the graceful close below actually
    /// gets exclusive access.
    pub async fn shutdown(self) -> Result<()> {
        match Arc::try_unwrap(self.browser) {
            Ok(mut browser) => {
                if let Err(e) = browser.close().await {
                    warn!("failed to close browser cleanly: {e}");
                }
                if let Err(e) = browser.wait().await {
                    warn!("failed waiting for browser exit: {e}");
                }
            }
            Err(_) => {
                warn!("browser still has outstanding references at shutdown; skipping graceful close");
            }
        }

        self.handler_task.abort();

        if let Err(e) = std::fs::remove_dir_all(&self.profile_dir) {
            warn!(
                "failed to remove Chrome profile directory {}: {e}",
                self.profile_dir.display()
            );
        }

        Ok(())
    }
}

/// Abort image/stylesheet/font/media requests on `page`, for throughput.
async fn block_resources(page: &Page) -> Result<()> {
    let patterns = BLOCKED_URL_PATTERNS
        .iter()
        .map(|p| (*p).to_string())
        .collect();
    page.execute(SetBlockedUrLsParams::new(patterns))
        .await
        .context("installing blocked-resource URL patterns")?;
    Ok(())
}

/// Point the browser's download behavior at `destination`'s parent
/// directory, so the inventory export lands in `run_data/` directly
/// instead of the platform's default downloads folder.
async fn configure_download_directory(page: &Page, destination: &std::path::Path) -> Result<()> {
    let dir = destination
        .parent()
        .ok_or_else(|| anyhow::anyhow!("inventory CSV destination has no parent directory"))?;
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("creating download directory {}", dir.display()))?;

    page.execute(
        SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(dir.to_string_lossy().to_string())
            .build()
            .map_err(|e| anyhow::anyhow!("building download behavior params: {e}"))?,
    )
    .await
    .context("configuring browser download behavior")?;

    Ok(())
}

/// Trigger the inventory export and wait for the resulting CSV to land in
/// `destination`'s directory, then rename it to `destination`.
///
/// `SetDownloadBehavior` only pins the download *directory* — Chrome still
/// names the file from the response's `Content-Disposition` header (or the
/// triggering anchor's `download` attribute), so the export does not land
/// at a filename this module controls. This snapshots the directory before
/// the click and polls for whichever new `.csv` entry shows up afterward,
/// skipping Chrome's `.crdownload` partial-download marker.
async fn export_inventory(page: &Page, destination: &std::path::Path) -> Result<()> {
    let dir = destination
        .parent()
        .ok_or_else(|| anyhow::anyhow!("inventory CSV destination has no parent directory"))?;
    let known = snapshot_dir_entries(dir).await?;

    site::trigger_inventory_export(page).await?;

    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(30);
    loop {
        if let Some(downloaded) = find_new_csv(dir, &known).await? {
            tokio::fs::rename(&downloaded, destination)
                .await
                .with_context(|| {
                    format!(
                        "renaming downloaded inventory {} to {}",
                        downloaded.display(),
                        destination.display()
                    )
                })?;
            return Ok(());
        }

        if tokio::time::Instant::now() >= deadline {
            return Err(anyhow::anyhow!(
                "inventory export did not produce a CSV file under {} within 30s",
                dir.display()
            ));
        }
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    }
}

/// List `dir`'s current entries, to diff against after the export click.
async fn snapshot_dir_entries(
    dir: &std::path::Path,
) -> Result<std::collections::HashSet<std::path::PathBuf>> {
    let mut read_dir = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("listing directory {}", dir.display()))?;
    let mut seen = std::collections::HashSet::new();
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .with_context(|| format!("reading entries of {}", dir.display()))?
    {
        seen.insert(entry.path());
    }
    Ok(seen)
}

/// Find a `.csv` file in `dir` that wasn't present in `known` and isn't
/// still an in-progress `.crdownload` partial.
async fn find_new_csv(
    dir: &std::path::Path,
    known: &std::collections::HashSet<std::path::PathBuf>,
) -> Result<Option<std::path::PathBuf>> {
    let mut read_dir = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("listing directory {}", dir.display()))?;
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .with_context(|| format!("reading entries of {}", dir.display()))?
    {
        let path = entry.path();
        if known.contains(&path) {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        if path.with_extension("csv.crdownload").exists() {
            continue;
        }
        return Ok(Some(path));
    }
    Ok(None)
}
