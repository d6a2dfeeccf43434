//! Shared atomic-write helper for the tracking and checkpoint stores.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Serialize `value` to pretty JSON and write it to `path` via
/// temp-file-write-sync-rename, so readers never observe a partial file.
pub fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(value).context("serializing to JSON")?;

    let temp_path = path.with_extension("json.tmp");
    let mut file = std::fs::File::create(&temp_path)
        .with_context(|| format!("creating temp file {}", temp_path.display()))?;
    file.write_all(json.as_bytes())
        .with_context(|| format!("writing temp file {}", temp_path.display()))?;
    file.sync_all()
        .with_context(|| format!("syncing temp file {}", temp_path.display()))?;

    std::fs::rename(&temp_path, path)
        .with_context(|| format!("renaming {} to {}", temp_path.display(), path.display()))?;

    Ok(())
}
