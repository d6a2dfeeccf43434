//! Tests for the type-safe configuration builder pattern.

use pdf_harvester::config::HarvestConfigBuilder;
use tempfile::TempDir;

#[test]
fn builder_requires_credentials_and_target_urls() {
    let temp_dir = TempDir::new().unwrap();

    let config = HarvestConfigBuilder::new()
        .credentials("alice", "hunter2", temp_dir.path().to_path_buf())
        .unwrap()
        .target_urls("https://site.example/login", "https://site.example/inventory")
        .build()
        .unwrap();

    assert_eq!(config.username(), "alice");
    assert_eq!(config.login_url(), "https://site.example/login");
    assert_eq!(config.inventory_url(), "https://site.example/inventory");
    assert_eq!(config.download_root(), temp_dir.path());
}

#[test]
fn builder_optional_fields_have_spec_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = HarvestConfigBuilder::new()
        .credentials("alice", "hunter2", temp_dir.path().to_path_buf())
        .unwrap()
        .target_urls("https://site.example/login", "https://site.example/inventory")
        .build()
        .unwrap();

    assert!(config.headless());
    assert!(config.block_resources());
    assert_eq!(config.max_downloads(), 0);
    assert_eq!(config.concurrent_contexts(), 5);
    assert_eq!(config.task_timeout().as_secs(), 180);
    assert_eq!(config.stuck_threshold().as_secs(), 300);
    assert_eq!(config.watchdog_interval().as_secs(), 60);
    assert_eq!(config.max_retries(), 2);
    assert_eq!(config.reference_column(), "reference");
}

#[test]
fn builder_overrides_are_applied() {
    let temp_dir = TempDir::new().unwrap();
    let config = HarvestConfigBuilder::new()
        .credentials("alice", "hunter2", temp_dir.path().to_path_buf())
        .unwrap()
        .target_urls("https://site.example/login", "https://site.example/inventory")
        .headless(false)
        .block_resources(false)
        .max_downloads(100)
        .concurrent_contexts(7)
        .task_timeout_secs(60)
        .stuck_threshold_secs(120)
        .watchdog_interval_secs(30)
        .max_retries(5)
        .reference_column("ref_no")
        .build()
        .unwrap();

    assert!(!config.headless());
    assert!(!config.block_resources());
    assert_eq!(config.max_downloads(), 100);
    assert_eq!(config.concurrent_contexts(), 7);
    assert_eq!(config.task_timeout().as_secs(), 60);
    assert_eq!(config.stuck_threshold().as_secs(), 120);
    assert_eq!(config.watchdog_interval().as_secs(), 30);
    assert_eq!(config.max_retries(), 5);
    assert_eq!(config.reference_column(), "ref_no");
}

#[test]
fn concurrent_contexts_cannot_be_zero() {
    let temp_dir = TempDir::new().unwrap();
    let config = HarvestConfigBuilder::new()
        .credentials("alice", "hunter2", temp_dir.path().to_path_buf())
        .unwrap()
        .target_urls("https://site.example/login", "https://site.example/inventory")
        .concurrent_contexts(0)
        .build()
        .unwrap();

    // concurrent_contexts(0) clamps up to 1 rather than building an engine
    // that can never make progress.
    assert_eq!(config.concurrent_contexts(), 1);
}

#[test]
fn download_root_is_normalized_to_an_absolute_path() {
    let config = HarvestConfigBuilder::new()
        .credentials("alice", "hunter2", "relative_output")
        .unwrap()
        .target_urls("https://site.example/login", "https://site.example/inventory")
        .build()
        .unwrap();

    assert!(config.download_root().is_absolute());
}

#[test]
fn debug_output_redacts_password() {
    let temp_dir = TempDir::new().unwrap();
    let config = HarvestConfigBuilder::new()
        .credentials("alice", "super-secret", temp_dir.path().to_path_buf())
        .unwrap()
        .target_urls("https://site.example/login", "https://site.example/inventory")
        .build()
        .unwrap();

    let debug_str = format!("{config:?}");
    assert!(debug_str.contains("alice"));
    assert!(!debug_str.contains("super-secret"));
    assert!(debug_str.contains("<redacted>"));
}
