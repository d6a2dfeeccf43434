//! Bulk, resumable, parallel retrieval of per-reference PDF artifacts from
//! an authenticated web application whose only export path is a per-item
//! print/download action in the rendered UI.
//!
//! The crate root wires together the pieces documented in their own
//! modules: [`config`] for the typed, env-loadable run configuration,
//! [`browser_session`] for the single-login/N-tab browser bring-up,
//! [`engine`] for the task queue, worker loop, PDF critical section and
//! watchdog, [`tracking`] and [`metrics`] for the durable per-run stores,
//! and [`validator`] for the post-run attribution check.

pub mod browser_profile;
pub mod browser_session;
pub mod browser_setup;
pub mod config;
pub mod engine;
pub mod error;
pub mod inventory;
pub mod metrics;
pub mod report;
pub mod run_dir;
pub mod tracking;
pub mod utils;
pub mod validator;

pub use config::{HarvestConfig, HarvestConfigBuilder};
pub use engine::RunReport;
pub use error::{EngineError, EngineResult};
pub use run_dir::RunDirectory;

/// Run one full harvest against `config`, using (or creating) `run_dir`.
///
/// Thin wrapper around [`engine::run`] kept at the crate root so callers
/// embedding this crate as a library don't need to reach into `engine`
/// directly for the common case.
pub async fn harvest(config: HarvestConfig, run_dir: RunDirectory) -> anyhow::Result<RunReport> {
    engine::run(config, run_dir).await
}
