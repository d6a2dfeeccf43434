//! Top-level error types for the harvesting engine.
//!
//! A small typed enum for the fatal failure modes callers need to branch
//! on, with everything else flowing through `anyhow::Error` at the call
//! sites that don't need to.

use thiserror::Error;

/// Fatal setup failures that abort a run before any reference is dispatched.
///
/// Per-reference failures are not represented here — they are recorded in
/// the tracking store and do not stop the run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("login failed: {0}")]
    LoginFailed(String),

    #[error("inventory export failed: {0}")]
    InventoryExportFailed(String),

    #[error("browser launch failed: {0}")]
    BrowserLaunchFailed(String),

    #[error("session lost and re-authentication failed: {0}")]
    SessionLost(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
