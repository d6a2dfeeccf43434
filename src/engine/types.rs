//! Shared types for the engine module.

/// Why a worker's processing attempt for a reference failed, used only to
/// classify the terminal-failure list in the final report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The per-task deadline elapsed before the procedure finished.
    Timeout,
    /// A selector, popup, or navigation step failed within the deadline.
    TransientPageError,
    /// The page navigated to the login URL mid-procedure and
    /// re-authentication did not recover it.
    SessionLost,
    /// Anything else.
    Other,
}

impl FailureKind {
    /// Classify an error by message content into a coarse failure kind
    /// for reporting.
    #[must_use]
    pub fn classify(error: &anyhow::Error) -> Self {
        let msg = error.to_string().to_lowercase();
        if msg.contains("timeout") || msg.contains("timed out") {
            Self::Timeout
        } else if msg.contains("session") || msg.contains("logged out") || msg.contains("login") {
            Self::SessionLost
        } else if msg.contains("selector")
            || msg.contains("popup")
            || msg.contains("navigation")
            || msg.contains("not found")
        {
            Self::TransientPageError
        } else {
            Self::Other
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Timeout => "timeout",
            Self::TransientPageError => "transient page error",
            Self::SessionLost => "session lost",
            Self::Other => "other",
        };
        write!(f, "{s}")
    }
}
