use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExpandifyError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A snippet or request failed validation. Nothing was written.
    #[error("Invalid snippet: {0}")]
    Validation(String),

    #[error("Invalid snippet index: {0}")]
    InvalidIndex(usize),

    #[error("Snippet with trigger '{0}' not found")]
    SnippetNotFound(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Keyboard controller error: {0}")]
    Injection(String),

    #[error("Keyboard error: {0}")]
    Keyboard(String),

    #[error("Active window query failed: {0}")]
    WindowQuery(String),

    #[error("Media error: {0}")]
    Media(String),

    #[error("Daemon already running with PID {0}")]
    DaemonAlreadyRunning(u32),

    #[error("Daemon is not running")]
    DaemonNotRunning,

    #[error("Invalid PID in daemon file")]
    InvalidPid,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Error: {0}")]
    Other(String),
}

impl ExpandifyError {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ExpandifyError::Validation(_) | ExpandifyError::InvalidIndex(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ExpandifyError>;
