//! Browser driver error types.

#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    /// A driver command did not complete within its budget. Raised both for
    /// Playwright-side `TimeoutError`s and for replies that never arrived.
    #[error("{action} timed out after {timeout_ms} ms")]
    Timeout { action: String, timeout_ms: u64 },

    #[error("driver error during {action}: {message}")]
    Driver { action: String, message: String },

    #[error("driver protocol error: {0}")]
    Protocol(String),

    #[error("browser runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("browser session is closed")]
    Closed,

    #[error("driver i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

impl BrowserError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<serde_json::Error> for BrowserError {
    fn from(error: serde_json::Error) -> Self {
        Self::Protocol(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BrowserError>;
