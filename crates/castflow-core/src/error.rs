//! Error types for upload jobs.

use castflow_browser::BrowserError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validate,
    Session,
    Open,
    Upload,
    FormFill,
    Readiness,
    Publish,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Session => "session",
            Self::Open => "open",
            Self::Upload => "upload",
            Self::FormFill => "form_fill",
            Self::Readiness => "readiness",
            Self::Publish => "publish",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("cookie file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read cookie file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cookie file {} is not valid JSON: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("{what} not found: {}", .path.display())]
    MissingFile { what: &'static str, path: PathBuf },

    #[error("invalid input `{field}`: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("{control} not found")]
    ControlNotFound { control: String },

    /// The platform itself reported that processing failed.
    #[error("{0}")]
    ProcessingFailed(String),

    #[error("timed out waiting for {what}")]
    Timeout { what: String },

    #[error("timed out waiting for {what} after {attempts} attempts")]
    PollExhausted { what: String, attempts: u32 },

    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),
}

impl UploadError {
    pub fn control(control: impl Into<String>) -> Self {
        Self::ControlNotFound {
            control: control.into(),
        }
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn timeout(what: impl Into<String>) -> Self {
        Self::Timeout { what: what.into() }
    }

    /// Convert a browser timeout into "control not found", keeping other
    /// browser failures as they are.
    pub fn missing_on_timeout(error: BrowserError, control: &str) -> Self {
        if error.is_timeout() {
            Self::control(control)
        } else {
            Self::Browser(error)
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::PollExhausted { .. })
    }
}

pub type Result<T> = std::result::Result<T, UploadError>;
