use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LauncherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Archive error: {0}")]
    Archive(String),
    #[error("Content length unavailable: {0}")]
    SizeUnknown(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Download cancelled")]
    Cancelled,
}

impl LauncherError {
    /// True when the error represents a user-requested cancellation rather
    /// than a genuine failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LauncherError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, LauncherError>;
