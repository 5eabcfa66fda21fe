//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
///
/// `Validation` and `NotFound` are returned by ledger mutations and leave the
/// in-memory ledger untouched. The remaining variants come from the storage
/// and replication edges and are normally logged rather than surfaced.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Replication error: {0}")]
    Replication(String),

    #[error("Unsupported snapshot version {version} (newest understood: {supported})")]
    UnsupportedSnapshot { version: u32, supported: u32 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ledger is shut down")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a replication error
    pub fn replication(msg: impl Into<String>) -> Self {
        Self::Replication(msg.into())
    }

    /// True for errors caused by caller input (bad values, unknown ids)
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_))
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
