//! Error types and exit codes for orgmine

use std::process::ExitCode;
use thiserror::Error;

/// Main error type for orgmine operations
#[derive(Error, Debug)]
pub enum OrgMineError {
    #[error("Path not found: {path}")]
    PathNotFound { path: String },

    #[error("Unsupported metadata file: {path}")]
    UnsupportedMetadata { path: String },

    #[error("Failed to parse {file}: {reason}")]
    ParseFailure { file: String, reason: String },

    #[error("Invalid filter: {message}")]
    InvalidFilter { message: String },

    #[error("Daily cost limit reached (${limit:.2})")]
    CostLimitExceeded { limit: f64 },

    #[error("Semantic search unavailable: {message}")]
    ExternalUnavailable { message: String },

    #[error("Storage integrity violation: {message}")]
    StorageIntegrity { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrgMineError {
    /// Convert error to appropriate exit code:
    /// - 0: Success
    /// - 1: Path not found / IO error
    /// - 2: Unsupported metadata / invalid filter
    /// - 3: Parse failure
    /// - 4: Storage failure
    /// - 5: External service failure
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::PathNotFound { .. } => ExitCode::from(1),
            Self::Io(_) => ExitCode::from(1),
            Self::UnsupportedMetadata { .. } => ExitCode::from(2),
            Self::InvalidFilter { .. } => ExitCode::from(2),
            Self::ParseFailure { .. } => ExitCode::from(3),
            Self::Storage(_) => ExitCode::from(4),
            Self::StorageIntegrity { .. } => ExitCode::from(4),
            Self::Json(_) => ExitCode::from(4),
            Self::CostLimitExceeded { .. } => ExitCode::from(5),
            Self::ExternalUnavailable { .. } => ExitCode::from(5),
            Self::Http(_) => ExitCode::from(5),
        }
    }
}

/// Result type alias for orgmine operations
pub type Result<T> = std::result::Result<T, OrgMineError>;
