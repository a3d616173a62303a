//! Error types for the rating tool.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, RaterError>;

/// Errors that can occur while preparing or running a rating session.
#[derive(Error, Debug)]
pub enum RaterError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An input fact source is missing or unreadable. Fatal at session
    /// start: the session never begins with partial data.
    #[error("Fact source unavailable at '{path}': {source}")]
    DataSourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An input record is structurally invalid (missing fields, wrong types,
    /// or a duplicated join key). Never coerced to defaults.
    #[error("Malformed record in '{path}': {detail}")]
    MalformedRecord { path: PathBuf, detail: String },

    /// The prepared session would contain no units.
    #[error("Sampling produced no questions ({joined} joined, fraction {fraction})")]
    EmptySample { joined: usize, fraction: f64 },

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The results file does not exist.
    #[error("Results file not found at '{0}'")]
    ResultsNotFound(PathBuf),

    /// The session snapshot file does not exist.
    #[error("Session snapshot not found at '{0}'")]
    SnapshotNotFound(PathBuf),

    /// An input event referenced a fact the current unit does not have.
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),
}

impl RaterError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a malformed-record error with path context.
    pub fn malformed(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::MalformedRecord {
            path: path.into(),
            detail: detail.into(),
        }
    }
}
