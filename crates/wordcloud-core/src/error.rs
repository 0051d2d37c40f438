//! Error types for wordcloud-tools.

use thiserror::Error;

/// Main error type for word cloud operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem access failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Snapshot persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// A word referenced by an operation is not in the cloud
    #[error("Word '{0}' not found")]
    WordNotFound(String),

    /// A connection referenced by an operation is not in the cloud
    #[error("Connection '{from}' -> '{to}' not found")]
    ConnectionNotFound { from: String, to: String },

    /// Caller supplied an argument the operation cannot accept
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// True for errors that reject a mutation because of the current state
    /// (missing word or connection), as opposed to I/O or programming faults.
    pub fn is_state_conflict(&self) -> bool {
        matches!(
            self,
            Error::WordNotFound(_) | Error::ConnectionNotFound { .. }
        )
    }
}

/// Result type alias for word cloud operations.
pub type Result<T> = std::result::Result<T, Error>;
