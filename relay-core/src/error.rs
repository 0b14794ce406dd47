//! Error types for the relay pipeline

use thiserror::Error;

/// Result type for relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Relay errors
#[derive(Error, Debug)]
pub enum Error {
    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Transport error (connect/send failure)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Relay endpoint rejected the request
    #[error("Relay API error {status_code}: {message}")]
    RelayApi {
        /// HTTP status code
        status_code: u16,
        /// Response body (truncated)
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl Error {
    /// True for failures that warrant enqueue-and-retry (transport
    /// failures and non-2xx relay responses are handled identically).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::RelayApi { .. })
    }
}
