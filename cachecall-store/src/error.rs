use bincode::error::{DecodeError, EncodeError};
use feoxdb::FeoxError;
use thiserror::Error;

/// Errors that can occur when reading from or writing to a [`Store`](crate::Store).
#[derive(Debug, Error)]
pub enum StoreError {
    /// An error from the underlying FeOxDB database.
    #[error("FeOxDB error: {0}")]
    FeOxDb(#[from] FeoxError),

    /// Failed to serialize a stored response.
    #[error("Serialization error: {0}")]
    Serialization(#[from] EncodeError),

    /// Failed to deserialize a stored response.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] DecodeError),

    /// An I/O error occurred while accessing the cache directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking database task panicked or was cancelled.
    #[error("Store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The provided configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
