//! Checkpoint storage errors.

use thiserror::Error;

/// Errors that can occur when reading or writing a checkpoint.
#[derive(Debug, Error)]
pub enum DbError {
    /// The checkpoint file could not be read or written.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The checkpoint file exists but does not hold a decimal number.
    #[error("data: {0}")]
    InvalidData(String),

    /// The chain name cannot be used as part of a file name.
    #[error("invalid chain name: {0:?}")]
    InvalidChainName(String),
}

/// Result type of every checkpoint operation.
pub type DbResult<T> = Result<T, DbError>;
