//! Error types for value construction and wire encoding.

use thiserror::Error;

/// Result type for type-level operations.
pub type TypesResult<T> = Result<T, TypesError>;

#[derive(Debug, Error)]
pub enum TypesError {
    #[error("invalid group id: {0:?}")]
    InvalidGroupId(String),

    #[error("invalid sound path: {0:?}")]
    InvalidPath(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
