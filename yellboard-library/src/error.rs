//! Library error types.

use std::path::PathBuf;
use thiserror::Error;
use yellboard_types::TypesError;

/// Result type for library operations.
pub type LibraryResult<T> = Result<T, LibraryError>;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid clip path: {0:?}")]
    InvalidPath(String),

    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("listing error: {0}")]
    Listing(#[from] TypesError),
}

impl LibraryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the underlying cause is a missing file or directory.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}
