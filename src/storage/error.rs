//! Storage layer error types
//!
//! Errors raised by metadata persistence and content file access. The
//! engine wraps these in [`crate::store::BlobStoreError`].

use std::path::PathBuf;

use thiserror::Error;

use crate::storage::types::{ContentRef, InvalidNameError};

/// the main error type for storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// filesystem error on a specific path
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// a content file could not be written, read or removed
    #[error("content file {reference}: {source}")]
    Content {
        reference: ContentRef,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization or deserialization failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// the metadata file was written by a newer schema
    #[error("unsupported metadata schema version {found} (supported up to {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },

    /// data integrity check failed
    #[error("corrupted data at {path}: {reason}")]
    CorruptedData { path: PathBuf, reason: String },

    /// a name read back from disk failed validation
    #[error("invalid name: {0}")]
    InvalidName(#[from] InvalidNameError),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn content(reference: &ContentRef, source: std::io::Error) -> Self {
        StorageError::Content {
            reference: reference.clone(),
            source,
        }
    }

    /// check if this error means a file that should exist is missing
    pub fn is_missing_file(&self) -> bool {
        match self {
            StorageError::Io { source, .. } | StorageError::Content { source, .. } => {
                source.kind() == std::io::ErrorKind::NotFound
            }
            _ => false,
        }
    }
}

/// result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_missing_file_classification() {
        let missing = StorageError::io("/tmp/x", io::Error::from(io::ErrorKind::NotFound));
        assert!(missing.is_missing_file());

        let denied = StorageError::content(
            &ContentRef::from_file_name("a.content").unwrap(),
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(!denied.is_missing_file());

        let schema = StorageError::UnsupportedSchema { found: 9, supported: 1 };
        assert!(!schema.is_missing_file());
        assert!(schema.to_string().contains("9"));
    }
}
