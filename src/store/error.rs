//! Blob store error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::storage::{InvalidNameError, Namespace, ObjectId, StorageError};

/// Result type for blob store operations.
pub type BlobStoreResult<T> = Result<T, BlobStoreError>;

/// Errors returned by [`crate::BlobStore`].
#[derive(Debug, Error)]
pub enum BlobStoreError {
    /// Malformed namespace or id. Raised before any state is touched.
    #[error("invalid name: {0}")]
    InvalidName(#[from] InvalidNameError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("namespace not found: {0}")]
    NamespaceNotFound(Namespace),

    #[error("object not found: namespace={namespace}, id={id}")]
    ObjectNotFound { namespace: Namespace, id: ObjectId },

    #[error("version not found: namespace={namespace}, id={id}, version={version}")]
    VersionNotFound {
        namespace: Namespace,
        id: ObjectId,
        version: i64,
    },

    #[error("version already exists: namespace={namespace}, id={id}, version={version}")]
    DuplicateVersion {
        namespace: Namespace,
        id: ObjectId,
        version: i64,
    },

    /// The object exists but every version was deleted.
    #[error("object has no versions: namespace={namespace}, id={id}")]
    NoVersions { namespace: Namespace, id: ObjectId },

    #[error("content is not valid utf-8: namespace={namespace}, id={id}, version={version}")]
    NotUtf8 {
        namespace: Namespace,
        id: ObjectId,
        version: i64,
    },

    /// Content file I/O failed for a specific version.
    #[error("content error for namespace={namespace}, id={id}, version={version}: {source}")]
    Content {
        namespace: Namespace,
        id: ObjectId,
        version: i64,
        #[source]
        source: StorageError,
    },

    /// Metadata persistence or directory access failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The store could not start.
    #[error("cannot initialize blob store at {path}: {source}")]
    Init {
        path: PathBuf,
        #[source]
        source: StorageError,
    },
}

impl BlobStoreError {
    /// check if this error indicates the resource doesn't exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BlobStoreError::NamespaceNotFound(_)
                | BlobStoreError::ObjectNotFound { .. }
                | BlobStoreError::VersionNotFound { .. }
        )
    }

    /// check if this error is a conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, BlobStoreError::DuplicateVersion { .. })
    }

    /// check if this error is a caller bug rather than a store condition
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            BlobStoreError::InvalidName(_) | BlobStoreError::InvalidConfig(_)
        )
    }
}
