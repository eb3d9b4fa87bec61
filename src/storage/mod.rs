//! storage layer for the blob store
//!
//! Three pieces sit under the engine and never lock anything themselves:
//!
//! ```text
//!  ┌───────────────────────────────────────────────┐
//!  │                  BlobStore                    │
//!  │  (validation, locking, commit/rollback)       │
//!  └───────────────────────────────────────────────┘
//!          │                 │                 │
//!          ▼                 ▼                 ▼
//!   ┌────────────┐    ┌────────────┐    ┌────────────┐
//!   │  metadata  │    │  persist   │    │  content   │
//!   │ (in-memory │    │ (metadata  │    │ (one file  │
//!   │   tree)    │    │   .json)   │    │ per version│
//!   └────────────┘    └────────────┘    └────────────┘
//! ```

mod content;
mod error;
mod metadata;
pub mod persist;
mod types;

pub use content::ContentStorage;
pub use error::{StorageError, StorageResult};
pub use metadata::{NamespaceMetadata, ObjectMetadata, StoreMetadata, VersionEntry, SCHEMA_VERSION};
pub use types::{
    ContentRef, InvalidNameError, Namespace, ObjectId, CONTENT_SUFFIX, VALID_ID_PATTERN,
    VALID_NAMESPACE_PATTERN,
};
