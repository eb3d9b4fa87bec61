//! blobstore - a local, versioned blob store
//!
//! Content is stored under a `(namespace, id, version)` key. Each version's
//! bytes live in their own file; a single JSON metadata file indexes
//! namespaces, objects and versions. The store is embedded in-process and
//! serializes all operations behind one lock.
//!
//! # Example
//!
//! ```no_run
//! use blobstore::{BlobStore, StoreConfig};
//!
//! let store = BlobStore::open(StoreConfig::new("/var/lib/myapp")).unwrap();
//! store.store("pipelines", "offsets", 1, b"{\"offset\": 42}").unwrap();
//! assert_eq!(store.latest_version("pipelines", "offsets").unwrap(), 1);
//! let bytes = store.retrieve("pipelines", "offsets", 1).unwrap();
//! ```

pub mod storage;
pub mod store;

pub use storage::{Namespace, ObjectId, VALID_ID_PATTERN, VALID_NAMESPACE_PATTERN};
pub use store::{
    BlobStore, BlobStoreError, BlobStoreResult, ConsistencyReport, DataDirProvider, StoreConfig,
    StoreStats,
};
