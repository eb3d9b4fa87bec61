//! The blob store engine.
//!
//! This module provides the public operation surface: open a store under a
//! data directory, then store, retrieve, delete and query versions.

mod api;
mod config;
mod error;

pub use api::{BlobStore, ConsistencyReport, ReferencedContent, StoreStats};
pub use config::{DataDirProvider, StoreConfig};
pub use error::{BlobStoreError, BlobStoreResult};
