//! In-memory metadata tree: store -> namespaces -> objects -> versions.
//!
//! Pure data. Locking and I/O belong to the engine; this module only keeps
//! the tree consistent with itself.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::types::{ContentRef, Namespace, ObjectId};

/// Current schema version of the metadata file.
pub const SCHEMA_VERSION: u32 = 1;

/// Root of the metadata tree.
///
/// Serialized form:
/// ```json
/// {
///   "version": 1,
///   "namespaces": {
///     "jobs": {
///       "objects": {
///         "report": {
///           "versions": {
///             "3": { "content": "jobs_01j...content", "size": 12, "stored_at": "..." }
///           }
///         }
///       }
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMetadata {
    version: u32,
    #[serde(default)]
    namespaces: BTreeMap<Namespace, NamespaceMetadata>,
}

impl Default for StoreMetadata {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreMetadata {
    /// empty metadata at the current schema version
    pub fn new() -> Self {
        Self {
            version: SCHEMA_VERSION,
            namespaces: BTreeMap::new(),
        }
    }

    /// schema version this tree was created or loaded with
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn namespace(&self, namespace: &Namespace) -> Option<&NamespaceMetadata> {
        self.namespaces.get(namespace)
    }

    pub fn namespace_mut(&mut self, namespace: &Namespace) -> Option<&mut NamespaceMetadata> {
        self.namespaces.get_mut(namespace)
    }

    pub fn get_or_create_namespace(&mut self, namespace: &Namespace) -> &mut NamespaceMetadata {
        self.namespaces.entry(namespace.clone()).or_default()
    }

    /// look up an object, `None` if either level is missing
    pub fn object(&self, namespace: &Namespace, id: &ObjectId) -> Option<&ObjectMetadata> {
        self.namespace(namespace)?.object(id)
    }

    pub fn object_mut(&mut self, namespace: &Namespace, id: &ObjectId) -> Option<&mut ObjectMetadata> {
        self.namespace_mut(namespace)?.object_mut(id)
    }

    pub fn contains_namespace(&self, namespace: &Namespace) -> bool {
        self.namespaces.contains_key(namespace)
    }

    /// namespaces in sorted order
    pub fn namespaces(&self) -> impl Iterator<Item = (&Namespace, &NamespaceMetadata)> {
        self.namespaces.iter()
    }

    pub(crate) fn remove_namespace(&mut self, namespace: &Namespace) -> Option<NamespaceMetadata> {
        self.namespaces.remove(namespace)
    }
}

/// Objects stored under one namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceMetadata {
    #[serde(default)]
    objects: BTreeMap<ObjectId, ObjectMetadata>,
}

impl NamespaceMetadata {
    pub fn object(&self, id: &ObjectId) -> Option<&ObjectMetadata> {
        self.objects.get(id)
    }

    pub fn object_mut(&mut self, id: &ObjectId) -> Option<&mut ObjectMetadata> {
        self.objects.get_mut(id)
    }

    pub fn get_or_create_object(&mut self, id: &ObjectId) -> &mut ObjectMetadata {
        self.objects.entry(id.clone()).or_default()
    }

    pub fn contains_object(&self, id: &ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    pub fn objects(&self) -> impl Iterator<Item = (&ObjectId, &ObjectMetadata)> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub(crate) fn remove_object(&mut self, id: &ObjectId) -> Option<ObjectMetadata> {
        self.objects.remove(id)
    }
}

/// Versions of a single object.
///
/// Version numbers are caller supplied and unique per object; an existing
/// version is never overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    #[serde(default)]
    versions: BTreeMap<i64, VersionEntry>,
}

impl ObjectMetadata {
    pub fn contains_version(&self, version: i64) -> bool {
        self.versions.contains_key(&version)
    }

    /// highest version present, `None` when the object has no versions
    pub fn latest_version(&self) -> Option<i64> {
        self.versions.keys().next_back().copied()
    }

    pub fn all_versions(&self) -> BTreeSet<i64> {
        self.versions.keys().copied().collect()
    }

    pub fn entry(&self, version: i64) -> Option<&VersionEntry> {
        self.versions.get(&version)
    }

    pub fn entries(&self) -> impl Iterator<Item = (i64, &VersionEntry)> {
        self.versions.iter().map(|(v, e)| (*v, e))
    }

    /// Record a new version.
    ///
    /// Returns `false` and leaves the object untouched if the version is
    /// already present.
    pub fn create_content(&mut self, version: i64, entry: VersionEntry) -> bool {
        match self.versions.entry(version) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
        }
    }

    pub fn remove_version(&mut self, version: i64) -> Option<VersionEntry> {
        self.versions.remove(&version)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// One stored version: where its bytes live plus bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    /// content file name inside the base directory
    pub content: ContentRef,
    /// byte length at store time
    pub size: u64,
    pub stored_at: DateTime<Utc>,
}

impl VersionEntry {
    pub fn new(content: ContentRef, size: u64) -> Self {
        Self {
            content,
            size,
            stored_at: Utc::now(),
        }
    }
}
