//! Blob store API - the only entry point clients call.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::storage::{
    persist, ContentRef, ContentStorage, Namespace, ObjectId, ObjectMetadata, StorageError,
    StoreMetadata, VersionEntry,
};
use crate::store::config::{DataDirProvider, StoreConfig};
use crate::store::error::{BlobStoreError, BlobStoreResult};

/// A local, versioned blob store.
///
/// Every operation runs under one lock, mutates the in-memory metadata and
/// writes the metadata file before returning. Clone the handle to share it
/// between threads.
#[derive(Clone)]
pub struct BlobStore {
    inner: Arc<BlobStoreInner>,
}

struct BlobStoreInner {
    config: StoreConfig,
    metadata_path: PathBuf,
    content: ContentStorage,
    metadata: Mutex<StoreMetadata>,
}

/// Counts over the whole store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub namespaces: usize,
    pub objects: usize,
    pub versions: usize,
    /// Sum of the recorded sizes of all versions.
    pub total_bytes: u64,
}

/// A version as seen by [`BlobStore::verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencedContent {
    pub namespace: Namespace,
    pub id: ObjectId,
    pub version: i64,
    pub content: ContentRef,
}

/// Result of comparing the metadata against the base directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// Content files no version refers to.
    pub orphaned: Vec<ContentRef>,
    /// Versions whose content file is gone.
    pub missing: Vec<ReferencedContent>,
    /// Versions whose file size differs from the recorded size.
    pub size_mismatch: Vec<ReferencedContent>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.orphaned.is_empty() && self.missing.is_empty() && self.size_mismatch.is_empty()
    }
}

impl BlobStore {
    /// Open the store under the host's data directory with default settings.
    pub fn open_in<P: DataDirProvider + ?Sized>(provider: &P) -> BlobStoreResult<Self> {
        Self::open(StoreConfig::from_provider(provider))
    }

    /// Open the store, creating it if its directory does not exist yet.
    ///
    /// A missing base directory means a fresh install: the directory and an
    /// empty metadata file are created. Otherwise the metadata file must be
    /// present and readable. Either failure is returned as
    /// [`BlobStoreError::Init`].
    pub fn open(config: StoreConfig) -> BlobStoreResult<Self> {
        config.validate()?;

        let base_dir = config.base_dir();
        let metadata_path = config.metadata_path();

        let exists = base_dir.try_exists().map_err(|e| BlobStoreError::Init {
            path: base_dir.clone(),
            source: StorageError::io(&base_dir, e),
        })?;

        let metadata = if exists {
            Self::load_existing(&metadata_path)
        } else {
            Self::fresh_install(&base_dir, &metadata_path, config.sync)
        }
        .map_err(|source| BlobStoreError::Init {
            path: base_dir.clone(),
            source,
        })?;

        Ok(Self {
            inner: Arc::new(BlobStoreInner {
                content: ContentStorage::new(&base_dir, config.sync),
                config,
                metadata_path,
                metadata: Mutex::new(metadata),
            }),
        })
    }

    fn fresh_install(
        base_dir: &Path,
        metadata_path: &Path,
        sync: bool,
    ) -> Result<StoreMetadata, StorageError> {
        fs::create_dir_all(base_dir).map_err(|e| StorageError::io(base_dir, e))?;

        let metadata = StoreMetadata::new();
        persist::save(&metadata, metadata_path, sync)?;

        info!(path = %base_dir.display(), "created new blob store");
        Ok(metadata)
    }

    fn load_existing(metadata_path: &Path) -> Result<StoreMetadata, StorageError> {
        let metadata = persist::load(metadata_path)?;
        info!(
            path = %metadata_path.display(),
            version = metadata.version(),
            namespaces = metadata.namespaces().count(),
            "loaded blob store metadata"
        );
        Ok(metadata)
    }

    /// Directory holding the metadata file and content files.
    pub fn base_dir(&self) -> &Path {
        self.inner.content.base_dir()
    }

    pub fn metadata_path(&self) -> &Path {
        &self.inner.metadata_path
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    // ==================== Mutations ====================

    /// Store a new version of an object.
    ///
    /// Fails with [`BlobStoreError::DuplicateVersion`] if the version is
    /// already present; existing versions are never overwritten.
    pub fn store(
        &self,
        namespace: &str,
        id: &str,
        version: i64,
        content: &[u8],
    ) -> BlobStoreResult<()> {
        let namespace = Namespace::new(namespace)?;
        let id = ObjectId::new(id)?;

        let mut metadata = self.inner.metadata.lock();

        if metadata
            .object(&namespace, &id)
            .is_some_and(|object| object.contains_version(version))
        {
            return Err(BlobStoreError::DuplicateVersion { namespace, id, version });
        }

        let reference = ContentRef::generate(&namespace);
        if let Err(source) = self.inner.content.write(&reference, content) {
            return Err(BlobStoreError::Content { namespace, id, version, source });
        }

        let created_namespace = !metadata.contains_namespace(&namespace);
        let namespace_meta = metadata.get_or_create_namespace(&namespace);
        let created_object = !namespace_meta.contains_object(&id);
        namespace_meta
            .get_or_create_object(&id)
            .create_content(version, VersionEntry::new(reference.clone(), content.len() as u64));

        if let Err(err) = self.save(&metadata) {
            // undo the in-memory insert so memory matches the file on disk
            if created_namespace {
                metadata.remove_namespace(&namespace);
            } else if created_object {
                if let Some(ns) = metadata.namespace_mut(&namespace) {
                    ns.remove_object(&id);
                }
            } else if let Some(object) = metadata.object_mut(&namespace, &id) {
                object.remove_version(version);
            }

            if let Err(cleanup) = self.inner.content.remove(&reference) {
                warn!(
                    content = %reference,
                    error = %cleanup,
                    "failed to remove content after metadata save failure"
                );
            }
            return Err(err);
        }

        debug!(
            %namespace,
            %id,
            version,
            size = content.len(),
            content = %reference,
            "stored version"
        );
        Ok(())
    }

    /// Store UTF-8 text.
    pub fn store_str(
        &self,
        namespace: &str,
        id: &str,
        version: i64,
        content: &str,
    ) -> BlobStoreResult<()> {
        self.store(namespace, id, version, content.as_bytes())
    }

    /// Delete one version and its content file.
    ///
    /// The metadata is saved before the file is removed. A removal failure,
    /// including a file that is already gone, is returned as
    /// [`BlobStoreError::Content`] while the version stays deleted.
    pub fn delete(&self, namespace: &str, id: &str, version: i64) -> BlobStoreResult<()> {
        let namespace = Namespace::new(namespace)?;
        let id = ObjectId::new(id)?;

        let mut metadata = self.inner.metadata.lock();

        let removed = resolve_mut(&mut metadata, &namespace, &id)?.remove_version(version);
        let Some(entry) = removed else {
            return Err(BlobStoreError::VersionNotFound { namespace, id, version });
        };

        if let Err(err) = self.save(&metadata) {
            if let Some(object) = metadata.object_mut(&namespace, &id) {
                object.create_content(version, entry);
            }
            return Err(err);
        }

        if let Err(source) = self.inner.content.remove(&entry.content) {
            warn!(
                %namespace,
                %id,
                version,
                content = %entry.content,
                error = %source,
                "version deleted but content file removal failed"
            );
            return Err(BlobStoreError::Content { namespace, id, version, source });
        }

        debug!(%namespace, %id, version, content = %entry.content, "deleted version");
        Ok(())
    }

    // ==================== Queries ====================

    /// Read the bytes of one version.
    pub fn retrieve(&self, namespace: &str, id: &str, version: i64) -> BlobStoreResult<Vec<u8>> {
        let namespace = Namespace::new(namespace)?;
        let id = ObjectId::new(id)?;
        self.read_version(namespace, id, version)
    }

    /// Read one version as UTF-8 text.
    pub fn retrieve_string(
        &self,
        namespace: &str,
        id: &str,
        version: i64,
    ) -> BlobStoreResult<String> {
        let namespace = Namespace::new(namespace)?;
        let id = ObjectId::new(id)?;

        let bytes = self.read_version(namespace.clone(), id.clone(), version)?;
        String::from_utf8(bytes).map_err(|_| BlobStoreError::NotUtf8 { namespace, id, version })
    }

    fn read_version(
        &self,
        namespace: Namespace,
        id: ObjectId,
        version: i64,
    ) -> BlobStoreResult<Vec<u8>> {
        let metadata = self.inner.metadata.lock();
        let entry = resolve(&metadata, &namespace, &id)?
            .entry(version)
            .ok_or_else(|| BlobStoreError::VersionNotFound {
                namespace: namespace.clone(),
                id: id.clone(),
                version,
            })?;

        // the lock is held so a concurrent delete cannot remove the file mid-read
        self.inner
            .content
            .read(&entry.content)
            .map_err(|source| BlobStoreError::Content { namespace, id, version, source })
    }

    /// Highest stored version of an object.
    pub fn latest_version(&self, namespace: &str, id: &str) -> BlobStoreResult<i64> {
        let namespace = Namespace::new(namespace)?;
        let id = ObjectId::new(id)?;

        let metadata = self.inner.metadata.lock();
        match resolve(&metadata, &namespace, &id)?.latest_version() {
            Some(version) => Ok(version),
            None => Err(BlobStoreError::NoVersions { namespace, id }),
        }
    }

    /// Recorded size and store time of one version.
    pub fn version_entry(
        &self,
        namespace: &str,
        id: &str,
        version: i64,
    ) -> BlobStoreResult<VersionEntry> {
        let namespace = Namespace::new(namespace)?;
        let id = ObjectId::new(id)?;

        let metadata = self.inner.metadata.lock();
        match resolve(&metadata, &namespace, &id)?.entry(version) {
            Some(entry) => Ok(entry.clone()),
            None => Err(BlobStoreError::VersionNotFound { namespace, id, version }),
        }
    }

    /// Whether the namespace contains the id. Never fails; malformed names
    /// simply do not exist.
    pub fn exists(&self, namespace: &str, id: &str) -> bool {
        let (Ok(namespace), Ok(id)) = (Namespace::new(namespace), ObjectId::new(id)) else {
            return false;
        };
        self.inner.metadata.lock().object(&namespace, &id).is_some()
    }

    /// All stored versions of an object, empty if it does not exist.
    pub fn all_versions(&self, namespace: &str, id: &str) -> BTreeSet<i64> {
        let (Ok(namespace), Ok(id)) = (Namespace::new(namespace), ObjectId::new(id)) else {
            return BTreeSet::new();
        };
        self.inner
            .metadata
            .lock()
            .object(&namespace, &id)
            .map(ObjectMetadata::all_versions)
            .unwrap_or_default()
    }

    /// All namespaces, sorted.
    pub fn namespaces(&self) -> Vec<Namespace> {
        self.inner
            .metadata
            .lock()
            .namespaces()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// All object ids in a namespace, sorted.
    pub fn objects(&self, namespace: &str) -> BlobStoreResult<Vec<ObjectId>> {
        let namespace = Namespace::new(namespace)?;
        let metadata = self.inner.metadata.lock();
        let ns = metadata
            .namespace(&namespace)
            .ok_or_else(|| BlobStoreError::NamespaceNotFound(namespace.clone()))?;
        Ok(ns.objects().map(|(id, _)| id.clone()).collect())
    }

    /// Get store statistics.
    pub fn stats(&self) -> StoreStats {
        let metadata = self.inner.metadata.lock();
        let mut stats = StoreStats::default();
        for (_, ns) in metadata.namespaces() {
            stats.namespaces += 1;
            stats.objects += ns.len();
            for (_, object) in ns.objects() {
                stats.versions += object.len();
                stats.total_bytes += object.entries().map(|(_, entry)| entry.size).sum::<u64>();
            }
        }
        stats
    }

    /// Compare the metadata with the content files on disk.
    ///
    /// Read-only: nothing is repaired.
    pub fn verify(&self) -> BlobStoreResult<ConsistencyReport> {
        let metadata = self.inner.metadata.lock();
        let mut on_disk: BTreeSet<ContentRef> = self.inner.content.list()?.into_iter().collect();
        let mut report = ConsistencyReport::default();

        for (namespace, ns) in metadata.namespaces() {
            for (id, object) in ns.objects() {
                for (version, entry) in object.entries() {
                    let referenced = ReferencedContent {
                        namespace: namespace.clone(),
                        id: id.clone(),
                        version,
                        content: entry.content.clone(),
                    };
                    on_disk.remove(&entry.content);
                    match self.inner.content.size_of(&entry.content)? {
                        None => report.missing.push(referenced),
                        Some(size) if size != entry.size => report.size_mismatch.push(referenced),
                        Some(_) => {}
                    }
                }
            }
        }

        report.orphaned = on_disk.into_iter().collect();
        if !report.is_consistent() {
            warn!(
                orphaned = report.orphaned.len(),
                missing = report.missing.len(),
                size_mismatch = report.size_mismatch.len(),
                "blob store metadata and content files disagree"
            );
        }
        Ok(report)
    }

    fn save(&self, metadata: &StoreMetadata) -> BlobStoreResult<()> {
        persist::save(metadata, &self.inner.metadata_path, self.inner.config.sync)?;
        Ok(())
    }
}

fn resolve<'a>(
    metadata: &'a StoreMetadata,
    namespace: &Namespace,
    id: &ObjectId,
) -> BlobStoreResult<&'a ObjectMetadata> {
    let ns = metadata
        .namespace(namespace)
        .ok_or_else(|| BlobStoreError::NamespaceNotFound(namespace.clone()))?;
    ns.object(id).ok_or_else(|| BlobStoreError::ObjectNotFound {
        namespace: namespace.clone(),
        id: id.clone(),
    })
}

fn resolve_mut<'a>(
    metadata: &'a mut StoreMetadata,
    namespace: &Namespace,
    id: &ObjectId,
) -> BlobStoreResult<&'a mut ObjectMetadata> {
    let ns = metadata
        .namespace_mut(namespace)
        .ok_or_else(|| BlobStoreError::NamespaceNotFound(namespace.clone()))?;
    ns.object_mut(id).ok_or_else(|| BlobStoreError::ObjectNotFound {
        namespace: namespace.clone(),
        id: id.clone(),
    })
}
