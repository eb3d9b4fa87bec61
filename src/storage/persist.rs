//! Metadata file persistence.
//!
//! `save` writes the whole tree to a temporary file next to the target,
//! flushes it, then renames it over the metadata file. A crash mid-save
//! leaves either the previous file or the new one, never a truncated mix.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::metadata::{StoreMetadata, SCHEMA_VERSION};

/// Serialize `metadata` to `path`, replacing any existing file atomically.
///
/// With `sync` set the temporary file is fsynced before the rename and the
/// directory is fsynced after it, so the rename itself is durable.
pub fn save(metadata: &StoreMetadata, path: &Path, sync: bool) -> StorageResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let tmp = NamedTempFile::new_in(dir).map_err(|e| StorageError::io(dir, e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer_pretty(&mut writer, metadata)?;
        writer.flush().map_err(|e| StorageError::io(tmp.path(), e))?;
    }
    if sync {
        tmp.as_file()
            .sync_all()
            .map_err(|e| StorageError::io(tmp.path(), e))?;
    }

    tmp.persist(path)
        .map_err(|e| StorageError::io(path, e.error))?;
    if sync {
        sync_dir(dir).map_err(|e| StorageError::io(dir, e))?;
    }

    debug!(
        path = %path.display(),
        namespaces = metadata.namespaces().count(),
        "metadata saved"
    );
    Ok(())
}

/// Flush a directory entry so a rename or create inside it survives a
/// power loss.
#[cfg(unix)]
pub(crate) fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
pub(crate) fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Load metadata from `path`.
///
/// Fails if the file is missing, unreadable, not valid JSON for the schema,
/// or written by a newer schema version.
pub fn load(path: &Path) -> StorageResult<StoreMetadata> {
    let file = File::open(path).map_err(|e| StorageError::io(path, e))?;
    let metadata: StoreMetadata = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        if e.is_io() {
            StorageError::io(path, e.into())
        } else {
            StorageError::CorruptedData {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        }
    })?;

    if metadata.version() > SCHEMA_VERSION {
        return Err(StorageError::UnsupportedSchema {
            found: metadata.version(),
            supported: SCHEMA_VERSION,
        });
    }

    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::storage::metadata::VersionEntry;
    use crate::storage::types::{ContentRef, Namespace, ObjectId};

    fn sample() -> StoreMetadata {
        let mut meta = StoreMetadata::new();
        let ns = Namespace::new("jobs").unwrap();
        let object = meta
            .get_or_create_namespace(&ns)
            .get_or_create_object(&ObjectId::new("report").unwrap());
        object.create_content(1, VersionEntry::new(ContentRef::generate(&ns), 10));
        object.create_content(5, VersionEntry::new(ContentRef::generate(&ns), 20));
        meta
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metadata.json");
        let meta = sample();

        save(&meta, &path, true).unwrap();
        assert_eq!(load(&path).unwrap(), meta);
    }

    #[test]
    fn test_synced_save_replaces_in_nested_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("store");
        fs::create_dir(&nested).unwrap();
        let path = nested.join("metadata.json");

        save(&StoreMetadata::new(), &path, true).unwrap();
        let meta = sample();
        save(&meta, &path, true).unwrap();

        assert_eq!(load(&path).unwrap(), meta);
        assert_eq!(fs::read_dir(&nested).unwrap().count(), 1);
        sync_dir(&nested).unwrap();
    }

    #[test]
    fn test_save_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metadata.json");

        save(&sample(), &path, false).unwrap();
        save(&StoreMetadata::new(), &path, false).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.namespaces().count(), 0);

        // no temporary files left behind
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load(&dir.path().join("nope.json")).unwrap_err();
        assert!(err.is_missing_file());
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metadata.json");

        fs::write(&path, b"{\"version\": 1, \"namespaces\": {").unwrap();
        assert!(matches!(load(&path), Err(StorageError::CorruptedData { .. })));

        fs::write(&path, b"[]").unwrap();
        assert!(matches!(load(&path), Err(StorageError::CorruptedData { .. })));
    }

    #[test]
    fn test_load_rejects_bad_names() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metadata.json");
        let json = r#"{
            "version": 1,
            "namespaces": {
                "jobs": { "objects": { "a": { "versions": {
                    "1": { "content": "../escape", "size": 1, "stored_at": "2024-01-01T00:00:00Z" }
                } } } }
            }
        }"#;
        fs::write(&path, json).unwrap();
        assert!(matches!(load(&path), Err(StorageError::CorruptedData { .. })));
    }

    #[test]
    fn test_load_newer_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metadata.json");
        fs::write(&path, br#"{"version": 99, "namespaces": {}}"#).unwrap();

        assert!(matches!(
            load(&path),
            Err(StorageError::UnsupportedSchema { found: 99, supported: SCHEMA_VERSION })
        ));
    }
}
