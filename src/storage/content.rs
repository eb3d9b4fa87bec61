//! Content files: one flat file per stored version inside the base directory.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::persist::sync_dir;
use crate::storage::types::{ContentRef, CONTENT_SUFFIX};

/// Whole-file access to content files under a base directory.
#[derive(Debug, Clone)]
pub struct ContentStorage {
    base_dir: PathBuf,
    sync: bool,
}

impl ContentStorage {
    pub fn new(base_dir: impl Into<PathBuf>, sync: bool) -> Self {
        Self {
            base_dir: base_dir.into(),
            sync,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// full path of a content file
    pub fn path_of(&self, reference: &ContentRef) -> PathBuf {
        self.base_dir.join(reference.as_str())
    }

    /// Create a new content file. Fails if the file already exists.
    ///
    /// A file that cannot be filled completely is removed again, so a failed
    /// write never leaves a partial file behind.
    pub fn write(&self, reference: &ContentRef, bytes: &[u8]) -> StorageResult<()> {
        self.write_with(reference, |file| file.write_all(bytes))
    }

    fn write_with<F>(&self, reference: &ContentRef, fill: F) -> StorageResult<()>
    where
        F: FnOnce(&mut File) -> io::Result<()>,
    {
        let path = self.path_of(reference);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| StorageError::content(reference, e))?;

        let filled = fill(&mut file).and_then(|()| {
            if self.sync {
                file.sync_all()?;
                sync_dir(&self.base_dir)?;
            }
            Ok(())
        });

        if let Err(e) = filled {
            drop(file);
            if let Err(cleanup) = fs::remove_file(&path) {
                warn!(
                    content = %reference,
                    error = %cleanup,
                    "failed to remove partially written content file"
                );
            }
            return Err(StorageError::content(reference, e));
        }
        Ok(())
    }

    pub fn read(&self, reference: &ContentRef) -> StorageResult<Vec<u8>> {
        fs::read(self.path_of(reference)).map_err(|e| StorageError::content(reference, e))
    }

    pub fn remove(&self, reference: &ContentRef) -> StorageResult<()> {
        fs::remove_file(self.path_of(reference)).map_err(|e| StorageError::content(reference, e))
    }

    /// size on disk, `None` if the file does not exist
    pub fn size_of(&self, reference: &ContentRef) -> StorageResult<Option<u64>> {
        match fs::metadata(self.path_of(reference)) {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::content(reference, e)),
        }
    }

    /// Every file in the base directory that carries the content suffix.
    pub fn list(&self) -> StorageResult<Vec<ContentRef>> {
        let entries = fs::read_dir(&self.base_dir).map_err(|e| StorageError::io(&self.base_dir, e))?;

        let mut refs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&self.base_dir, e))?;
            let is_file = entry
                .file_type()
                .map_err(|e| StorageError::io(entry.path(), e))?
                .is_file();
            if !is_file {
                continue;
            }
            // non UTF-8 names were never produced by this store
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if !name.ends_with(CONTENT_SUFFIX) {
                continue;
            }
            match ContentRef::from_file_name(name.as_str()) {
                Ok(reference) => refs.push(reference),
                Err(err) => {
                    warn!(file = %name, error = %err, "skipping unrecognized content file");
                }
            }
        }
        refs.sort();
        Ok(refs)
    }
}
