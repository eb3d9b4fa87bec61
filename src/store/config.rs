//! Blob store configuration.

use std::path::{Path, PathBuf};

use crate::storage::CONTENT_SUFFIX;
use crate::store::error::{BlobStoreError, BlobStoreResult};

/// Supplies the writable root directory the store lives under.
///
/// The host process implements this; plain paths implement it too.
pub trait DataDirProvider {
    fn data_dir(&self) -> PathBuf;
}

impl DataDirProvider for Path {
    fn data_dir(&self) -> PathBuf {
        self.to_path_buf()
    }
}

impl DataDirProvider for PathBuf {
    fn data_dir(&self) -> PathBuf {
        self.clone()
    }
}

/// Blob store configuration options.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Host data directory; the store creates its own subdirectory here.
    pub data_dir: PathBuf,
    /// Name of the store's subdirectory.
    pub dir_name: String,
    /// File name of the metadata file inside the store directory.
    pub metadata_file: String,
    /// fsync content and metadata files before returning.
    pub sync: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            dir_name: "blobstore".to_string(),
            metadata_file: "metadata.json".to_string(),
            sync: true,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration rooted at the given data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Create a configuration rooted at the host's data directory.
    pub fn from_provider<P: DataDirProvider + ?Sized>(provider: &P) -> Self {
        Self::new(provider.data_dir())
    }

    /// Set the store subdirectory name.
    pub fn dir_name(mut self, value: impl Into<String>) -> Self {
        self.dir_name = value.into();
        self
    }

    /// Set the metadata file name.
    pub fn metadata_file(mut self, value: impl Into<String>) -> Self {
        self.metadata_file = value.into();
        self
    }

    /// Set the sync flag.
    pub fn sync(mut self, value: bool) -> Self {
        self.sync = value;
        self
    }

    /// Directory holding the metadata file and all content files.
    pub fn base_dir(&self) -> PathBuf {
        self.data_dir.join(&self.dir_name)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.base_dir().join(&self.metadata_file)
    }

    pub(crate) fn validate(&self) -> BlobStoreResult<()> {
        if !is_plain_file_name(&self.dir_name) {
            return Err(BlobStoreError::InvalidConfig(format!(
                "dir_name must be a single path component, got '{}'",
                self.dir_name
            )));
        }
        if !is_plain_file_name(&self.metadata_file) {
            return Err(BlobStoreError::InvalidConfig(format!(
                "metadata_file must be a single path component, got '{}'",
                self.metadata_file
            )));
        }
        // content files are recognized by their suffix
        if self.metadata_file.ends_with(CONTENT_SUFFIX) {
            return Err(BlobStoreError::InvalidConfig(format!(
                "metadata_file cannot end with '{}'",
                CONTENT_SUFFIX
            )));
        }
        Ok(())
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::new("/var/lib/host");
        assert_eq!(config.base_dir(), PathBuf::from("/var/lib/host/blobstore"));
        assert_eq!(
            config.metadata_path(),
            PathBuf::from("/var/lib/host/blobstore/metadata.json")
        );
        assert!(config.sync);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_provider() {
        struct Host;
        impl DataDirProvider for Host {
            fn data_dir(&self) -> PathBuf {
                PathBuf::from("/data")
            }
        }

        let config = StoreConfig::from_provider(&Host).dir_name("artifacts");
        assert_eq!(config.base_dir(), PathBuf::from("/data/artifacts"));

        let config = StoreConfig::from_provider(Path::new("/other"));
        assert_eq!(config.data_dir, PathBuf::from("/other"));
    }

    #[test]
    fn test_validate() {
        let base = StoreConfig::new("/data");
        assert!(base.clone().dir_name("a/b").validate().is_err());
        assert!(base.clone().dir_name("..").validate().is_err());
        assert!(base.clone().metadata_file("").validate().is_err());
        assert!(base.clone().metadata_file("meta.content").validate().is_err());
        assert!(base.metadata_file("index.json").sync(false).validate().is_ok());
    }
}
