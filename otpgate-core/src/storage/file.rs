//! File-backed key-value storage
//!
//! One file per key (`<dir>/<key>.json`). Writes go to a temporary sibling
//! and are renamed into place, so readers see either the old or the new blob.

use super::KeyValueStore;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// Directory of blobs, one file per key
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Open (and create if needed) the storage directory
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create storage directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// Storage directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.starts_with('.') {
        bail!("invalid storage key: \"{}\"", key);
    }
    if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.') {
        bail!("invalid storage key: \"{}\"", key);
    }
    Ok(())
}

#[async_trait::async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    async fn store(&self, key: &str, blob: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");

        tokio::fs::write(&tmp, blob)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        log::debug!("Stored {} bytes under key {}", blob.len(), key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_store_persistence() {
        let temp_dir = TempDir::new().unwrap();

        let store = FileKeyValueStore::new(temp_dir.path()).unwrap();
        assert_eq!(store.load("evid_2fa_data").await.unwrap(), None);

        store.store("evid_2fa_data", "{\"secrets\":[]}").await.unwrap();

        // Reopen from disk
        let reopened = FileKeyValueStore::new(temp_dir.path()).unwrap();
        assert_eq!(
            reopened.load("evid_2fa_data").await.unwrap().as_deref(),
            Some("{\"secrets\":[]}")
        );
        assert!(!temp_dir.path().join("evid_2fa_data.json.tmp").exists());

        reopened.remove("evid_2fa_data").await.unwrap();
        assert!(!reopened.contains("evid_2fa_data").await.unwrap());
        reopened.remove("evid_2fa_data").await.unwrap();
    }

    #[tokio::test]
    async fn test_creates_nested_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("data").join("2fa");

        let store = FileKeyValueStore::new(&nested).unwrap();
        store.store("k", "v").await.unwrap();
        assert!(nested.join("k.json").exists());
    }

    #[tokio::test]
    async fn test_rejects_unsafe_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(temp_dir.path()).unwrap();

        assert!(store.store("../escape", "x").await.is_err());
        assert!(store.store("a/b", "x").await.is_err());
        assert!(store.store("", "x").await.is_err());
        assert!(store.load(".hidden").await.is_err());
    }
}
