//! Key-value persistence collaborator
//!
//! The two-factor store keeps its whole state in one blob under one key. This
//! module defines the narrow read/write primitive it needs and two backends:
//! - [`MemoryKeyValueStore`] for tests and single-process hosts
//! - [`FileKeyValueStore`] for one-file-per-key persistence on disk
//!
//! Hosts with their own storage implement [`KeyValueStore`] directly.

mod file;
mod memory;

pub use file::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;

use anyhow::Result;

/// Blob storage addressed by key
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Load the blob stored under `key`, if any
    async fn load(&self, key: &str) -> Result<Option<String>>;

    /// Replace the blob stored under `key`
    async fn store(&self, key: &str, blob: &str) -> Result<()>;

    /// Remove the blob stored under `key` (no-op if absent)
    async fn remove(&self, key: &str) -> Result<()>;

    /// Check if a blob exists
    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.load(key).await?.is_some())
    }
}

// Implement KeyValueStore for Arc<S> to allow sharing one backend
#[async_trait::async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        (**self).load(key).await
    }

    async fn store(&self, key: &str, blob: &str) -> Result<()> {
        (**self).store(key, blob).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key).await
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        (**self).contains(key).await
    }
}
