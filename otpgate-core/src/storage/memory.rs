//! In-memory key-value storage
//!
//! Thread-safe HashMap behind an RwLock. Data is lost on restart.

use super::KeyValueStore;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// In-memory blob store
///
/// Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct MemoryKeyValueStore {
    blobs: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        let blobs = self.blobs.read().map_err(|_| anyhow!("blob map lock poisoned"))?;
        Ok(blobs.get(key).cloned())
    }

    async fn store(&self, key: &str, blob: &str) -> Result<()> {
        let mut blobs = self.blobs.write().map_err(|_| anyhow!("blob map lock poisoned"))?;
        blobs.insert(key.to_string(), blob.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut blobs = self.blobs.write().map_err(|_| anyhow!("blob map lock poisoned"))?;
        blobs.remove(key);
        Ok(())
    }
}
