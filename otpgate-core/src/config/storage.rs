//! Storage configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory used by the file-backed store
    /// Env: OTPGATE_STORAGE_PATH
    pub path: String,

    /// Key the whole two-factor document is stored under
    /// Env: OTPGATE_STORAGE_KEY
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { path: "./data/2fa".to_string(), key: "evid_2fa_data".to_string() }
    }
}

impl StorageConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_vars(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("OTPGATE_STORAGE_PATH") {
            self.path = path;
        }
        if let Some(key) = lookup("OTPGATE_STORAGE_KEY") {
            self.key = key;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            bail!("Invalid storage.path: must not be empty");
        }
        if self.key.trim().is_empty() {
            bail!("Invalid storage.key: must not be empty");
        }
        Ok(())
    }
}
