//! Configuration system for otpgate
//!
//! Values are resolved in the following order (highest priority wins):
//!
//! 1. **Environment Variables** (`OTPGATE_*`)
//! 2. **Config File** (otpgate.toml)
//! 3. **Defaults**
//!
//! # Example
//!
//! ```no_run
//! use otpgate_core::config::TwoFactorConfig;
//!
//! // Load with full supersedence
//! let config = TwoFactorConfig::load()?;
//!
//! // Or load from specific file
//! let config = TwoFactorConfig::from_file("otpgate.toml")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod backup_codes;
pub mod logging;
pub mod storage;
pub mod totp;

pub use backup_codes::BackupCodesConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use storage::StorageConfig;
pub use totp::TotpConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "otpgate.toml";

/// Complete otpgate configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwoFactorConfig {
    pub totp: TotpConfig,
    pub backup_codes: BackupCodesConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl TwoFactorConfig {
    /// Load configuration from `otpgate.toml` plus environment variables
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific file (if present) plus environment
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut config = Self::default();

        if path.exists() {
            let file_config = Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.merge(file_config);
        }

        config.apply_env_vars();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.as_ref().display()))
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.totp.merge(other.totp);
        self.backup_codes.merge(other.backup_codes);
        self.storage.merge(other.storage);
        self.logging.merge(other.logging);
    }

    /// Apply `OTPGATE_*` environment variables
    pub fn apply_env_vars(&mut self) {
        self.apply_vars(|name| env::var(name).ok());
    }

    /// Apply variables from an arbitrary lookup (environment, test fixtures)
    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.totp.apply_vars(&lookup);
        self.backup_codes.apply_vars(&lookup);
        self.storage.apply_vars(&lookup);
        self.logging.apply_vars(&lookup);
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.totp.validate()?;
        self.backup_codes.validate()?;
        self.storage.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Parse a numeric variable, logging and ignoring malformed values
pub(crate) fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Option<T> {
    match value.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("Ignoring invalid value for {}: {:?}", name, value);
            None
        }
    }
}
