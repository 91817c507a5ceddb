//! Backup code configuration

use crate::backup::{BackupCodeGenerator, DEFAULT_BACKUP_CODE_COUNT, DEFAULT_BACKUP_CODE_LENGTH};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupCodesConfig {
    /// Codes issued on enable
    /// Env: OTPGATE_BACKUP_CODE_COUNT
    /// Default: 10
    pub count: usize,

    /// Characters per code
    /// Env: OTPGATE_BACKUP_CODE_LENGTH
    /// Default: 8
    pub length: usize,
}

impl Default for BackupCodesConfig {
    fn default() -> Self {
        Self { count: DEFAULT_BACKUP_CODE_COUNT, length: DEFAULT_BACKUP_CODE_LENGTH }
    }
}

impl BackupCodesConfig {
    pub fn generator(&self) -> BackupCodeGenerator {
        BackupCodeGenerator::new().with_count(self.count).with_length(self.length)
    }

    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_vars(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(count) = lookup("OTPGATE_BACKUP_CODE_COUNT") {
            if let Some(c) = super::parse_var("OTPGATE_BACKUP_CODE_COUNT", &count) {
                self.count = c;
            }
        }
        if let Some(length) = lookup("OTPGATE_BACKUP_CODE_LENGTH") {
            if let Some(l) = super::parse_var("OTPGATE_BACKUP_CODE_LENGTH", &length) {
                self.length = l;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.count == 0 || self.count > 100 {
            bail!("Invalid backup_codes.count: must be between 1 and 100");
        }
        if self.length < 6 || self.length > 32 {
            bail!("Invalid backup_codes.length: must be between 6 and 32");
        }
        Ok(())
    }
}
