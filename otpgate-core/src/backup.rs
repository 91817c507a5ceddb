//! Single-use backup codes

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use subtle::ConstantTimeEq;

/// 36-symbol alphabet backup codes are drawn from
pub const BACKUP_CODE_ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Codes issued per set
pub const DEFAULT_BACKUP_CODE_COUNT: usize = 10;

/// Characters per code
pub const DEFAULT_BACKUP_CODE_LENGTH: usize = 8;

/// Issued backup codes for one user
///
/// Used codes are flagged in `used`, never removed from `codes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupCodeSet {
    pub codes: Vec<String>,
    #[serde(default)]
    pub used: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Outcome of matching a submitted code against a set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupCodeMatch {
    /// Issued and not yet consumed
    Unused,
    /// Issued but already consumed
    AlreadyUsed,
    /// Never issued in this set
    Unknown,
}

impl BackupCodeSet {
    /// Wrap freshly generated codes
    pub fn new(codes: Vec<String>, generated_at: DateTime<Utc>) -> Self {
        Self { codes, used: Vec::new(), generated_at }
    }

    /// Classify a submitted code (exact, case-sensitive match)
    pub fn check(&self, submitted: &str) -> BackupCodeMatch {
        let Some(code) = self.find(submitted) else {
            return BackupCodeMatch::Unknown;
        };
        if self.used.iter().any(|u| u == code) {
            BackupCodeMatch::AlreadyUsed
        } else {
            BackupCodeMatch::Unused
        }
    }

    /// Flag a code as consumed; returns false if it was unknown or used
    pub fn consume(&mut self, submitted: &str) -> bool {
        if self.check(submitted) != BackupCodeMatch::Unused {
            return false;
        }
        self.used.push(submitted.to_string());
        true
    }

    /// Codes that can still be consumed
    pub fn remaining(&self) -> usize {
        self.codes.iter().filter(|c| !self.used.contains(c)).count()
    }

    fn find(&self, submitted: &str) -> Option<&String> {
        // Compare against every code so timing does not reveal the position
        let mut found = None;
        for code in &self.codes {
            if bool::from(code.as_bytes().ct_eq(submitted.as_bytes())) {
                found = Some(code);
            }
        }
        found
    }
}

/// Generates backup codes from the operating system RNG
#[derive(Clone, Debug)]
pub struct BackupCodeGenerator {
    /// Number of codes to generate (default: 10)
    pub count: usize,
    /// Length of each code (default: 8)
    pub length: usize,
}

impl Default for BackupCodeGenerator {
    fn default() -> Self {
        Self { count: DEFAULT_BACKUP_CODE_COUNT, length: DEFAULT_BACKUP_CODE_LENGTH }
    }
}

impl BackupCodeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    /// Generate `count` pairwise-distinct codes
    pub fn generate(&self) -> Vec<String> {
        let mut rng = OsRng;
        let mut seen = HashSet::with_capacity(self.count);
        let mut codes = Vec::with_capacity(self.count);

        while codes.len() < self.count {
            let code: String = (0..self.length)
                .map(|_| {
                    let idx = rng.gen_range(0..BACKUP_CODE_ALPHABET.len());
                    BACKUP_CODE_ALPHABET[idx] as char
                })
                .collect();

            if seen.insert(code.clone()) {
                codes.push(code);
            }
        }

        codes
    }
}
