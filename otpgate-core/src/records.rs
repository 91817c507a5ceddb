//! Persisted two-factor records and the document they are stored in

use crate::backup::BackupCodeSet;
use crate::error::TwoFactorError;
use crate::totp::TotpSecret;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Per-user TOTP record
///
/// Invariant: `enabled` implies `setup_complete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotpRecord {
    pub secret: TotpSecret,
    pub enabled: bool,
    pub setup_complete: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_at: Option<DateTime<Utc>>,
}

impl TotpRecord {
    /// Fresh record awaiting its first verified code
    pub fn pending(secret: TotpSecret, created_at: DateTime<Utc>) -> Self {
        Self { secret, enabled: false, setup_complete: false, created_at, enabled_at: None }
    }

    /// Mark the record enabled after a verified code
    pub fn mark_enabled(&mut self, at: DateTime<Utc>) {
        self.enabled = true;
        self.setup_complete = true;
        self.enabled_at = Some(at);
    }

    pub fn is_pending(&self) -> bool {
        !self.enabled
    }
}

/// Whole-store state, keyed by user id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreState {
    pub secrets: HashMap<String, TotpRecord>,
    pub backups: HashMap<String, BackupCodeSet>,
}

/// On-disk document shape
///
/// Entries are `[userId, value]` pairs so the blob stays compatible with
/// hosts that dump their maps as entry lists.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreDocument {
    #[serde(default)]
    secrets: Vec<(String, TotpRecord)>,
    #[serde(default)]
    backups: Vec<(String, BackupCodeSet)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_updated: Option<DateTime<Utc>>,
}

impl StoreState {
    /// Parse a persisted blob
    pub fn decode(blob: &str) -> Result<Self, TwoFactorError> {
        let document: StoreDocument = serde_json::from_str(blob)
            .map_err(|e| TwoFactorError::CorruptState(e.to_string()))?;

        let mut state = StoreState {
            secrets: document.secrets.into_iter().collect(),
            backups: document.backups.into_iter().collect(),
        };
        state.repair();
        Ok(state)
    }

    /// Serialize the whole state, stamped with `now`
    pub fn encode(&self, now: DateTime<Utc>) -> Result<String, TwoFactorError> {
        let mut secrets: Vec<(String, TotpRecord)> =
            self.secrets.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        let mut backups: Vec<(String, BackupCodeSet)> =
            self.backups.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        secrets.sort_by(|a, b| a.0.cmp(&b.0));
        backups.sort_by(|a, b| a.0.cmp(&b.0));

        let document = StoreDocument { secrets, backups, last_updated: Some(now) };
        serde_json::to_string(&document)
            .map_err(|e| TwoFactorError::Persistence(format!("Failed to serialize state: {}", e)))
    }

    /// No records and no backup code sets
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty() && self.backups.is_empty()
    }

    /// Restore the record invariants on data written by other hosts
    fn repair(&mut self) {
        for (user_id, record) in self.secrets.iter_mut() {
            if record.enabled && !record.setup_complete {
                log::warn!("Record for {} was enabled without completed setup; fixing", user_id);
                record.setup_complete = true;
            }
        }

        for (user_id, set) in self.backups.iter_mut() {
            let before = set.used.len();
            let codes = set.codes.clone();
            let mut seen = HashSet::new();
            set.used.retain(|u| codes.contains(u) && seen.insert(u.clone()));
            if set.used.len() != before {
                log::warn!("Dropped unknown used backup codes for {}", user_id);
            }
        }

        // Backup codes only exist alongside an enabled record
        let secrets = &self.secrets;
        self.backups.retain(|user_id, _| secrets.get(user_id).map(|r| r.enabled).unwrap_or(false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_record() -> TotpRecord {
        let mut record = TotpRecord::pending(TotpSecret::generate(), Utc::now());
        record.mark_enabled(Utc::now());
        record
    }

    #[test]
    fn test_pending_record() {
        let record = TotpRecord::pending(TotpSecret::generate(), Utc::now());
        assert!(!record.enabled);
        assert!(!record.setup_complete);
        assert!(record.enabled_at.is_none());
        assert!(record.is_pending());
    }

    #[test]
    fn test_mark_enabled_keeps_invariant() {
        let record = enabled_record();
        assert!(record.enabled && record.setup_complete);
        assert!(record.enabled_at.is_some());
    }

    #[test]
    fn test_encode_decode() {
        let mut state = StoreState::default();
        state.secrets.insert("alice".into(), enabled_record());
        state.secrets.insert("bob".into(), TotpRecord::pending(TotpSecret::generate(), Utc::now()));
        let mut set = BackupCodeSet::new(vec!["AAAA1111".into(), "BBBB2222".into()], Utc::now());
        set.consume("AAAA1111");
        state.backups.insert("alice".into(), set);

        let blob = state.encode(Utc::now()).unwrap();
        assert!(blob.contains("\"setupComplete\""));
        assert!(blob.contains("\"lastUpdated\""));

        assert_eq!(StoreState::decode(&blob).unwrap(), state);
    }

    #[test]
    fn test_decode_entry_list_document() {
        let blob = r#"{
            "secrets": [["0xabc", {
                "secret": "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ",
                "enabled": true,
                "setupComplete": true,
                "createdAt": "2024-01-01T00:00:00Z",
                "enabledAt": "2024-01-01T00:01:00Z"
            }]],
            "backups": [["0xabc", {
                "codes": ["AAAA1111"],
                "used": [],
                "generatedAt": "2024-01-01T00:01:00Z"
            }]],
            "lastUpdated": "2024-01-01T00:01:00Z"
        }"#;

        let state = StoreState::decode(blob).unwrap();
        let record = &state.secrets["0xabc"];
        assert!(record.enabled);
        assert_eq!(record.secret.as_bytes(), b"12345678901234567890");
        assert_eq!(state.backups["0xabc"].codes, vec!["AAAA1111".to_string()]);
    }

    #[test]
    fn test_decode_corrupt() {
        match StoreState::decode("{not json") {
            Err(TwoFactorError::CorruptState(_)) => {}
            other => panic!("expected CorruptState, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_empty_document() {
        let state = StoreState::decode("{}").unwrap();
        assert_eq!(state, StoreState::default());
        assert!(state.is_empty());
    }

    #[test]
    fn test_repair() {
        let blob = r#"{
            "secrets": [["u1", {
                "secret": "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ",
                "enabled": true,
                "setupComplete": false,
                "createdAt": "2024-01-01T00:00:00Z"
            }]],
            "backups": [
                ["u1", {
                    "codes": ["AAAA1111"],
                    "used": ["ZZZZ9999"],
                    "generatedAt": "2024-01-01T00:00:00Z"
                }],
                ["orphan", {
                    "codes": ["BBBB2222"],
                    "used": [],
                    "generatedAt": "2024-01-01T00:00:00Z"
                }]
            ]
        }"#;

        let state = StoreState::decode(blob).unwrap();
        assert!(state.secrets["u1"].setup_complete);
        assert!(state.backups["u1"].used.is_empty());
        assert!(!state.backups.contains_key("orphan"));
    }
}
