//! Two-factor audit events
//!
//! Every state change and verification attempt is described by a
//! [`TwoFactorEvent`] and written to the `otpgate::audit` log target.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Log target for audit events
pub const AUDIT_TARGET: &str = "otpgate::audit";

/// Two-factor event - represents a change or an attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TwoFactorEvent {
    /// Secret generated, awaiting first verified code
    SetupInitiated { user_id: String, timestamp: DateTime<Utc> },

    /// First code verified, 2FA active
    Enabled { user_id: String, timestamp: DateTime<Utc> },

    /// Record and backup codes removed after proof of possession
    Disabled { user_id: String, via_backup_code: bool, timestamp: DateTime<Utc> },

    /// Login code accepted
    LoginVerified { user_id: String, timestamp: DateTime<Utc> },

    /// Login, enable or disable code rejected
    VerificationFailed {
        user_id: String,
        reason: String, // e.g. "invalid_code", "not_enabled"
        timestamp: DateTime<Utc>,
    },

    /// Backup code set (re)issued
    BackupCodesGenerated { user_id: String, codes_count: usize, timestamp: DateTime<Utc> },

    /// Backup code consumed
    BackupCodeUsed { user_id: String, remaining: usize, timestamp: DateTime<Utc> },

    /// Persisted state was unreadable and replaced with an empty store
    StateRecovered { reason: String, timestamp: DateTime<Utc> },
}

impl TwoFactorEvent {
    /// User the event belongs to (None for store-wide events)
    pub fn user_id(&self) -> Option<&str> {
        match self {
            TwoFactorEvent::SetupInitiated { user_id, .. }
            | TwoFactorEvent::Enabled { user_id, .. }
            | TwoFactorEvent::Disabled { user_id, .. }
            | TwoFactorEvent::LoginVerified { user_id, .. }
            | TwoFactorEvent::VerificationFailed { user_id, .. }
            | TwoFactorEvent::BackupCodesGenerated { user_id, .. }
            | TwoFactorEvent::BackupCodeUsed { user_id, .. } => Some(user_id),
            TwoFactorEvent::StateRecovered { .. } => None,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            TwoFactorEvent::SetupInitiated { timestamp, .. }
            | TwoFactorEvent::Enabled { timestamp, .. }
            | TwoFactorEvent::Disabled { timestamp, .. }
            | TwoFactorEvent::LoginVerified { timestamp, .. }
            | TwoFactorEvent::VerificationFailed { timestamp, .. }
            | TwoFactorEvent::BackupCodesGenerated { timestamp, .. }
            | TwoFactorEvent::BackupCodeUsed { timestamp, .. }
            | TwoFactorEvent::StateRecovered { timestamp, .. } => *timestamp,
        }
    }

    /// Get event type as string (for logging/audit)
    pub fn event_type(&self) -> &'static str {
        match self {
            TwoFactorEvent::SetupInitiated { .. } => "2fa_setup_initiated",
            TwoFactorEvent::Enabled { .. } => "2fa_enabled",
            TwoFactorEvent::Disabled { .. } => "2fa_disabled",
            TwoFactorEvent::LoginVerified { .. } => "2fa_login_verified",
            TwoFactorEvent::VerificationFailed { .. } => "2fa_verification_failed",
            TwoFactorEvent::BackupCodesGenerated { .. } => "2fa_backup_codes_generated",
            TwoFactorEvent::BackupCodeUsed { .. } => "2fa_backup_code_used",
            TwoFactorEvent::StateRecovered { .. } => "2fa_state_recovered",
        }
    }

    fn is_warning(&self) -> bool {
        matches!(
            self,
            TwoFactorEvent::VerificationFailed { .. } | TwoFactorEvent::StateRecovered { .. }
        )
    }

    /// Write the event to the audit log target
    pub fn emit(&self) {
        let user = self.user_id().unwrap_or("-");
        let detail = serde_json::to_string(self).unwrap_or_default();

        if self.is_warning() {
            log::warn!(target: AUDIT_TARGET, "{} user={} {}", self.event_type(), user, detail);
        } else {
            log::info!(target: AUDIT_TARGET, "{} user={} {}", self.event_type(), user, detail);
        }
    }
}
