//! Enrollment state machine
//!
//! ```text
//! NoSecret --secret generated--> PendingVerification --code verified--> Enabled
//!    ^                             |   ^                                  |
//!    |                             +---+ secret generated (replaces)      |
//!    +------------------------- disabled (proof of possession) ----------+
//! ```
//!
//! The state is derived from the stored record, never stored on its own.

use crate::error::TwoFactorError;
use crate::records::TotpRecord;
use serde::{Deserialize, Serialize};

/// Where a user is in the enrollment flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentState {
    /// No record
    NoSecret,
    /// Secret generated, waiting for the first valid code
    PendingVerification,
    /// First code verified, second factor active
    Enabled,
}

/// Events that move the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentTrigger {
    SecretGenerated,
    CodeVerified,
    Disabled,
}

impl EnrollmentState {
    /// Derive the state from the stored record
    pub fn of(record: Option<&TotpRecord>) -> Self {
        match record {
            None => EnrollmentState::NoSecret,
            Some(r) if r.enabled => EnrollmentState::Enabled,
            Some(_) => EnrollmentState::PendingVerification,
        }
    }

    /// Next state for a trigger, or the error the operation must fail with
    ///
    /// `CodeVerified` on an enabled record is allowed: re-running enable
    /// re-issues the backup codes.
    pub fn next(self, trigger: EnrollmentTrigger) -> Result<Self, TwoFactorError> {
        use EnrollmentState::*;
        use EnrollmentTrigger::*;

        match (self, trigger) {
            (NoSecret | PendingVerification, SecretGenerated) => Ok(PendingVerification),
            (Enabled, SecretGenerated) => Err(TwoFactorError::AlreadyEnabled),
            (PendingVerification | Enabled, CodeVerified) => Ok(Enabled),
            (NoSecret, CodeVerified) => Err(TwoFactorError::InvalidCode),
            (Enabled, Disabled) => Ok(NoSecret),
            (NoSecret | PendingVerification, Disabled) => Err(TwoFactorError::InvalidCode),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentState::NoSecret => "no_secret",
            EnrollmentState::PendingVerification => "pending_verification",
            EnrollmentState::Enabled => "enabled",
        }
    }
}

impl std::fmt::Display for EnrollmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::totp::TotpSecret;
    use chrono::Utc;

    #[test]
    fn test_state_of_record() {
        let mut record = TotpRecord::pending(TotpSecret::generate(), Utc::now());
        assert_eq!(EnrollmentState::of(None), EnrollmentState::NoSecret);
        assert_eq!(EnrollmentState::of(Some(&record)), EnrollmentState::PendingVerification);

        record.mark_enabled(Utc::now());
        assert_eq!(EnrollmentState::of(Some(&record)), EnrollmentState::Enabled);
    }

    #[test]
    fn test_happy_path() {
        let state = EnrollmentState::NoSecret;
        let state = state.next(EnrollmentTrigger::SecretGenerated).unwrap();
        assert_eq!(state, EnrollmentState::PendingVerification);

        // Restarting setup keeps the user pending
        let state = state.next(EnrollmentTrigger::SecretGenerated).unwrap();
        assert_eq!(state, EnrollmentState::PendingVerification);

        let state = state.next(EnrollmentTrigger::CodeVerified).unwrap();
        assert_eq!(state, EnrollmentState::Enabled);

        let state = state.next(EnrollmentTrigger::Disabled).unwrap();
        assert_eq!(state, EnrollmentState::NoSecret);
    }

    #[test]
    fn test_rejected_transitions() {
        assert_eq!(
            EnrollmentState::Enabled.next(EnrollmentTrigger::SecretGenerated),
            Err(TwoFactorError::AlreadyEnabled)
        );
        assert_eq!(
            EnrollmentState::NoSecret.next(EnrollmentTrigger::CodeVerified),
            Err(TwoFactorError::InvalidCode)
        );
        assert_eq!(
            EnrollmentState::PendingVerification.next(EnrollmentTrigger::Disabled),
            Err(TwoFactorError::InvalidCode)
        );
        assert_eq!(
            EnrollmentState::NoSecret.next(EnrollmentTrigger::Disabled),
            Err(TwoFactorError::InvalidCode)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(EnrollmentState::PendingVerification.to_string(), "pending_verification");
    }
}
