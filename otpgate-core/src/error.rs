//! Error kinds reported by the two-factor subsystem

/// Result type used throughout the crate
pub type TwoFactorResult<T> = Result<T, TwoFactorError>;

/// Two-factor error type
///
/// The first four variants are verification failures. Callers that answer
/// untrusted clients should use [`TwoFactorError::public_message`] so that
/// "wrong code" and "unknown user" look the same from the outside.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TwoFactorError {
    #[error("Invalid verification code")]
    InvalidCode,
    #[error("Two-factor authentication is not enabled")]
    NotEnabled,
    #[error("No backup codes have been issued")]
    NoBackupCodes,
    #[error("Backup code is invalid or already used")]
    InvalidOrUsedCode,
    #[error("Two-factor authentication is already enabled; disable it first")]
    AlreadyEnabled,
    #[error("Persisted two-factor state is corrupt: {0}")]
    CorruptState(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TwoFactorError {
    /// True for the kinds that mean "the submitted proof was not accepted"
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            TwoFactorError::InvalidCode
                | TwoFactorError::NotEnabled
                | TwoFactorError::NoBackupCodes
                | TwoFactorError::InvalidOrUsedCode
        )
    }

    /// Stable snake_case identifier (for logs and JSON bodies)
    pub fn code(&self) -> &'static str {
        match self {
            TwoFactorError::InvalidCode => "invalid_code",
            TwoFactorError::NotEnabled => "not_enabled",
            TwoFactorError::NoBackupCodes => "no_backup_codes",
            TwoFactorError::InvalidOrUsedCode => "invalid_or_used_code",
            TwoFactorError::AlreadyEnabled => "already_enabled",
            TwoFactorError::CorruptState(_) => "corrupt_state",
            TwoFactorError::Persistence(_) => "persistence_error",
            TwoFactorError::Config(_) => "config_error",
        }
    }

    /// Message safe to show to an unauthenticated client
    pub fn public_message(&self) -> &'static str {
        if self.is_verification_failure() {
            "Second factor not satisfied"
        } else {
            "Two-factor authentication is temporarily unavailable"
        }
    }
}

impl From<anyhow::Error> for TwoFactorError {
    fn from(err: anyhow::Error) -> Self {
        TwoFactorError::Persistence(format!("{:#}", err))
    }
}
