//! Public two-factor facade
//!
//! [`TwoFactorAuth`] bundles the store, the policy gate and the provisioning
//! issuer behind the operations a host login flow needs.
//!
//! # Example
//! ```ignore
//! use otpgate_core::prelude::*;
//!
//! let auth = TwoFactorAuth::open(&TwoFactorConfig::load()?).await?;
//! let secret = auth.generate_secret("0xabc").await?;
//! println!("{}", auth.provisioning_uri("0xabc", "alice@example.com").await.unwrap());
//! let backup_codes = auth.enable("0xabc", "123456").await?;
//! ```

use crate::clock::{Clock, SystemClock};
use crate::config::TwoFactorConfig;
use crate::enrollment::EnrollmentState;
use crate::error::{TwoFactorError, TwoFactorResult};
use crate::policy::{requires_two_factor, PolicyGate, Role};
use crate::storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
use crate::store::TwoFactorStore;
use crate::totp::{self, TotpSecret};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Proof offered by the user at login
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecondFactor {
    Totp(String),
    BackupCode(String),
}

/// Result of a login check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// No verification needed, or the proof was accepted
    Granted,
    /// Verification needed but no proof supplied
    ChallengeRequired,
    /// Proof rejected (or the store could not be updated)
    Denied(TwoFactorError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginDecision {
    pub outcome: LoginOutcome,
    /// Mandatory-role user who should be prompted to enroll
    pub enrollment_nudge: bool,
}

impl LoginDecision {
    pub fn is_granted(&self) -> bool {
        self.outcome == LoginOutcome::Granted
    }
}

/// Two-factor status for a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwoFactorStatus {
    /// 2FA is enabled for this user
    pub enabled: bool,

    /// 2FA is required for this user's role
    pub required: bool,

    /// When 2FA was enabled
    pub enabled_at: Option<DateTime<Utc>>,
}

/// Two-factor authentication service
#[derive(Clone)]
pub struct TwoFactorAuth {
    store: Arc<TwoFactorStore>,
    gate: PolicyGate,
    issuer: String,
}

impl TwoFactorAuth {
    /// Open a file-backed service at `config.storage.path` on the system clock
    pub async fn open(config: &TwoFactorConfig) -> TwoFactorResult<Self> {
        let kv = FileKeyValueStore::new(&config.storage.path)?;
        log::info!("Opening 2FA store at {}", kv.dir().display());
        Self::with_backend(Arc::new(kv), Arc::new(SystemClock), config).await
    }

    /// Process-local service, nothing survives the process
    pub async fn in_memory(config: &TwoFactorConfig) -> TwoFactorResult<Self> {
        Self::with_backend(Arc::new(MemoryKeyValueStore::new()), Arc::new(SystemClock), config)
            .await
    }

    /// Service over caller-provided collaborators
    pub async fn with_backend(
        kv: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: &TwoFactorConfig,
    ) -> TwoFactorResult<Self> {
        config.validate().map_err(|e| TwoFactorError::Config(format!("{:#}", e)))?;

        let store = Arc::new(TwoFactorStore::open(kv, clock, config).await?);
        Ok(Self {
            gate: PolicyGate::new(store.clone()),
            store,
            issuer: config.totp.issuer.clone(),
        })
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<TwoFactorStore> {
        &self.store
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub async fn generate_secret(&self, user_id: &str) -> TwoFactorResult<TotpSecret> {
        self.store.generate_secret(user_id).await
    }

    pub async fn enable(&self, user_id: &str, code: &str) -> TwoFactorResult<Vec<String>> {
        self.store.enable(user_id, code).await
    }

    pub async fn disable(&self, user_id: &str, code: &str) -> TwoFactorResult<()> {
        self.store.disable(user_id, code).await
    }

    pub async fn verify_login(&self, user_id: &str, code: &str) -> TwoFactorResult<()> {
        self.store.verify_login(user_id, code).await
    }

    pub async fn verify_and_consume_backup_code(
        &self,
        user_id: &str,
        code: &str,
    ) -> TwoFactorResult<()> {
        self.store.verify_and_consume_backup_code(user_id, code).await
    }

    pub async fn is_enabled(&self, user_id: &str) -> bool {
        self.store.is_enabled(user_id).await
    }

    pub async fn requires_verification(&self, user_id: &str, role: Role) -> bool {
        self.gate.requires_verification(user_id, role).await
    }

    pub async fn needs_enrollment_nudge(&self, user_id: &str, role: Role) -> bool {
        self.gate.needs_enrollment_nudge(user_id, role).await
    }

    pub async fn enrollment_state(&self, user_id: &str) -> EnrollmentState {
        self.store.enrollment_state(user_id).await
    }

    pub async fn backup_codes_remaining(&self, user_id: &str) -> usize {
        self.store.backup_codes_remaining(user_id).await
    }

    /// otpauth URI for the user's current secret (pending or enabled)
    pub async fn provisioning_uri(&self, user_id: &str, account: &str) -> Option<String> {
        let record = self.store.record(user_id).await?;
        Some(totp::provisioning_uri(&self.issuer, account, &record.secret))
    }

    pub async fn status(&self, user_id: &str, role: Role) -> TwoFactorStatus {
        let record = self.store.record(user_id).await.filter(|r| r.enabled);
        TwoFactorStatus {
            enabled: record.is_some(),
            required: requires_two_factor(role),
            enabled_at: record.and_then(|r| r.enabled_at),
        }
    }

    /// Decide a login after the first factor has passed
    pub async fn authorize_login(
        &self,
        user_id: &str,
        role: Role,
        proof: Option<SecondFactor>,
    ) -> LoginDecision {
        let enrollment_nudge = self.gate.needs_enrollment_nudge(user_id, role).await;
        if enrollment_nudge {
            log::info!("User {} ({}) has not enrolled in 2FA", user_id, role);
        }

        let outcome = if !self.gate.requires_verification(user_id, role).await {
            LoginOutcome::Granted
        } else {
            let result = match proof {
                None => {
                    return LoginDecision {
                        outcome: LoginOutcome::ChallengeRequired,
                        enrollment_nudge,
                    }
                }
                Some(SecondFactor::Totp(code)) => self.store.verify_login(user_id, &code).await,
                Some(SecondFactor::BackupCode(code)) => {
                    self.store.verify_and_consume_backup_code(user_id, &code).await
                }
            };
            match result {
                Ok(()) => LoginOutcome::Granted,
                Err(e) => {
                    if !e.is_verification_failure() {
                        log::error!("2FA check for {} failed: {}", user_id, e);
                    }
                    LoginOutcome::Denied(e)
                }
            }
        };

        LoginDecision { outcome, enrollment_nudge }
    }
}
