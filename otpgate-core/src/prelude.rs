//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use otpgate_core::prelude::*;
//! ```

// === Facade ===
pub use crate::service::{LoginDecision, LoginOutcome, SecondFactor, TwoFactorAuth, TwoFactorStatus};

// === Configuration ===
pub use crate::config::{LogFormat, LoggingConfig, TwoFactorConfig};

// === Errors ===
pub use crate::error::{TwoFactorError, TwoFactorResult};

// === Policy ===
pub use crate::enrollment::EnrollmentState;
pub use crate::policy::{requires_two_factor, PolicyGate, Role, RoleSensitivity};

// === Building blocks ===
pub use crate::backup::{BackupCodeGenerator, BackupCodeSet};
pub use crate::store::TwoFactorStore;
pub use crate::totp::{provisioning_uri, TotpEngine, TotpSecret};

// === Collaborators ===
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};

// === Re-exports for callers implementing KeyValueStore ===
pub use async_trait::async_trait;
