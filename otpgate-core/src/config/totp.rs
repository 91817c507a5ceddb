//! TOTP configuration

use crate::totp::{TotpEngine, DEFAULT_DRIFT_STEPS, DEFAULT_STEP};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Largest accepted drift window, in steps on each side
const MAX_DRIFT_STEPS: u64 = 10;

/// TOTP configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TotpConfig {
    /// Issuer shown in authenticator apps and provisioning URIs
    /// Env: OTPGATE_ISSUER
    /// Default: "EVID-DGC"
    pub issuer: String,

    /// Time step in seconds
    /// Env: OTPGATE_STEP_SECONDS
    /// Default: 30
    pub step_seconds: u64,

    /// Accepted clock drift, in steps on each side of the current one
    /// Env: OTPGATE_DRIFT_STEPS
    /// Default: 1
    pub drift_steps: u64,
}

impl Default for TotpConfig {
    fn default() -> Self {
        Self {
            issuer: "EVID-DGC".to_string(),
            step_seconds: DEFAULT_STEP,
            drift_steps: DEFAULT_DRIFT_STEPS,
        }
    }
}

impl TotpConfig {
    /// Engine configured with this step and drift
    pub fn engine(&self) -> TotpEngine {
        TotpEngine::new(self.step_seconds, self.drift_steps)
    }

    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_vars(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(issuer) = lookup("OTPGATE_ISSUER") {
            self.issuer = issuer;
        }
        if let Some(step) = lookup("OTPGATE_STEP_SECONDS") {
            if let Some(s) = super::parse_var("OTPGATE_STEP_SECONDS", &step) {
                self.step_seconds = s;
            }
        }
        if let Some(drift) = lookup("OTPGATE_DRIFT_STEPS") {
            if let Some(d) = super::parse_var("OTPGATE_DRIFT_STEPS", &drift) {
                self.drift_steps = d;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.issuer.trim().is_empty() {
            bail!("Invalid issuer: must not be empty");
        }
        if self.step_seconds == 0 {
            bail!("Invalid step_seconds: must be greater than 0");
        }
        if self.drift_steps > MAX_DRIFT_STEPS {
            bail!("Invalid drift_steps: must be at most {}", MAX_DRIFT_STEPS);
        }
        Ok(())
    }
}
