//! Role-gated second-factor policy
//!
//! Roles are a closed catalogue. The mandatory set is fixed: administrators,
//! evidence managers and court officials.
//!
//! A mandatory-role user who never enrolled is not blocked: the gate only asks
//! for verification once 2FA is enabled and otherwise reports a nudge.

use crate::store::TwoFactorStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Roles of the host system, with their numeric identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    PublicViewer = 1,
    Investigator = 2,
    ForensicAnalyst = 3,
    LegalProfessional = 4,
    CourtOfficial = 5,
    EvidenceManager = 6,
    Auditor = 7,
    Admin = 8,
}

/// Whether a role must use a second factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleSensitivity {
    Mandatory,
    Optional,
}

impl Role {
    pub const ALL: [Role; 8] = [
        Role::PublicViewer,
        Role::Investigator,
        Role::ForensicAnalyst,
        Role::LegalProfessional,
        Role::CourtOfficial,
        Role::EvidenceManager,
        Role::Auditor,
        Role::Admin,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::PublicViewer => "public_viewer",
            Role::Investigator => "investigator",
            Role::ForensicAnalyst => "forensic_analyst",
            Role::LegalProfessional => "legal_professional",
            Role::CourtOfficial => "court_official",
            Role::EvidenceManager => "evidence_manager",
            Role::Auditor => "auditor",
            Role::Admin => "admin",
        }
    }

    pub fn sensitivity(self) -> RoleSensitivity {
        match self {
            Role::Admin | Role::EvidenceManager | Role::CourtOfficial => RoleSensitivity::Mandatory,
            _ => RoleSensitivity::Optional,
        }
    }
}

/// True iff the role is in the mandatory set
pub fn requires_two_factor(role: Role) -> bool {
    role.sensitivity() == RoleSensitivity::Mandatory
}

/// Decides whether a login must pass second-factor verification
#[derive(Clone)]
pub struct PolicyGate {
    store: Arc<TwoFactorStore>,
}

impl PolicyGate {
    pub fn new(store: Arc<TwoFactorStore>) -> Self {
        Self { store }
    }

    /// `requires_two_factor(role) && is_enabled(user_id)`
    pub async fn requires_verification(&self, user_id: &str, role: Role) -> bool {
        requires_two_factor(role) && self.store.is_enabled(user_id).await
    }

    /// Mandatory-role user who has not enabled 2FA yet
    pub async fn needs_enrollment_nudge(&self, user_id: &str, role: Role) -> bool {
        requires_two_factor(role) && !self.store.is_enabled(user_id).await
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for Role {
    type Error = String;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Role::ALL
            .into_iter()
            .find(|r| r.id() == id)
            .ok_or_else(|| format!("unknown role id: {}", id))
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    /// Accepts the snake_case name (case-insensitive) or the numeric id
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(id) = s.parse::<u8>() {
            return Role::try_from(id);
        }

        let lowered = s.to_ascii_lowercase();
        match lowered.as_str() {
            "administrator" => return Ok(Role::Admin),
            "evidence_custodian" => return Ok(Role::EvidenceManager),
            _ => {}
        }
        Role::ALL
            .into_iter()
            .find(|r| r.name() == lowered)
            .ok_or_else(|| format!("unknown role: {}", s))
    }
}
