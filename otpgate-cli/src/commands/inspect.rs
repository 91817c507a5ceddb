use anyhow::{bail, Result};
use otpgate_core::clock::{Clock, SystemClock};
use otpgate_core::config::TwoFactorConfig;
use otpgate_core::policy::Role;
use otpgate_core::totp::TotpSecret;
use otpgate_core::TwoFactorAuth;

/// Status as pretty JSON
pub async fn status(auth: &TwoFactorAuth, user: &str, role: Role) -> Result<String> {
    let status = auth.status(user, role).await;
    let report = serde_json::json!({
        "user": user,
        "role": role,
        "state": auth.enrollment_state(user).await,
        "enabled": status.enabled,
        "required": status.required,
        "enabledAt": status.enabled_at,
        "backupCodesRemaining": auth.backup_codes_remaining(user).await,
        "enrollmentNudge": auth.needs_enrollment_nudge(user, role).await,
    });
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Current code for a base32 secret, with the seconds it stays valid
pub fn code(config: &TwoFactorConfig, secret: &str, at: Option<u64>) -> Result<String> {
    let secret = TotpSecret::from_base32(secret);
    if secret.as_bytes().is_empty() {
        bail!("secret contains no base32 characters");
    }

    let engine = config.totp.engine();
    let at = at.unwrap_or_else(|| SystemClock.unix_seconds());
    let valid_for = engine.step() - at % engine.step();
    Ok(format!("{} (valid for {}s)", engine.code_at(&secret, at), valid_for))
}
