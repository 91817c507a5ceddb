use anyhow::{Context, Result};
use otpgate_core::TwoFactorAuth;

/// Start (or restart) enrollment for `user`
pub async fn setup(auth: &TwoFactorAuth, user: &str, account: Option<&str>) -> Result<String> {
    let secret = auth.generate_secret(user).await?;
    let uri = auth
        .provisioning_uri(user, account.unwrap_or(user))
        .await
        .context("no secret stored after setup")?;

    Ok(format!(
        "secret: {}\nuri:    {}\n\nConfirm with: otpgate enable {} <code>",
        secret.to_base32(),
        uri,
        user
    ))
}

pub async fn enable(auth: &TwoFactorAuth, user: &str, code: &str) -> Result<String> {
    let codes = auth.enable(user, code).await?;

    let mut out = format!("2FA enabled for {}. Backup codes (each works once):", user);
    for code in &codes {
        out.push_str("\n  ");
        out.push_str(code);
    }
    Ok(out)
}

pub async fn disable(auth: &TwoFactorAuth, user: &str, code: &str) -> Result<String> {
    auth.disable(user, code).await?;
    Ok(format!("2FA disabled for {}", user))
}
