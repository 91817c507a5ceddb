use anyhow::Result;
use otpgate_core::TwoFactorAuth;

pub async fn totp(auth: &TwoFactorAuth, user: &str, code: &str) -> Result<String> {
    auth.verify_login(user, code).await?;
    Ok("Code accepted".to_string())
}

pub async fn backup(auth: &TwoFactorAuth, user: &str, code: &str) -> Result<String> {
    auth.verify_and_consume_backup_code(user, code).await?;
    let remaining = auth.backup_codes_remaining(user).await;
    Ok(format!("Backup code accepted ({} remaining)", remaining))
}

#[cfg(test)]
mod tests {
    use super::*;
    use otpgate_core::clock::ManualClock;
    use otpgate_core::config::TwoFactorConfig;
    use otpgate_core::storage::FileKeyValueStore;
    use otpgate_core::TwoFactorError;
    use std::sync::Arc;

    const T0: u64 = 1_700_000_000;

    #[tokio::test]
    async fn test_verify_and_backup_against_file_store() {
        let tmp = tempfile::tempdir().unwrap();
        let kv = Arc::new(FileKeyValueStore::new(tmp.path()).unwrap());
        let auth = TwoFactorAuth::with_backend(
            kv,
            Arc::new(ManualClock::at_unix(T0 as i64)),
            &TwoFactorConfig::default(),
        )
        .await
        .unwrap();

        let secret = auth.generate_secret("u1").await.unwrap();
        let code = auth.store().engine().code_at(&secret, T0);
        let codes = auth.enable("u1", &code).await.unwrap();

        assert_eq!(totp(&auth, "u1", &code).await.unwrap(), "Code accepted");
        assert_eq!(
            backup(&auth, "u1", &codes[0]).await.unwrap(),
            "Backup code accepted (9 remaining)"
        );

        let err = backup(&auth, "u1", &codes[0]).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<TwoFactorError>(),
            Some(&TwoFactorError::InvalidOrUsedCode)
        );
    }
}
