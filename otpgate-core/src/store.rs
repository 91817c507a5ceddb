//! Two-factor secret and backup-code store
//!
//! All records live in memory and are written through to a
//! [`KeyValueStore`] as one JSON document after every mutation. Mutations for
//! the same user are serialized by a per-user lock that is held across the
//! read-verify-write sequence, so a backup code can never be consumed twice.
//! Apply-then-write cycles run one at a time, so a write never carries another
//! user's unsettled change. If the write-through fails, the user's in-memory
//! entries are restored and the operation reports
//! [`TwoFactorError::Persistence`]; the backend still holds the previous blob.

use crate::backup::{BackupCodeGenerator, BackupCodeMatch, BackupCodeSet};
use crate::clock::Clock;
use crate::config::TwoFactorConfig;
use crate::enrollment::{EnrollmentState, EnrollmentTrigger};
use crate::error::{TwoFactorError, TwoFactorResult};
use crate::events::TwoFactorEvent;
use crate::records::{StoreState, TotpRecord};
use crate::storage::KeyValueStore;
use crate::totp::{TotpEngine, TotpSecret};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Per-user mutation locks
///
/// Entries only live while someone holds or waits on them.
#[derive(Default)]
struct UserLocks {
    locks: scc::HashMap<String, Arc<Mutex<()>>>,
}

/// A held per-user lock; hand it back through [`UserLocks::release`]
struct UserLock {
    user_id: String,
    lock: Arc<Mutex<()>>,
    guard: OwnedMutexGuard<()>,
}

impl UserLocks {
    async fn acquire(&self, user_id: &str) -> UserLock {
        let lock = self.lock_for(user_id).await;
        let guard = lock.clone().lock_owned().await;
        UserLock { user_id: user_id.to_string(), lock, guard }
    }

    /// Unlock, and drop the table entry if no other task holds or awaits it
    async fn release(&self, held: UserLock) {
        let UserLock { user_id, lock, guard } = held;
        drop(guard);
        drop(lock);
        let _ = self.locks.remove_if_async(&user_id, |lock| Arc::strong_count(lock) == 1).await;
    }

    async fn lock_for(&self, user_id: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read_async(user_id, |_, v| v.clone()).await {
            return lock;
        }

        let lock = Arc::new(Mutex::new(()));
        match self.locks.insert_async(user_id.to_string(), lock.clone()).await {
            Ok(()) => lock,
            // Lost the race: use the lock the other task inserted
            Err(_) => self.locks.read_async(user_id, |_, v| v.clone()).await.unwrap_or(lock),
        }
    }
}

/// One user's entries, captured before a mutation
struct UserSnapshot {
    record: Option<TotpRecord>,
    backups: Option<BackupCodeSet>,
}

impl UserSnapshot {
    fn take(state: &StoreState, user_id: &str) -> Self {
        Self {
            record: state.secrets.get(user_id).cloned(),
            backups: state.backups.get(user_id).cloned(),
        }
    }

    fn restore(self, state: &mut StoreState, user_id: &str) {
        match self.record {
            Some(record) => state.secrets.insert(user_id.to_string(), record),
            None => state.secrets.remove(user_id),
        };
        match self.backups {
            Some(set) => state.backups.insert(user_id.to_string(), set),
            None => state.backups.remove(user_id),
        };
    }
}

/// Thread-safe two-factor store
pub struct TwoFactorStore {
    kv: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    engine: TotpEngine,
    generator: BackupCodeGenerator,
    storage_key: String,
    state: RwLock<StoreState>,
    user_locks: UserLocks,
    write_lock: Mutex<()>,
}

impl TwoFactorStore {
    /// Open the store, loading any persisted document
    ///
    /// A blob that cannot be parsed is logged and replaced with an empty
    /// store. Failing to read the backend at all is an error.
    pub async fn open(
        kv: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: &TwoFactorConfig,
    ) -> TwoFactorResult<Self> {
        let storage_key = config.storage.key.clone();
        let blob = kv.load(&storage_key).await?;

        let state = match blob {
            None => {
                log::debug!("No persisted 2FA state under {}, starting empty", storage_key);
                StoreState::default()
            }
            Some(blob) => match StoreState::decode(&blob) {
                Ok(state) => {
                    log::info!(
                        "Loaded 2FA state: {} secrets, {} backup code sets",
                        state.secrets.len(),
                        state.backups.len()
                    );
                    state
                }
                Err(e) => {
                    log::error!("Discarding unreadable 2FA state under {}: {}", storage_key, e);
                    TwoFactorEvent::StateRecovered { reason: e.to_string(), timestamp: clock.now() }
                        .emit();
                    StoreState::default()
                }
            },
        };

        Ok(Self {
            kv,
            clock,
            engine: config.totp.engine(),
            generator: config.backup_codes.generator(),
            storage_key,
            state: RwLock::new(state),
            user_locks: UserLocks::default(),
            write_lock: Mutex::new(()),
        })
    }

    /// TOTP engine used for verification
    pub fn engine(&self) -> &TotpEngine {
        &self.engine
    }

    /// Create or replace a pending secret for the user
    ///
    /// Fails with `AlreadyEnabled` when the user has an active second factor;
    /// an enabled record is only ever removed through [`Self::disable`].
    pub async fn generate_secret(&self, user_id: &str) -> TwoFactorResult<TotpSecret> {
        let held = self.user_locks.acquire(user_id).await;
        let now = self.clock.now();
        let secret = TotpSecret::generate();

        let issued = secret.clone();
        let result = self
            .commit(user_id, |state| {
                EnrollmentState::of(state.secrets.get(user_id))
                    .next(EnrollmentTrigger::SecretGenerated)?;
                state.secrets.insert(user_id.to_string(), TotpRecord::pending(issued, now));
                state.backups.remove(user_id);
                Ok(())
            })
            .await;
        self.user_locks.release(held).await;
        result?;

        TwoFactorEvent::SetupInitiated { user_id: user_id.to_string(), timestamp: now }.emit();
        Ok(secret)
    }

    /// Verify the first code against the pending secret and turn 2FA on
    ///
    /// Returns the freshly issued backup codes. Running this again on an
    /// enabled user with a valid code re-issues the codes.
    pub async fn enable(&self, user_id: &str, code: &str) -> TwoFactorResult<Vec<String>> {
        let held = self.user_locks.acquire(user_id).await;
        let now = self.clock.now();
        let unix = self.clock.unix_seconds();

        let result = self
            .commit(user_id, |state| {
                EnrollmentState::of(state.secrets.get(user_id))
                    .next(EnrollmentTrigger::CodeVerified)?;
                let record = state.secrets.get_mut(user_id).ok_or(TwoFactorError::InvalidCode)?;
                if !self.engine.verify(&record.secret, code, unix) {
                    return Err(TwoFactorError::InvalidCode);
                }

                record.mark_enabled(now);
                let codes = self.generator.generate();
                state.backups.insert(user_id.to_string(), BackupCodeSet::new(codes.clone(), now));
                Ok(codes)
            })
            .await;
        self.user_locks.release(held).await;

        match &result {
            Ok(codes) => {
                TwoFactorEvent::Enabled { user_id: user_id.to_string(), timestamp: now }.emit();
                TwoFactorEvent::BackupCodesGenerated {
                    user_id: user_id.to_string(),
                    codes_count: codes.len(),
                    timestamp: now,
                }
                .emit();
            }
            Err(e) => self.record_failure(user_id, e),
        }
        result
    }

    /// Remove the record and backup codes after proof of possession
    ///
    /// The code is tried as a TOTP code first, then as an unused backup code.
    pub async fn disable(&self, user_id: &str, code: &str) -> TwoFactorResult<()> {
        let held = self.user_locks.acquire(user_id).await;
        let now = self.clock.now();
        let unix = self.clock.unix_seconds();

        let result = self
            .commit(user_id, |state| {
                EnrollmentState::of(state.secrets.get(user_id))
                    .next(EnrollmentTrigger::Disabled)?;
                let record = state.secrets.get(user_id).ok_or(TwoFactorError::InvalidCode)?;

                let via_totp = self.engine.verify(&record.secret, code, unix);
                let via_backup = !via_totp
                    && state.backups.get_mut(user_id).map(|set| set.consume(code)).unwrap_or(false);
                if !via_totp && !via_backup {
                    return Err(TwoFactorError::InvalidCode);
                }

                state.secrets.remove(user_id);
                state.backups.remove(user_id);
                Ok(via_backup)
            })
            .await;
        self.user_locks.release(held).await;

        match result {
            Ok(via_backup_code) => {
                TwoFactorEvent::Disabled {
                    user_id: user_id.to_string(),
                    via_backup_code,
                    timestamp: now,
                }
                .emit();
                Ok(())
            }
            Err(e) => {
                self.record_failure(user_id, &e);
                Err(e)
            }
        }
    }

    /// Check a login TOTP code. Nothing is mutated.
    pub async fn verify_login(&self, user_id: &str, code: &str) -> TwoFactorResult<()> {
        let now = self.clock.now();
        let unix = self.clock.unix_seconds();

        let result = {
            let state = self.state.read().await;
            match state.secrets.get(user_id) {
                Some(record) if record.enabled => {
                    if self.engine.verify(&record.secret, code, unix) {
                        Ok(())
                    } else {
                        Err(TwoFactorError::InvalidCode)
                    }
                }
                _ => Err(TwoFactorError::NotEnabled),
            }
        };

        match &result {
            Ok(()) => {
                TwoFactorEvent::LoginVerified { user_id: user_id.to_string(), timestamp: now }
                    .emit()
            }
            Err(e) => self.record_failure(user_id, e),
        }
        result
    }

    /// Accept an unused backup code and mark it consumed
    ///
    /// Backup codes are matched exactly (case-sensitive, no trimming).
    pub async fn verify_and_consume_backup_code(
        &self,
        user_id: &str,
        code: &str,
    ) -> TwoFactorResult<()> {
        let held = self.user_locks.acquire(user_id).await;
        let now = self.clock.now();

        let result = self
            .commit(user_id, |state| {
                let set = state.backups.get_mut(user_id).ok_or(TwoFactorError::NoBackupCodes)?;
                match set.check(code) {
                    BackupCodeMatch::Unused => {
                        set.consume(code);
                        Ok(set.remaining())
                    }
                    BackupCodeMatch::AlreadyUsed | BackupCodeMatch::Unknown => {
                        Err(TwoFactorError::InvalidOrUsedCode)
                    }
                }
            })
            .await;
        self.user_locks.release(held).await;

        match result {
            Ok(remaining) => {
                if remaining == 0 {
                    log::warn!("User {} has used their last backup code", user_id);
                }
                TwoFactorEvent::BackupCodeUsed {
                    user_id: user_id.to_string(),
                    remaining,
                    timestamp: now,
                }
                .emit();
                Ok(())
            }
            Err(e) => {
                self.record_failure(user_id, &e);
                Err(e)
            }
        }
    }

    /// True iff the user has an enabled record
    pub async fn is_enabled(&self, user_id: &str) -> bool {
        self.state.read().await.secrets.get(user_id).map(|r| r.enabled).unwrap_or(false)
    }

    pub async fn enrollment_state(&self, user_id: &str) -> EnrollmentState {
        EnrollmentState::of(self.state.read().await.secrets.get(user_id))
    }

    /// Copy of the user's record, if any
    pub async fn record(&self, user_id: &str) -> Option<TotpRecord> {
        self.state.read().await.secrets.get(user_id).cloned()
    }

    /// Unused backup codes left (0 when none were issued)
    pub async fn backup_codes_remaining(&self, user_id: &str) -> usize {
        self.state.read().await.backups.get(user_id).map(|s| s.remaining()).unwrap_or(0)
    }

    /// Number of users with a record (pending or enabled)
    pub async fn user_count(&self) -> usize {
        self.state.read().await.secrets.len()
    }

    /// Apply a mutation for one user and write the whole state through
    ///
    /// The caller must hold the user's lock. `apply` may only touch the
    /// entries of `user_id`; they are restored if it fails or if the write
    /// does. The write lock is held until the write has settled.
    async fn commit<T>(
        &self,
        user_id: &str,
        apply: impl FnOnce(&mut StoreState) -> TwoFactorResult<T>,
    ) -> TwoFactorResult<T> {
        let _writer = self.write_lock.lock().await;

        let (snapshot, value, blob) = {
            let mut state = self.state.write().await;
            let snapshot = UserSnapshot::take(&state, user_id);
            let value = match apply(&mut *state) {
                Ok(value) => value,
                Err(e) => {
                    snapshot.restore(&mut state, user_id);
                    return Err(e);
                }
            };

            // An empty store drops its blob instead of writing an empty document
            let blob =
                if state.is_empty() { Ok(None) } else { state.encode(self.clock.now()).map(Some) };
            match blob {
                Ok(blob) => (snapshot, value, blob),
                Err(e) => {
                    snapshot.restore(&mut state, user_id);
                    return Err(e);
                }
            }
        };

        let written = match &blob {
            Some(blob) => self.kv.store(&self.storage_key, blob).await,
            None => self.kv.remove(&self.storage_key).await,
        };
        if let Err(e) = written {
            let e = TwoFactorError::from(e);
            log::error!("Failed to persist 2FA state for {}: {}", user_id, e);
            let mut state = self.state.write().await;
            snapshot.restore(&mut state, user_id);
            return Err(e);
        }

        Ok(value)
    }

    fn record_failure(&self, user_id: &str, error: &TwoFactorError) {
        if error.is_verification_failure() {
            TwoFactorEvent::VerificationFailed {
                user_id: user_id.to_string(),
                reason: error.code().to_string(),
                timestamp: self.clock.now(),
            }
            .emit();
        }
    }
}
