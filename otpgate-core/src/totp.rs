//! TOTP engine (RFC 6238 over RFC 4226 HOTP, HMAC-SHA1, 6 digits)
//!
//! Code derivation is a synchronous CPU-bound call; only the surrounding
//! persistence is async.

use crate::base32;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha1::Sha1;
use subtle::ConstantTimeEq;

type HmacSha1 = Hmac<Sha1>;

/// Secret length in bytes (160 bits)
pub const SECRET_LEN: usize = 20;

/// Number of digits in a code
pub const CODE_DIGITS: usize = 6;

/// Default time step in seconds
pub const DEFAULT_STEP: u64 = 30;

/// Default drift tolerance in steps (±1 step = ±30s)
pub const DEFAULT_DRIFT_STEPS: u64 = 1;

const CODE_MODULUS: u32 = 1_000_000;

/// Shared TOTP secret
///
/// Held as raw key bytes; serialized as base32 text so the persisted document
/// stays human-enterable.
#[derive(Clone, PartialEq, Eq)]
pub struct TotpSecret {
    bytes: Vec<u8>,
}

impl TotpSecret {
    /// Generate 160 bits of entropy from the operating system RNG
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; SECRET_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Wrap existing key bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into() }
    }

    /// Parse base32 text (lenient, see [`base32::decode`])
    pub fn from_base32(text: &str) -> Self {
        Self { bytes: base32::decode(text) }
    }

    /// Base32 rendering for display and authenticator entry
    pub fn to_base32(&self) -> String {
        base32::encode(&self.bytes)
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for TotpSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TotpSecret").field("len", &self.bytes.len()).finish_non_exhaustive()
    }
}

impl Serialize for TotpSecret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base32())
    }
}

impl<'de> Deserialize<'de> for TotpSecret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Self::from_base32(&text))
    }
}

/// TOTP code generator and validator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotpEngine {
    step: u64,
    drift_steps: u64,
}

impl Default for TotpEngine {
    fn default() -> Self {
        Self { step: DEFAULT_STEP, drift_steps: DEFAULT_DRIFT_STEPS }
    }
}

impl TotpEngine {
    /// Create an engine with a custom step and drift window
    ///
    /// A step of zero is treated as the default 30 seconds.
    pub fn new(step: u64, drift_steps: u64) -> Self {
        let step = if step == 0 { DEFAULT_STEP } else { step };
        Self { step, drift_steps }
    }

    /// Time step in seconds
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Accepted drift, in steps, on either side of the current step
    pub fn drift_steps(&self) -> u64 {
        self.drift_steps
    }

    /// `floor(unix_seconds / step)`
    pub fn time_counter(&self, unix_seconds: u64) -> u64 {
        unix_seconds / self.step
    }

    /// Derive the zero-padded 6-digit code for a counter value
    pub fn compute_code(&self, secret: &TotpSecret, counter: u64) -> String {
        format!("{:0width$}", hotp(secret.as_bytes(), counter), width = CODE_DIGITS)
    }

    /// Code for the step containing `unix_seconds`
    pub fn code_at(&self, secret: &TotpSecret, unix_seconds: u64) -> String {
        self.compute_code(secret, self.time_counter(unix_seconds))
    }

    /// Check a submitted code against the drift window around `unix_seconds`
    ///
    /// ASCII whitespace is stripped from the submission ("123 456" is how
    /// most authenticators display a code). Nothing else is normalized: the
    /// comparison is an exact, constant-time match on the 6-digit form.
    pub fn verify(&self, secret: &TotpSecret, submitted: &str, unix_seconds: u64) -> bool {
        let submitted: String = submitted.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        if submitted.len() != CODE_DIGITS {
            return false;
        }

        let current = self.time_counter(unix_seconds);
        let first = current.saturating_sub(self.drift_steps);
        let last = current.saturating_add(self.drift_steps);

        // Every candidate is computed and compared so timing does not reveal
        // which step matched.
        let mut matched = 0u8;
        for counter in first..=last {
            let expected = self.compute_code(secret, counter);
            matched |= expected.as_bytes().ct_eq(submitted.as_bytes()).unwrap_u8();
        }
        matched == 1
    }
}

/// Build the `otpauth://` URI consumed by authenticator apps
pub fn provisioning_uri(issuer: &str, account: &str, secret: &TotpSecret) -> String {
    let label = format!("{}:{}", issuer, account);
    format!(
        "otpauth://totp/{}?secret={}&issuer={}",
        urlencoding::encode(&label),
        secret.to_base32(),
        urlencoding::encode(issuer)
    )
}

/// RFC 4226 HOTP value with dynamic truncation
fn hotp(key: &[u8], counter: u64) -> u32 {
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = ((digest[offset] as u32 & 0x7f) << 24)
        | ((digest[offset + 1] as u32) << 16)
        | ((digest[offset + 2] as u32) << 8)
        | (digest[offset + 3] as u32);

    binary % CODE_MODULUS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rfc_secret() -> TotpSecret {
        TotpSecret::from_bytes(b"12345678901234567890".to_vec())
    }

    #[test]
    fn test_hotp_matches_rfc4226_reference() {
        // RFC 4226 Appendix D
        let expected = [
            755224, 287082, 359152, 969429, 338314, 254676, 287922, 162583, 399871, 520489,
        ];

        for (counter, value) in expected.into_iter().enumerate() {
            assert_eq!(hotp(b"12345678901234567890", counter as u64), value);
        }
    }

    #[test]
    fn test_totp_matches_rfc6238_reference() {
        // RFC 6238 Appendix B (SHA1), last 6 of the 8 published digits
        let engine = TotpEngine::default();
        let secret = rfc_secret();

        assert_eq!(engine.code_at(&secret, 59), "287082");
        assert_eq!(engine.code_at(&secret, 1111111109), "081804");
        assert_eq!(engine.code_at(&secret, 1111111111), "050471");
        assert_eq!(engine.code_at(&secret, 1234567890), "005924");
        assert_eq!(engine.code_at(&secret, 2000000000), "279037");
        assert_eq!(engine.code_at(&secret, 20000000000), "353130");
    }

    #[test]
    fn test_base32_secret_matches_raw_secret() {
        let engine = TotpEngine::default();
        let from_text = TotpSecret::from_base32("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ");

        assert_eq!(from_text, rfc_secret());
        assert_eq!(engine.code_at(&from_text, 59), "287082");
    }

    #[test]
    fn test_generated_secret() {
        let secret = TotpSecret::generate();
        assert_eq!(secret.as_bytes().len(), SECRET_LEN);
        assert_eq!(secret.to_base32().len(), 32);
        assert_ne!(secret, TotpSecret::generate());
    }

    #[test]
    fn test_time_counter() {
        let engine = TotpEngine::default();
        assert_eq!(engine.time_counter(0), 0);
        assert_eq!(engine.time_counter(29), 0);
        assert_eq!(engine.time_counter(30), 1);
        assert_eq!(engine.time_counter(1_700_000_015), 56_666_667);
        assert_eq!(TotpEngine::new(60, 1).time_counter(119), 1);
    }

    #[test]
    fn test_verify_drift_window() {
        let engine = TotpEngine::default();
        let secret = TotpSecret::generate();
        let now = 1_700_000_000;

        assert!(engine.verify(&secret, &engine.code_at(&secret, now), now));
        assert!(engine.verify(&secret, &engine.code_at(&secret, now - 30), now));
        assert!(engine.verify(&secret, &engine.code_at(&secret, now + 30), now));

        let stale = engine.code_at(&secret, now - 60);
        let early = engine.code_at(&secret, now + 60);
        let window: Vec<String> =
            [now - 30, now, now + 30].iter().map(|t| engine.code_at(&secret, *t)).collect();
        if !window.contains(&stale) {
            assert!(!engine.verify(&secret, &stale, now));
        }
        if !window.contains(&early) {
            assert!(!engine.verify(&secret, &early, now));
        }
    }

    #[test]
    fn test_verify_at_epoch_start() {
        let engine = TotpEngine::default();
        let secret = rfc_secret();
        assert!(engine.verify(&secret, &engine.code_at(&secret, 0), 10));
    }

    #[test]
    fn test_verify_requires_exact_form() {
        let engine = TotpEngine::default();
        let secret = rfc_secret();

        // 1234567890 -> "005924"
        assert!(engine.verify(&secret, "005924", 1234567890));
        assert!(engine.verify(&secret, "005 924", 1234567890));
        assert!(!engine.verify(&secret, "5924", 1234567890));
        assert!(!engine.verify(&secret, "0005924", 1234567890));
        assert!(!engine.verify(&secret, "", 1234567890));
    }

    #[test]
    fn test_adjacent_steps_differ() {
        let engine = TotpEngine::default();
        let secret = rfc_secret();
        let codes: Vec<String> = (0..10).map(|c| engine.compute_code(&secret, c)).collect();
        for pair in codes.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn test_provisioning_uri() {
        let secret = rfc_secret();
        let uri = provisioning_uri("EVID-DGC", "alice@example.com", &secret);

        assert_eq!(
            uri,
            concat!(
                "otpauth://totp/EVID-DGC%3Aalice%40example.com",
                "?secret=GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ&issuer=EVID-DGC"
            )
        );
    }

    #[test]
    fn test_secret_serialization() {
        let secret = rfc_secret();
        let json = serde_json::to_string(&secret).unwrap();
        assert_eq!(json, "\"GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ\"");

        let restored: TotpSecret = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, secret);
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let rendered = format!("{:?}", rfc_secret());
        assert!(!rendered.contains("GEZDG"));
        assert!(!rendered.contains("49"));
    }

    #[test]
    fn test_matches_totp_rs() {
        use totp_rs::{Algorithm, TOTP};

        let engine = TotpEngine::default();
        let secret = TotpSecret::generate();
        let reference = TOTP::new(
            Algorithm::SHA1,
            6,
            1,
            30,
            secret.as_bytes().to_vec(),
            None,
            "check".to_string(),
        )
        .unwrap();

        for time in [0u64, 59, 1_111_111_109, 1_700_000_000, 2_000_000_000] {
            assert_eq!(engine.code_at(&secret, time), reference.generate(time));
        }
    }
}
