//! otpgate - Core
//!
//! TOTP second-factor authentication for role-gated logins.
//!
//! # Overview
//!
//! otpgate adds a time-based one-time password step on top of an existing
//! login. Users enroll by scanning a provisioning URI into an authenticator
//! app and confirming one code; they then receive single-use backup codes.
//! Roles flagged as sensitive must pass the second factor once enrolled.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use otpgate_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = TwoFactorConfig::load()?;
//!     otpgate_core::logging::init_logging(&config.logging)?;
//!
//!     let auth = TwoFactorAuth::open(&config).await?;
//!     let decision = auth
//!         .authorize_login("0xabc", Role::Admin, Some(SecondFactor::Totp("123456".into())))
//!         .await;
//!     println!("{:?}", decision.outcome);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`base32`] - RFC 4648 codec for secrets
//! - [`totp`] - HOTP/TOTP derivation and drift-tolerant verification
//! - [`backup`] - Single-use recovery codes
//! - [`store`] - Per-user records with write-through persistence
//! - [`enrollment`] - Enrollment state machine
//! - [`policy`] - Role catalogue and verification gate
//! - [`service`] - Public facade (`TwoFactorAuth`)
//! - [`storage`] / [`clock`] - Injected collaborators
//! - [`config`] / [`logging`] / [`events`] - Configuration, log setup, audit trail

pub mod backup;
pub mod base32;
pub mod clock;
pub mod config;
pub mod enrollment;
pub mod error;
pub mod events;
pub mod logging;
pub mod policy;
pub mod prelude;
pub mod records;
pub mod service;
pub mod storage;
pub mod store;
pub mod totp;

pub use error::{TwoFactorError, TwoFactorResult};
pub use service::TwoFactorAuth;

