//! Logging setup for otpgate hosts
//!
//! Library code only uses the standard `log` macros. Binaries call
//! [`init_logging`] once to install an `env_logger` backend with the level and
//! line format from [`LoggingConfig`]. `RUST_LOG`, when set, refines the
//! configured level per target.
//!
//! # Example
//!
//! ```rust,no_run
//! use otpgate_core::config::LoggingConfig;
//!
//! otpgate_core::logging::init_logging(&LoggingConfig::default()).unwrap();
//! log::info!("2FA store ready");
//! ```

use crate::config::{LogFormat, LoggingConfig};
use chrono::{DateTime, Utc};
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Install the global logger
///
/// Safe to call multiple times; only the first call takes effect.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let level = config.level_filter()?;
    let format = config.format;

    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        builder.filter_level(level).parse_default_env();

        if format == LogFormat::Json {
            builder.format(|buf, record| {
                let line = format_json(
                    Utc::now(),
                    record.level(),
                    record.target(),
                    &record.args().to_string(),
                );
                writeln!(buf, "{}", line)
            });
        }

        if let Err(e) = builder.try_init() {
            eprintln!("otpgate: logger already installed: {}", e);
        }
    });

    Ok(())
}

/// Render one log line as a JSON object
pub fn format_json(
    timestamp: DateTime<Utc>,
    level: log::Level,
    target: &str,
    message: &str,
) -> String {
    let mut json = serde_json::Map::new();
    json.insert("timestamp".to_string(), serde_json::Value::String(timestamp.to_rfc3339()));
    json.insert("level".to_string(), serde_json::Value::String(level.to_string()));
    json.insert("target".to_string(), serde_json::Value::String(target.to_string()));
    json.insert("message".to_string(), serde_json::Value::String(message.to_string()));
    serde_json::Value::Object(json).to_string()
}
