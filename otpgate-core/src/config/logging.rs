//! Logging configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// `env_logger` default human-readable lines
    #[default]
    Human,
    /// One JSON object per line
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" | "text" => Ok(LogFormat::Human),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// error, warn, info, debug or trace
    /// Env: OTPGATE_LOG_LEVEL
    pub level: String,
    /// Env: OTPGATE_LOG_FORMAT
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Human }
    }
}

impl LoggingConfig {
    /// Parsed level filter
    pub fn level_filter(&self) -> Result<log::LevelFilter> {
        match self.level.parse::<log::LevelFilter>() {
            Ok(level) => Ok(level),
            Err(_) => bail!("Invalid logging.level: {:?}", self.level),
        }
    }

    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_vars(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("OTPGATE_LOG_LEVEL") {
            self.level = level;
        }
        if let Some(format) = lookup("OTPGATE_LOG_FORMAT") {
            match format.parse() {
                Ok(f) => self.format = f,
                Err(e) => log::warn!("Ignoring OTPGATE_LOG_FORMAT: {}", e),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.level_filter().map(|_| ())
    }
}
