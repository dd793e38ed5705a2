//! Application Configuration Module
//!
//! Loads the console host's settings from environment variables and turns
//! them into the interpreter configuration the core session runs with.

use std::env;
use std::time::Duration;
use tracing::Level;
use voice_chess_core::InterpreterConfig;

/// Holds all configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub interpreter: InterpreterConfig,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `VOICE_CHESS_CONFIRM_TIMEOUT_SECS`: (Optional) How long a confirmation waits. Defaults to 5.
    // *   `VOICE_CHESS_RELISTEN_DELAY_SECS`: (Optional) Pause before listening again after a transcript. Defaults to 0.8.
    // *   `VOICE_CHESS_STALL_TIMEOUT_SECS`: (Optional) Silence after activation before a forced restart. Defaults to 2.
    // *   `VOICE_CHESS_LISTEN_DURING_CONFIRMATION`: (Optional) "true" or "false". Defaults to "true".
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. This is useful for local development and is ignored if not present.
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut interpreter = InterpreterConfig::default();

        if let Some(timeout) = seconds(&lookup, "VOICE_CHESS_CONFIRM_TIMEOUT_SECS")? {
            interpreter.confirmation.timeout = timeout;
        }
        if let Some(delay) = seconds(&lookup, "VOICE_CHESS_RELISTEN_DELAY_SECS")? {
            interpreter.listening.relisten_delay = delay;
        }
        if let Some(timeout) = seconds(&lookup, "VOICE_CHESS_STALL_TIMEOUT_SECS")? {
            interpreter.listening.stall_timeout = timeout;
        }
        if let Some(listen) = flag(&lookup, "VOICE_CHESS_LISTEN_DURING_CONFIRMATION")? {
            interpreter.confirmation.listen_during_confirmation = listen;
        }

        // Configure logging level from RUST_LOG, with a sensible default.
        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            interpreter,
            log_level,
        })
    }
}

fn seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    let Some(value) = lookup(name) else {
        return Ok(None);
    };
    match value.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => Ok(Some(Duration::from_secs_f64(secs))),
        _ => Err(ConfigError::InvalidVar { name, value }),
    }
}

fn flag(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<bool>, ConfigError> {
    let Some(value) = lookup(name) else {
        return Ok(None);
    };
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(Some(true)),
        "false" | "0" | "no" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidVar { name, value }),
    }
}
