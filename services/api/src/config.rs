//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use streak_core::{EngineConfig, GoalPolicy};
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Without a database URL the service keeps its state in memory.
    pub database_url: Option<String>,
    pub log_level: Level,
    pub goal_policy: GoalPolicy,
    pub checkin_max_retries: u32,
    pub notify_webhook_url: Option<String>,
    pub notify_token: Option<String>,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Database Settings ---
        let bind_address_str =
            lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Engine Settings ---
        let goal_policy = match lookup("GOAL_POLICY")
            .unwrap_or_else(|| "multi".to_string())
            .to_lowercase()
            .as_str()
        {
            "multi" => GoalPolicy::MultiGoal,
            "single" => GoalPolicy::SingleActive,
            other => {
                return Err(ConfigError::InvalidValue(
                    "GOAL_POLICY".to_string(),
                    format!("expected 'multi' or 'single', got '{}'", other),
                ))
            }
        };

        let checkin_max_retries = match lookup("CHECKIN_MAX_RETRIES") {
            None => 3,
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "CHECKIN_MAX_RETRIES".to_string(),
                        format!("'{}' is not a positive integer", raw),
                    )
                })?,
        };

        // --- Notification and HTTP Settings ---
        let notify_webhook_url = lookup("NOTIFY_WEBHOOK_URL").filter(|url| !url.is_empty());
        let notify_token = lookup("NOTIFY_TOKEN").filter(|token| !token.is_empty());
        if notify_token.is_some() && notify_webhook_url.is_none() {
            return Err(ConfigError::MissingVar("NOTIFY_WEBHOOK_URL".to_string()));
        }
        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            goal_policy,
            checkin_max_retries,
            notify_webhook_url,
            notify_token,
            cors_origin,
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            policy: self.goal_policy,
            max_checkin_retries: self.checkin_max_retries,
        }
    }
}
