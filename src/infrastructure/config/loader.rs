//! Hierarchical configuration loading and validation.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::domain::models::{CefrLevel, EraLabel};

/// Directory holding project configuration and the default database.
pub const CONFIG_DIR: &str = ".bookbridge";

/// Prefix for environment overrides, e.g. `BOOKBRIDGE_SCHEDULER__CONCURRENCY=4`.
pub const ENV_PREFIX: &str = "BOOKBRIDGE_";

const KNOWN_PROVIDERS: [&str; 2] = ["http", "anthropic"];

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Concurrency outside `1..=8`
    #[error("Invalid concurrency: {0}. Must be between 1 and 8")]
    InvalidConcurrency(usize),

    /// Zero requests per minute
    #[error("Invalid requests_per_minute: {0}. Must be positive")]
    InvalidRateLimit(u32),

    /// Unrecognized log level
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// Unrecognized log format
    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    /// Unrecognized rotation policy
    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    /// Database path is empty
    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    /// Pool needs at least one connection
    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    /// Retry policy allows no attempts
    #[error("Invalid max_attempts: {0}. Cannot be 0")]
    InvalidMaxAttempts(u32),

    /// Initial backoff exceeds the cap
    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must not exceed max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    /// Length-ratio bounds are inverted or not positive
    #[error("Invalid length ratio bounds: min ({0}) must be positive and below max ({1})")]
    InvalidLengthRatio(f64, f64),

    /// A threshold override names an unknown era or level, or an out-of-range score
    #[error("Invalid threshold override for {era}/{level}: {reason}")]
    InvalidThreshold {
        /// Era as written in the override
        era: String,
        /// Level as written in the override
        level: String,
        /// What is wrong with it
        reason: String,
    },

    /// Provider name the simplifier factory cannot build
    #[error("Unknown simplifier provider: {0}. Must be one of: http, anthropic")]
    UnknownProvider(String),

    /// Any other validation failure
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .bookbridge/config.yaml (project config, created by init)
    /// 3. .bookbridge/local.yaml (project local overrides, optional)
    /// 4. Environment variables (BOOKBRIDGE_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Self::figment(None)
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring environment overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Self::figment(Some(path.as_ref()))
            .extract()
            .context(format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment(explicit: Option<&Path>) -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        let figment = match explicit {
            Some(path) => figment.merge(Yaml::file(path)),
            None => figment
                .merge(Yaml::file(format!("{CONFIG_DIR}/config.yaml")))
                .merge(Yaml::file(format!("{CONFIG_DIR}/local.yaml"))),
        };
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(config.logging.rotation.clone()));
        }

        if config.chunking.words_per_chunk == 0 {
            return Err(ConfigError::ValidationFailed(
                "chunking.words_per_chunk must be at least 1".to_string(),
            ));
        }
        if config.era.sample_chars == 0 {
            return Err(ConfigError::ValidationFailed(
                "era.sample_chars must be at least 1".to_string(),
            ));
        }

        if !KNOWN_PROVIDERS.contains(&config.simplifier.provider.as_str()) {
            return Err(ConfigError::UnknownProvider(config.simplifier.provider.clone()));
        }
        if config.simplifier.timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "simplifier.timeout_secs must be at least 1".to_string(),
            ));
        }

        if config.scheduler.concurrency == 0 || config.scheduler.concurrency > 8 {
            return Err(ConfigError::InvalidConcurrency(config.scheduler.concurrency));
        }
        if config.scheduler.requests_per_minute == 0 {
            return Err(ConfigError::InvalidRateLimit(config.scheduler.requests_per_minute));
        }

        if config.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(config.retry.max_attempts));
        }
        if config.retry.initial_backoff_ms > config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        let quality = &config.quality;
        if quality.min_length_ratio <= 0.0 || quality.min_length_ratio >= quality.max_length_ratio {
            return Err(ConfigError::InvalidLengthRatio(
                quality.min_length_ratio,
                quality.max_length_ratio,
            ));
        }
        for cell in &quality.threshold_overrides {
            let invalid = |reason: &str| ConfigError::InvalidThreshold {
                era: cell.era.clone(),
                level: cell.level.clone(),
                reason: reason.to_string(),
            };
            if EraLabel::from_str(&cell.era).is_none() {
                return Err(invalid("unknown era"));
            }
            if CefrLevel::from_str(&cell.level).is_none() {
                return Err(invalid("unknown level"));
            }
            if !(0.0..=1.0).contains(&cell.min_score) {
                return Err(invalid("min_score must be within 0.0..=1.0"));
            }
        }

        if let Some(sentinel) = config.coverage.sentinel_score {
            if !sentinel.is_finite() {
                return Err(ConfigError::ValidationFailed(
                    "coverage.sentinel_score must be a finite number".to_string(),
                ));
            }
        }

        Ok(())
    }
}
