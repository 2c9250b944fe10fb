use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::Config;
use crate::services::MAX_HORIZON_DAYS;

/// Primary configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/dispatch.yaml";

/// Optional local overrides, merged over the primary file.
pub const LOCAL_CONFIG_PATH: &str = "config/local.yaml";

const ENV_PREFIX: &str = "ZOMBIE_";

/// Configuration error types
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Storage path cannot be empty")]
    EmptyStoragePath,

    #[error("Invalid max_handles: {0}. Must be at least 1")]
    InvalidMaxHandles(usize),

    #[error("Invalid max_entries: {0}. Must be at least 1")]
    InvalidMaxEntries(usize),

    #[error("Cache ttl_secs must be positive")]
    ZeroCacheTtl,

    #[error("Backend timeout {0} must be positive")]
    ZeroTimeout(&'static str),

    #[error("Retention horizon_days must be positive")]
    ZeroRetentionHorizon,

    #[error("Retention horizon_days {0} exceeds the maximum of 36500")]
    RetentionHorizonTooLarge(u32),

    #[error("Backend host cannot be empty")]
    EmptyBackendHost,

    #[error("Backend model cannot be empty")]
    EmptyBackendModel,

    #[error("Persona default_agent cannot be empty")]
    EmptyDefaultAgent,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. `path`, or `config/dispatch.yaml` when none is given
    /// 3. `config/local.yaml` (optional)
    /// 4. Environment variables (`ZOMBIE_*`, nested keys split on `__`)
    ///
    /// Missing files are skipped.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let primary = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(primary))
            .merge(Yaml::file(LOCAL_CONFIG_PATH))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, without local or
    /// environment overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.storage.path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyStoragePath);
        }
        if config.storage.max_handles == 0 {
            return Err(ConfigError::InvalidMaxHandles(config.storage.max_handles));
        }

        if config.cache.max_entries == 0 {
            return Err(ConfigError::InvalidMaxEntries(config.cache.max_entries));
        }
        if config.cache.ttl_secs == 0 {
            return Err(ConfigError::ZeroCacheTtl);
        }

        if config.retention.horizon_days == 0 {
            return Err(ConfigError::ZeroRetentionHorizon);
        }
        if config.retention.horizon_days > MAX_HORIZON_DAYS {
            return Err(ConfigError::RetentionHorizonTooLarge(
                config.retention.horizon_days,
            ));
        }

        let backend = &config.backend;
        if backend.host.trim().is_empty() {
            return Err(ConfigError::EmptyBackendHost);
        }
        if backend.model.trim().is_empty() {
            return Err(ConfigError::EmptyBackendModel);
        }
        for (name, secs) in [
            ("generate_timeout_secs", backend.generate_timeout_secs),
            ("health_timeout_secs", backend.health_timeout_secs),
            ("models_timeout_secs", backend.models_timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::ZeroTimeout(name));
            }
        }

        if config.persona.default_agent.trim().is_empty() {
            return Err(ConfigError::EmptyDefaultAgent);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Ok(())
    }
}
