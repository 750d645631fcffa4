//! Configuration for the execution safety core.
//!
//! Loaded from an optional TOML file plus `SAFETY_`-prefixed environment
//! variables, environment winning. Each concern gets its own module with
//! serde defaults so a partial file is always valid.

mod journal;
mod notifications;
mod safety;
mod sessions;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use journal::JournalConfig;
pub use notifications::{
    MAX_EMERGENCY_EXPIRE_SECS, MIN_EMERGENCY_RETRY_SECS, NotificationConfig,
};
pub use safety::SafetyConfig;
pub use sessions::{SessionCatalog, SessionDefinition};

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config sources could not be read or deserialized.
    #[error("Configuration load error: {0}")]
    Load(#[from] config::ConfigError),

    /// A loaded value violates an invariant.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Ledger journal settings.
    #[serde(default)]
    pub journal: JournalConfig,
    /// Session definitions keyed by session name.
    #[serde(default)]
    pub sessions: SessionCatalog,
    /// Operator notification settings.
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Gate and ownership settings.
    #[serde(default)]
    pub safety: SafetyConfig,
}

impl Config {
    /// Load configuration from `config/safety-core.toml` (optional) and
    /// `SAFETY_`-prefixed environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a source fails to parse or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config/safety-core")
    }

    /// Load from a specific file stem plus the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a source fails to parse or validation fails.
    pub fn load_from(file_stem: &str) -> Result<Self, ConfigError> {
        let loaded: Self = config::Config::builder()
            .add_source(config::File::with_name(file_stem).required(false))
            .add_source(config::Environment::with_prefix("SAFETY").separator("__"))
            .build()?
            .try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Check cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.notifications.validate()?;
        self.safety.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_send_timeout_must_undercut_stall_threshold() {
        let mut config = Config::default();
        config.notifications.send_timeout_secs = config.notifications.stall_threshold_secs + 1;
        assert!(config.validate().is_err());
    }
}
