//! Validation configuration

use crate::error::ConfigError;
use capsule_quantiser::DEFAULT_QUANTA_PER_UNIT;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables of the check pipeline and of contract issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Quanta budget per check; negative means unlimited.
    pub quanta_limit: i64,

    /// Quanta per network cost unit.
    pub quanta_per_unit: u64,

    /// Oldest acceptable `created_at`, in days before now.
    pub max_creation_age_days: i64,

    /// Highest api level accepted.
    pub max_api_level: u32,

    /// Expiry of freshly issued contracts, in days.
    pub default_expiration_days: i64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            quanta_limit: -1,
            quanta_per_unit: DEFAULT_QUANTA_PER_UNIT,
            max_creation_age_days: 10,
            max_api_level: crate::MAX_API_LEVEL,
            default_expiration_days: 90,
        }
    }
}

impl ValidationConfig {
    /// Load configuration from a TOML file; a missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Self::from_toml_str(&contents)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quanta_per_unit == 0 {
            return Err(ConfigError::Invalid("quanta_per_unit must be positive".into()));
        }
        for (name, days) in [
            ("max_creation_age_days", self.max_creation_age_days),
            ("default_expiration_days", self.default_expiration_days),
        ] {
            if days < 0 || Duration::try_days(days).is_none() {
                return Err(ConfigError::Invalid(format!("{} out of range: {}", name, days)));
            }
        }
        Ok(())
    }

    pub fn with_quanta_limit(mut self, limit: i64) -> Self {
        self.quanta_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ValidationConfig::default();
        assert_eq!(config.quanta_limit, -1);
        assert_eq!(config.quanta_per_unit, 200);
        assert_eq!(config.max_creation_age_days, 10);
        assert_eq!(config.max_api_level, 3);
    }

    #[test]
    fn test_load_missing_config() {
        let config = ValidationConfig::load("/nonexistent/path/capsule.toml").unwrap();
        assert_eq!(config, ValidationConfig::default());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ValidationConfig::from_toml_str("quanta_limit = 500\n").unwrap();
        assert_eq!(config.quanta_limit, 500);
        assert_eq!(config.default_expiration_days, 90);
    }

    #[test]
    fn test_bad_toml() {
        let err = ValidationConfig::from_toml_str("quanta_limit = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_out_of_range_values() {
        let err = ValidationConfig::from_toml_str("max_creation_age_days = 9223372036854775807\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = ValidationConfig::from_toml_str("default_expiration_days = -1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = ValidationConfig::from_toml_str("quanta_per_unit = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(ValidationConfig::default().validate().is_ok());
    }
}
