//! Engine configuration.

use crate::paginator::DEFAULT_PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::env;

/// Default number of removed rows kept for restore.
pub const DEFAULT_TOMBSTONE_LIMIT: usize = 50;

/// Store configuration.
///
/// Deserializes from camelCase JSON with every field optional, or loads from
/// environment variables with [`EngineConfig::from_env`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Initial page size
    pub page_size: usize,
    /// Maximum number of removed rows kept for restore
    pub tombstone_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            tombstone_limit: DEFAULT_TOMBSTONE_LIMIT,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, reading a `.env` file
    /// first if one exists.
    ///
    /// - `ROWSTATE_PAGE_SIZE` (default 10, must be at least 1)
    /// - `ROWSTATE_TOMBSTONE_LIMIT` (default 50)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let page_size = match env::var("ROWSTATE_PAGE_SIZE") {
            Ok(raw) => raw
                .parse()
                .ok()
                .filter(|size: &usize| *size > 0)
                .ok_or(ConfigError::InvalidPageSize(raw))?,
            Err(_) => DEFAULT_PAGE_SIZE,
        };

        let tombstone_limit = match env::var("ROWSTATE_TOMBSTONE_LIMIT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidTombstoneLimit(raw))?,
            Err(_) => DEFAULT_TOMBSTONE_LIMIT,
        };

        Ok(Self {
            page_size,
            tombstone_limit,
        })
    }

    /// Check values that deserialization cannot rule out.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::InvalidPageSize(self.page_size.to_string()));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid ROWSTATE_PAGE_SIZE value: {0}")]
    InvalidPageSize(String),

    #[error("Invalid ROWSTATE_TOMBSTONE_LIMIT value: {0}")]
    InvalidTombstoneLimit(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.tombstone_limit, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn deserialize_partial() {
        let config: EngineConfig = serde_json::from_str(r#"{"pageSize": 25}"#).unwrap();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.tombstone_limit, DEFAULT_TOMBSTONE_LIMIT);

        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn zero_page_size_is_invalid() {
        let config = EngineConfig {
            page_size: 0,
            ..EngineConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidPageSize("0".into()))
        );
    }

    #[test]
    fn error_display() {
        let err = ConfigError::InvalidTombstoneLimit("many".into());
        assert_eq!(
            err.to_string(),
            "Invalid ROWSTATE_TOMBSTONE_LIMIT value: many"
        );
    }
}
