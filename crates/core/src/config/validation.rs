//! Configuration validation rules.
//!
//! This module provides validation logic for `CacheConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::CacheConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl CacheConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `key_prefix` is empty
    /// - `ttl_hours` is less than 1
    /// - `open_timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `kv_quota_bytes` is 0 or exceeds 50MB
    /// - `max_records` is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key_prefix.is_empty() {
            return Err(ConfigError::Invalid { field: "key_prefix".into(), reason: "must not be empty".into() });
        }

        if self.ttl_hours < 1 {
            return Err(ConfigError::Invalid { field: "ttl_hours".into(), reason: "must be at least 1".into() });
        }

        if self.open_timeout_ms < 100 {
            return Err(ConfigError::Invalid {
                field: "open_timeout_ms".into(),
                reason: "must be at least 100ms".into(),
            });
        }
        if self.open_timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "open_timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.kv_quota_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "kv_quota_bytes".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.kv_quota_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "kv_quota_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.max_records == 0 {
            return Err(ConfigError::Invalid { field: "max_records".into(), reason: "must be greater than 0".into() });
        }

        if self.reset_routes.is_empty() {
            tracing::warn!("reset_routes is empty; session restore will run on every route");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = CacheConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_prefix() {
        let config = CacheConfig { key_prefix: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "key_prefix"));
    }

    #[test]
    fn test_validate_zero_ttl() {
        let config = CacheConfig { ttl_hours: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "ttl_hours"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = CacheConfig { open_timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "open_timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = CacheConfig { open_timeout_ms: 301_000, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "open_timeout_ms"));
    }

    #[test]
    fn test_validate_quota_zero() {
        let config = CacheConfig { kv_quota_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "kv_quota_bytes"));
    }

    #[test]
    fn test_validate_quota_exceeds_limit() {
        let config = CacheConfig { kv_quota_bytes: 51 * 1024 * 1024, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "kv_quota_bytes"));
    }

    #[test]
    fn test_validate_zero_max_records() {
        let config = CacheConfig { max_records: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_records"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = CacheConfig { ttl_hours: 1, open_timeout_ms: 100, kv_quota_bytes: 1, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
