//! Cache configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (VERIDRAFT_*)
//! 2. TOML config file (if VERIDRAFT_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The expiry TTL, record cap, quota, and open timeout are policy knobs
//! rather than constants; hosts tune them per deployment.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Cache configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (VERIDRAFT_*)
/// 2. TOML config file (if VERIDRAFT_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Path to the SQLite draft database (primary tier).
    ///
    /// Set via VERIDRAFT_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Path to the durable key-value file (secondary tier).
    ///
    /// Set via VERIDRAFT_KV_PATH environment variable.
    #[serde(default = "default_kv_path")]
    pub kv_path: PathBuf,

    /// Prefix prepended to every derived cache key.
    ///
    /// Set via VERIDRAFT_KEY_PREFIX environment variable.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Hours a draft record survives without a write before the sweeper
    /// removes it.
    ///
    /// Set via VERIDRAFT_TTL_HOURS environment variable.
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: i64,

    /// Deadline for opening the primary database, in milliseconds. A hung
    /// open marks the tier unavailable instead of stalling the façade.
    ///
    /// Set via VERIDRAFT_OPEN_TIMEOUT_MS environment variable.
    #[serde(default = "default_open_timeout_ms")]
    pub open_timeout_ms: u64,

    /// Byte quota for the durable key-value file.
    ///
    /// Set via VERIDRAFT_KV_QUOTA_BYTES environment variable.
    #[serde(default = "default_kv_quota_bytes")]
    pub kv_quota_bytes: usize,

    /// Cap on stored draft records; the sweeper removes the oldest beyond it.
    ///
    /// Set via VERIDRAFT_MAX_RECORDS environment variable.
    #[serde(default = "default_max_records")]
    pub max_records: usize,

    /// Routes that produce a clear; session restore is skipped when the
    /// application starts on one of them.
    ///
    /// Set via VERIDRAFT_RESET_ROUTES environment variable (comma-separated).
    #[serde(default = "default_reset_routes")]
    pub reset_routes: Vec<String>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./veridraft-drafts.sqlite")
}

fn default_kv_path() -> PathBuf {
    PathBuf::from("./veridraft-kv.json")
}

fn default_key_prefix() -> String {
    "kyc_cache:".into()
}

fn default_ttl_hours() -> i64 {
    48
}

fn default_open_timeout_ms() -> u64 {
    10_000
}

fn default_kv_quota_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_max_records() -> usize {
    300
}

fn default_reset_routes() -> Vec<String> {
    vec!["/restart".into(), "/verification/complete".into()]
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            kv_path: default_kv_path(),
            key_prefix: default_key_prefix(),
            ttl_hours: default_ttl_hours(),
            open_timeout_ms: default_open_timeout_ms(),
            kv_quota_bytes: default_kv_quota_bytes(),
            max_records: default_max_records(),
            reset_routes: default_reset_routes(),
        }
    }
}

impl CacheConfig {
    /// Open deadline as a Duration for use with tokio timers.
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    /// Record TTL in milliseconds, for cutoff arithmetic against stored
    /// last-write timestamps.
    pub fn ttl_millis(&self) -> i64 {
        self.ttl_hours * 60 * 60 * 1000
    }

    /// Whether `route` is one of the configured reset routes.
    pub fn is_reset_route(&self, route: &str) -> bool {
        self.reset_routes.iter().any(|r| r == route)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `VERIDRAFT_`
    /// 2. TOML file from `VERIDRAFT_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("VERIDRAFT_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("VERIDRAFT_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
