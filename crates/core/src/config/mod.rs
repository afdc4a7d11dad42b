//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (CACHEKEEP_*)
//! 2. TOML config file (if CACHEKEEP_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::lifecycle::policy::{DEFAULT_MAX_AGE_DAYS, DEFAULT_MIN_HITS, EvictionPolicy};
use crate::retry::RetryPolicy;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (CACHEKEEP_*)
/// 2. TOML config file (if CACHEKEEP_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite metadata store.
    ///
    /// Set via CACHEKEEP_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Base URL of the HTTP blob store. When unset, blobs live on local disk.
    ///
    /// Set via CACHEKEEP_OBJECT_STORE_URL environment variable.
    #[serde(default)]
    pub object_store_url: Option<String>,

    /// Bucket (first path segment) holding image blobs.
    #[serde(default = "default_bucket")]
    pub object_store_bucket: String,

    /// Bearer token for the HTTP blob store.
    ///
    /// Set via CACHEKEEP_OBJECT_STORE_TOKEN environment variable.
    #[serde(default)]
    pub object_store_token: Option<String>,

    /// Root directory for the filesystem blob store.
    #[serde(default = "default_object_store_dir")]
    pub object_store_dir: PathBuf,

    /// Per-request timeout for blob store calls, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Image age threshold for the usage-based sweep.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,

    /// Images with fewer hits than this (and old enough) are evicted.
    #[serde(default = "default_min_hits")]
    pub min_hits: u32,

    /// Deadline for one operator-triggered cleanup, in milliseconds.
    #[serde(default = "default_sweep_timeout_ms")]
    pub sweep_timeout_ms: u64,

    /// Maximum concurrent blob deletes during a sweep.
    #[serde(default = "default_blob_delete_concurrency")]
    pub blob_delete_concurrency: usize,

    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    #[serde(default = "default_retry_initial_backoff_ms")]
    pub retry_initial_backoff_ms: u64,

    #[serde(default = "default_retry_max_backoff_ms")]
    pub retry_max_backoff_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./cachekeep.sqlite")
}

fn default_bucket() -> String {
    "images".into()
}

fn default_object_store_dir() -> PathBuf {
    PathBuf::from("./cachekeep-blobs")
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_max_age_days() -> u32 {
    DEFAULT_MAX_AGE_DAYS
}

fn default_min_hits() -> u32 {
    DEFAULT_MIN_HITS
}

fn default_sweep_timeout_ms() -> u64 {
    60_000
}

fn default_blob_delete_concurrency() -> usize {
    8
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_initial_backoff_ms() -> u64 {
    100
}

fn default_retry_max_backoff_ms() -> u64 {
    2_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            object_store_url: None,
            object_store_bucket: default_bucket(),
            object_store_token: None,
            object_store_dir: default_object_store_dir(),
            request_timeout_ms: default_request_timeout_ms(),
            max_age_days: default_max_age_days(),
            min_hits: default_min_hits(),
            sweep_timeout_ms: default_sweep_timeout_ms(),
            blob_delete_concurrency: default_blob_delete_concurrency(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_initial_backoff_ms: default_retry_initial_backoff_ms(),
            retry_max_backoff_ms: default_retry_max_backoff_ms(),
        }
    }
}

impl AppConfig {
    /// Blob store request timeout as Duration for use with reqwest/tokio.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn sweep_timeout(&self) -> Duration {
        Duration::from_millis(self.sweep_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts,
            initial_backoff: Duration::from_millis(self.retry_initial_backoff_ms),
            max_backoff: Duration::from_millis(self.retry_max_backoff_ms),
        }
    }

    /// Eviction policy for a sweep, with optional per-call overrides.
    ///
    /// # Errors
    ///
    /// Returns `Error::PolicyInput` if an override is negative or too large.
    pub fn eviction_policy(&self, max_age_days: Option<i64>, min_hits: Option<i64>) -> Result<EvictionPolicy, Error> {
        EvictionPolicy::new(
            max_age_days.unwrap_or(i64::from(self.max_age_days)),
            min_hits.unwrap_or(i64::from(self.min_hits)),
        )
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `CACHEKEEP_`
    /// 2. TOML file from `CACHEKEEP_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("CACHEKEEP_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("CACHEKEEP_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
