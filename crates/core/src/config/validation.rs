//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `request_timeout_ms` is outside 100ms..=5 minutes
    /// - `sweep_timeout_ms` is outside 100ms..=1 hour
    /// - `blob_delete_concurrency` is outside 1..=64
    /// - `retry_max_attempts` is outside 1..=10
    /// - `retry_max_backoff_ms` is below `retry_initial_backoff_ms`
    ///
    /// Returns `ConfigError::Missing` if an HTTP object store is configured
    /// without a bucket.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_ms < 100 {
            return Err(invalid("request_timeout_ms", "must be at least 100ms"));
        }
        if self.request_timeout_ms > 300_000 {
            return Err(invalid("request_timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.sweep_timeout_ms < 100 {
            return Err(invalid("sweep_timeout_ms", "must be at least 100ms"));
        }
        if self.sweep_timeout_ms > 3_600_000 {
            return Err(invalid("sweep_timeout_ms", "must not exceed 1 hour (3600000ms)"));
        }

        if !(1..=64).contains(&self.blob_delete_concurrency) {
            return Err(invalid("blob_delete_concurrency", "must be between 1 and 64"));
        }

        if !(1..=10).contains(&self.retry_max_attempts) {
            return Err(invalid("retry_max_attempts", "must be between 1 and 10"));
        }
        if self.retry_max_backoff_ms < self.retry_initial_backoff_ms {
            return Err(invalid("retry_max_backoff_ms", "must not be less than retry_initial_backoff_ms"));
        }

        if self.object_store_url.is_some() && self.object_store_bucket.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "object_store_bucket".into(),
                hint: "set CACHEKEEP_OBJECT_STORE_BUCKET when CACHEKEEP_OBJECT_STORE_URL is set".into(),
            });
        }

        if self.object_store_url.is_none() && self.object_store_token.is_some() {
            tracing::warn!("object_store_token is set but object_store_url is not; token will be ignored");
        }

        Ok(())
    }
}
