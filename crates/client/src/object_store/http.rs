//! HTTP blob store client.
//!
//! Issues `DELETE {endpoint}/{bucket}/{key}` with each key segment
//! percent-encoded. Status handling:
//!
//! - 2xx: deleted
//! - 404/410: already absent
//! - 408/429/5xx, timeouts, connection errors: transient
//! - any other 4xx: permanent

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

use cachekeep_core::{AppConfig, DeleteOutcome, Error, ObjectStore};

use super::{ObjectStoreError, key_segments};

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "cachekeep/0.1";

/// HTTP object store configuration.
#[derive(Debug, Clone)]
pub struct HttpObjectStoreConfig {
    /// Base URL of the gateway, e.g. `http://minio:9000`.
    pub endpoint: String,
    pub bucket: String,
    /// Sent as `Authorization: Bearer ...` when set.
    pub token: Option<String>,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpObjectStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            bucket: "images".to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpObjectStoreConfig {
    pub fn from_app_config(endpoint: &str, config: &AppConfig) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            bucket: config.object_store_bucket.clone(),
            token: config.object_store_token.clone(),
            timeout: config.request_timeout(),
            ..Default::default()
        }
    }
}

/// Blob store reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    http: Client,
    endpoint: Url,
    config: HttpObjectStoreConfig,
}

impl HttpObjectStore {
    /// Create a new client, validating the endpoint up front.
    pub fn new(config: HttpObjectStoreConfig) -> Result<Self, ObjectStoreError> {
        let endpoint = Url::parse(config.endpoint.trim())
            .map_err(|e| ObjectStoreError::InvalidEndpoint(format!("{}: {e}", config.endpoint)))?;

        match endpoint.scheme() {
            "http" | "https" if !endpoint.cannot_be_a_base() => {}
            _ => return Err(ObjectStoreError::InvalidEndpoint(config.endpoint.clone())),
        }
        if config.bucket.trim().is_empty() {
            return Err(ObjectStoreError::InvalidEndpoint("bucket must not be empty".to_string()));
        }

        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .build()
            .map_err(|e| ObjectStoreError::Setup(e.to_string()))?;

        Ok(Self { http, endpoint, config })
    }

    /// Full URL for `key` inside the configured bucket.
    pub fn object_url(&self, key: &str) -> Result<Url, ObjectStoreError> {
        let segments = key_segments(key)?;
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| ObjectStoreError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .push(&self.config.bucket)
            .extend(segments);
        Ok(url)
    }

    async fn delete_object(&self, key: &str) -> Result<DeleteOutcome, ObjectStoreError> {
        let url = self.object_url(key)?;

        let mut request = self.http.delete(url);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!(key, status = status.as_u16(), "object store delete");

        classify_status(status)
    }
}

/// Map a DELETE response status onto an outcome.
pub fn classify_status(status: StatusCode) -> Result<DeleteOutcome, ObjectStoreError> {
    if status.is_success() {
        return Ok(DeleteOutcome::Deleted);
    }
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => Ok(DeleteOutcome::AlreadyAbsent),
        _ => Err(ObjectStoreError::HttpError { status: status.as_u16() }),
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn delete(&self, key: &str) -> Result<DeleteOutcome, Error> {
        self.delete_object(key).await.map_err(|e| e.into_store_error(key))
    }
}
