//! Blob store clients implementing the core `ObjectStore` port.
//!
//! - **HTTP**: `DELETE {endpoint}/{bucket}/{key}` against an S3-style gateway,
//!   with optional bearer auth. 404/410 count as already gone.
//! - **Filesystem**: blobs as files under a root directory.
//!
//! Both validate keys the same way so a key can never address anything
//! outside its bucket or root.

pub mod error;
pub mod fs;
pub mod http;

pub use error::ObjectStoreError;
pub use fs::FsObjectStore;
pub use http::{HttpObjectStore, HttpObjectStoreConfig, classify_status};

use std::sync::Arc;

use cachekeep_core::{AppConfig, ObjectStore};

/// Split a blob key into path segments, rejecting anything that could escape
/// the bucket: empty keys, absolute keys, empty segments and dot segments.
pub fn key_segments(key: &str) -> Result<Vec<&str>, ObjectStoreError> {
    if key.is_empty() {
        return Err(ObjectStoreError::InvalidKey("empty key".to_string()));
    }
    if key.starts_with('/') || key.starts_with('\\') {
        return Err(ObjectStoreError::InvalidKey(format!("{key}: absolute keys are not allowed")));
    }

    let segments: Vec<&str> = key.split('/').collect();
    for segment in &segments {
        if segment.is_empty() {
            return Err(ObjectStoreError::InvalidKey(format!("{key}: empty path segment")));
        }
        if *segment == "." || *segment == ".." {
            return Err(ObjectStoreError::InvalidKey(format!("{key}: dot segments are not allowed")));
        }
        if segment.contains('\\') || segment.contains('\0') {
            return Err(ObjectStoreError::InvalidKey(format!("{key}: illegal character")));
        }
    }

    Ok(segments)
}

/// Build the configured blob store: HTTP when `object_store_url` is set,
/// otherwise the filesystem store rooted at `object_store_dir`.
pub fn object_store_from_config(config: &AppConfig) -> Result<Arc<dyn ObjectStore>, ObjectStoreError> {
    match &config.object_store_url {
        Some(endpoint) => {
            let store = HttpObjectStore::new(HttpObjectStoreConfig::from_app_config(endpoint, config))?;
            tracing::info!(endpoint = %endpoint, bucket = %config.object_store_bucket, "using HTTP object store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!(root = %config.object_store_dir.display(), "using filesystem object store");
            Ok(Arc::new(FsObjectStore::new(&config.object_store_dir)))
        }
    }
}
