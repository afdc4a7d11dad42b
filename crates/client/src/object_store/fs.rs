//! Filesystem blob store: each key is a file under `root`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use cachekeep_core::{DeleteOutcome, Error, ObjectStore};

use super::{ObjectStoreError, key_segments};

#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `key` to a path inside the root.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, ObjectStoreError> {
        let mut path = self.root.clone();
        for segment in key_segments(key)? {
            path.push(segment);
        }
        Ok(path)
    }

    /// Write a blob, creating parent directories as needed.
    pub async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ObjectStoreError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn delete_file(&self, key: &str) -> Result<DeleteOutcome, ObjectStoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(DeleteOutcome::Deleted),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(DeleteOutcome::AlreadyAbsent),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn delete(&self, key: &str) -> Result<DeleteOutcome, Error> {
        let outcome = self.delete_file(key).await.map_err(|e| e.into_store_error(key))?;
        tracing::debug!(key, ?outcome, "filesystem blob delete");
        Ok(outcome)
    }
}
