use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::errors::ServiceError;

/// Binary asset store for evidence photos. The core keeps only the opaque
/// `key`; where the bytes actually live is this trait's concern.
#[async_trait]
pub trait EvidenceStorage: Send + Sync {
    async fn store(&self, key: &str, bytes: &[u8]) -> Result<(), ServiceError>;
    async fn delete(&self, key: &str) -> Result<(), ServiceError>;
    /// Public URL path observers use to fetch the asset.
    fn public_url(&self, key: &str) -> String;
}

/// Filesystem-backed storage rooted at a configured directory, served under
/// `/media` by the HTTP layer.
pub struct FsEvidenceStorage {
    root: PathBuf,
}

impl FsEvidenceStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ServiceError> {
        // Keys are generated server-side, but reject traversal anyway.
        if key.split('/').any(|part| part == "..") || key.starts_with('/') {
            return Err(ServiceError::StorageError(format!(
                "invalid storage key '{key}'"
            )));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl EvidenceStorage for FsEvidenceStorage {
    async fn store(&self, key: &str, bytes: &[u8]) -> Result<(), ServiceError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ServiceError::StorageError(e.to_string()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ServiceError::StorageError(e.to_string()))?;
        debug!(key = %key, bytes = bytes.len(), "Stored evidence asset");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            // Already gone is fine; the record is what matters.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(key = %key, "Evidence asset already absent on delete");
                Ok(())
            }
            Err(e) => Err(ServiceError::StorageError(e.to_string())),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("/media/{key}")
    }
}
