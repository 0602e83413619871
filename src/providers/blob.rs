//! Blob store trait: resolve an ingestion trigger's location to bytes

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// A fetched document object
#[derive(Debug, Clone)]
pub struct BlobObject {
    /// Raw document bytes
    pub data: Vec<u8>,
    /// Last modification time, when the store exposes one
    pub last_modified: Option<DateTime<Utc>>,
}

/// Trait for raw document storage
///
/// Implementations:
/// - `FsBlobStore`: local filesystem rooted at a configured directory
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the object at a location
    async fn fetch(&self, location: &str) -> Result<BlobObject>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Filesystem-backed blob store
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Create a store rooted at a directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn fetch(&self, location: &str) -> Result<BlobObject> {
        // Locations are object keys, never absolute paths.
        if location.starts_with('/') || location.split('/').any(|seg| seg == "..") {
            return Err(Error::validation(format!(
                "Invalid document location: {}",
                location
            )));
        }

        let path = self.root.join(location);
        let data = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::DocumentNotFound(location.to_string())
            } else {
                Error::Io(e)
            }
        })?;

        let last_modified = tokio::fs::metadata(&path)
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from);

        Ok(BlobObject {
            data,
            last_modified,
        })
    }

    fn name(&self) -> &str {
        "fs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_traversal_locations() {
        let store = FsBlobStore::new("/tmp");
        assert!(store.fetch("../etc/passwd").await.is_err());
        assert!(store.fetch("/etc/passwd").await.is_err());
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let store = FsBlobStore::new(std::env::temp_dir());
        let err = store
            .fetch("no-such-file-0b1c2d.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DocumentNotFound(_)));
    }
}
