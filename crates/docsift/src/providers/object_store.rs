//! Object store trait for raw document bytes

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Trait for retrieving raw document bytes by (bucket, path)
///
/// Implementations:
/// - `LocalObjectStore`: local filesystem, one directory per bucket
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Download an object's bytes
    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>>;

    /// Get store name for logging
    fn name(&self) -> &str;
}

/// Filesystem-backed object store. Buckets are subdirectories of the root.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, bucket: &str, path: &str) -> PathBuf {
        self.root.join(bucket).join(path)
    }

    /// Write an object, creating parent directories as needed
    pub async fn upload(&self, bucket: &str, path: &str, data: &[u8]) -> Result<()> {
        let full = self.object_path(bucket, path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, data).await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>> {
        let full = self.object_path(bucket, path);
        tokio::fs::read(&full).await.map_err(|e| {
            Error::ObjectStore(format!("failed to read {}/{}: {}", bucket, path, e))
        })
    }

    fn name(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_download_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        store
            .upload("documents", "t1/report.csv", b"a,b\n1,2\n")
            .await
            .unwrap();
        let data = store.download("documents", "t1/report.csv").await.unwrap();
        assert_eq!(data, b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn missing_object_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let err = store.download("documents", "nope.xlsx").await.unwrap_err();
        assert!(matches!(err, Error::ObjectStore(_)));
    }
}
