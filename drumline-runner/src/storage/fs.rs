//! Filesystem-backed object store
//!
//! Keys map onto paths under a root directory. Used for local development
//! and tests; an S3-style store plugs in behind the same trait.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::{ObjectStore, StorageError};

pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty() || key.starts_with('/') || key.split('/').any(|part| part == "..") {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn fetch(&self, key: &str, dest: &Path) -> Result<(), StorageError> {
        let source = self.resolve(key)?;
        if !source.is_file() {
            return Err(StorageError::NotFound(key.to_string()));
        }

        tokio::fs::copy(&source, dest).await?;
        debug!(key, dest = %dest.display(), "fetched object");
        Ok(())
    }

    async fn store(
        &self,
        local: &Path,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let target = self.resolve(key)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::copy(local, &target).await?;
        debug!(key, content_type, "stored object");
        Ok(key.to_string())
    }

    async fn presign_download(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        let path = self.resolve(key)?;
        if !path.is_file() {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let expires_at = chrono::Utc::now() + chrono::Duration::seconds(ttl.as_secs() as i64);
        Ok(format!(
            "file://{}?expires={}",
            path.display(),
            expires_at.timestamp()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, tempfile::TempDir, FsObjectStore) {
        let root = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(root.path()).unwrap();
        (root, scratch, store)
    }

    #[tokio::test]
    async fn test_store_then_fetch() {
        let (_root, scratch, store) = setup();

        let local = scratch.path().join("drums.mid");
        std::fs::write(&local, b"MThd").unwrap();

        let key = store
            .store(&local, "results/job-1/drums.mid", "audio/midi")
            .await
            .unwrap();
        assert_eq!(key, "results/job-1/drums.mid");

        let dest = scratch.path().join("fetched.mid");
        store.fetch(&key, &dest).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"MThd");
    }

    #[tokio::test]
    async fn test_fetch_missing_key() {
        let (_root, scratch, store) = setup();
        let dest = scratch.path().join("out.wav");

        let err = store.fetch("uploads/nothing.wav", &dest).await;
        assert!(matches!(err, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rejects_traversal_keys() {
        let (_root, scratch, store) = setup();
        let dest = scratch.path().join("out");

        assert!(matches!(
            store.fetch("../etc/passwd", &dest).await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            store.fetch("/absolute", &dest).await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_presign_download() {
        let (_root, scratch, store) = setup();

        let local = scratch.path().join("score.pdf");
        std::fs::write(&local, b"%PDF").unwrap();
        store
            .store(&local, "results/job-1/score.pdf", "application/pdf")
            .await
            .unwrap();

        let url = store
            .presign_download("results/job-1/score.pdf", Duration::from_secs(600))
            .await
            .unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.contains("expires="));

        let missing = store
            .presign_download("results/job-1/other.pdf", Duration::from_secs(600))
            .await;
        assert!(matches!(missing, Err(StorageError::NotFound(_))));
    }
}
