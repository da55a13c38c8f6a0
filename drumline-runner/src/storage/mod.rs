//! Durable object storage
//!
//! The pipeline treats storage as a plain key/bytes store: fetch an input,
//! store an artifact, presign a download. Bucket, region, and credential
//! resolution belong to the concrete implementation behind the trait.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub mod fs;

pub use fs::FsObjectStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object '{0}' not found")]
    NotFound(String),

    #[error("invalid storage key '{0}'")]
    InvalidKey(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Downloads the object at `key` into `dest`
    async fn fetch(&self, key: &str, dest: &Path) -> Result<(), StorageError>;

    /// Uploads the local file under `key` with the given content type,
    /// returning the durable reference for the stored object
    async fn store(
        &self,
        local: &Path,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError>;

    /// Produces a time-limited download URL for a stored object
    async fn presign_download(&self, key: &str, ttl: Duration) -> Result<String, StorageError>;
}

/// Content type inferred from the file suffix, used when publishing
/// artifacts. Downstream consumers rely on exactly this table.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mid" | "midi" => "audio/midi",
        "mp3" | "wav" => "audio/mpeg",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_content_type_table() {
        assert_eq!(content_type_for(&PathBuf::from("drums.mid")), "audio/midi");
        assert_eq!(content_type_for(&PathBuf::from("a/b.MIDI")), "audio/midi");
        assert_eq!(content_type_for(&PathBuf::from("guide.wav")), "audio/mpeg");
        assert_eq!(content_type_for(&PathBuf::from("song.mp3")), "audio/mpeg");
        assert_eq!(
            content_type_for(&PathBuf::from("score.pdf")),
            "application/pdf"
        );
        assert_eq!(
            content_type_for(&PathBuf::from("notes.txt")),
            "application/octet-stream"
        );
        assert_eq!(
            content_type_for(&PathBuf::from("no_extension")),
            "application/octet-stream"
        );
    }
}
