//! Attachment blob storage.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{Error, Result};

/// A stored attachment payload.
#[derive(Debug, Clone)]
pub struct Blob {
    /// Filename to present in the message.
    pub filename: String,
    /// Raw bytes.
    pub data: Vec<u8>,
}

/// Resolves a campaign's attachment reference to its bytes.
///
/// Returning `Ok(None)` means the blob is missing; the dispatcher sends
/// without the attachment rather than failing the recipient.
pub trait BlobStore {
    /// Fetches the blob for a reference.
    fn fetch(&self, reference: &str) -> impl Future<Output = Result<Option<Blob>>> + Send;
}

/// [`BlobStore`] over a directory on disk. References are paths
/// relative to the root.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Creates a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, reference: &str) -> Result<PathBuf> {
        let relative = Path::new(reference);
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            return Err(Error::Blob(format!(
                "reference escapes blob root: {reference}"
            )));
        }

        Ok(self.root.join(relative))
    }
}

impl BlobStore for FsBlobStore {
    async fn fetch(&self, reference: &str) -> Result<Option<Blob>> {
        let path = self.resolve(reference)?;
        match tokio::fs::read(&path).await {
            Ok(data) => {
                let filename = path
                    .file_name()
                    .map_or_else(|| reference.to_string(), |n| n.to_string_lossy().into_owned());
                Ok(Some(Blob { filename, data }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory [`BlobStore`] for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, Blob>>>,
}

impl MemoryBlobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a blob under a reference.
    pub async fn put(&self, reference: impl Into<String>, filename: impl Into<String>, data: Vec<u8>) {
        self.blobs.write().await.insert(
            reference.into(),
            Blob {
                filename: filename.into(),
                data,
            },
        );
    }
}

impl BlobStore for MemoryBlobStore {
    async fn fetch(&self, reference: &str) -> Result<Option<Blob>> {
        Ok(self.blobs.read().await.get(reference).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fs_store_rejects_traversal() {
        let store = FsBlobStore::new("/tmp/blobs");
        assert!(matches!(
            store.fetch("../etc/passwd").await,
            Err(Error::Blob(_))
        ));
        assert!(matches!(
            store.fetch("/etc/passwd").await,
            Err(Error::Blob(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryBlobStore::new();
        store.put("resumes/a.pdf", "a.pdf", b"%PDF".to_vec()).await;

        let blob = store.fetch("resumes/a.pdf").await.unwrap().unwrap();
        assert_eq!(blob.filename, "a.pdf");
        assert_eq!(blob.data, b"%PDF");

        assert!(store.fetch("missing").await.unwrap().is_none());
    }
}
