//! Directory-backed content-addressed blob store
//!
//! Each blob lives at `<dir>/<sha256-hex>`. Unpinning deletes the file
//! immediately, so a superseded snapshot can no longer be restored once a
//! newer commit has replaced it.

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{sha256_content_id, BlobMetadata, BlobStore, StoreError};
use crate::snapshot::ContentId;
use crate::util::fs::atomic_write;

#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    dir: PathBuf,
}

impl LocalBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a blob; ids that are not plain hex digests are rejected
    fn object_path(&self, id: &ContentId) -> Result<PathBuf, StoreError> {
        let valid = !id.as_str().is_empty() && id.as_str().chars().all(|c| c.is_ascii_hexdigit());
        if !valid {
            return Err(StoreError::NotFound(id.clone()));
        }
        Ok(self.dir.join(id.as_str()))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, bytes: Bytes, metadata: &BlobMetadata) -> Result<ContentId, StoreError> {
        let id = sha256_content_id(&bytes);
        let path = self.object_path(&id)?;
        let dir = self.dir.clone();

        tokio::task::spawn_blocking(move || -> io::Result<()> {
            std::fs::create_dir_all(&dir)?;
            if path.exists() {
                return Ok(());
            }
            atomic_write(&path, &bytes)
        })
        .await
        .map_err(|e| StoreError::Io(io::Error::new(io::ErrorKind::Other, e)))??;

        debug!("Stored blob {} ({})", id, metadata.name);
        Ok(id)
    }

    async fn fetch(&self, id: &ContentId) -> Result<Bytes, StoreError> {
        let path = self.object_path(id)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound(id.clone())),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn unpin(&self, id: &ContentId) -> Result<(), StoreError> {
        let path = self.object_path(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound(id.clone())),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}
