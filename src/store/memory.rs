//! In-process blob store and pointer registry

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{
    sha256_content_id, BlobMetadata, BlobStore, PointerRegistry, RegistryError, StoreError,
};
use crate::snapshot::{ContentId, PointerRecord};

#[derive(Debug)]
struct StoredBlob {
    bytes: Bytes,
    metadata: BlobMetadata,
    pinned: bool,
}

/// Blob store keyed by SHA-256 of the content.
///
/// Unpinned blobs stay fetchable until `collect_garbage` runs, the same
/// retention a remote pinning service may give them.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<ContentId, StoredBlob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, id: &ContentId) -> bool {
        self.blobs.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }

    pub async fn is_pinned(&self, id: &ContentId) -> bool {
        self.blobs.read().await.get(id).is_some_and(|b| b.pinned)
    }

    pub async fn metadata(&self, id: &ContentId) -> Option<BlobMetadata> {
        self.blobs.read().await.get(id).map(|b| b.metadata.clone())
    }

    /// Drop every unpinned blob; returns how many were removed
    pub async fn collect_garbage(&self) -> usize {
        let mut blobs = self.blobs.write().await;
        let before = blobs.len();
        blobs.retain(|_, b| b.pinned);
        before - blobs.len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, bytes: Bytes, metadata: &BlobMetadata) -> Result<ContentId, StoreError> {
        let id = sha256_content_id(&bytes);
        self.blobs.write().await.insert(
            id.clone(),
            StoredBlob {
                bytes,
                metadata: metadata.clone(),
                pinned: true,
            },
        );
        Ok(id)
    }

    async fn fetch(&self, id: &ContentId) -> Result<Bytes, StoreError> {
        self.blobs
            .read()
            .await
            .get(id)
            .map(|b| b.bytes.clone())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn unpin(&self, id: &ContentId) -> Result<(), StoreError> {
        match self.blobs.write().await.get_mut(id) {
            Some(blob) => {
                blob.pinned = false;
                Ok(())
            }
            None => Err(StoreError::NotFound(id.clone())),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryPointerRegistry {
    records: RwLock<HashMap<String, PointerRecord>>,
}

impl MemoryPointerRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PointerRegistry for MemoryPointerRegistry {
    async fn get(&self, workspace_id: &str) -> Result<Option<PointerRecord>, RegistryError> {
        Ok(self.records.read().await.get(workspace_id).cloned())
    }

    async fn set(
        &self,
        workspace_id: &str,
        content_id: &ContentId,
    ) -> Result<PointerRecord, RegistryError> {
        let record = PointerRecord::new(workspace_id, content_id.clone());
        self.records
            .write()
            .await
            .insert(workspace_id.to_string(), record.clone());
        Ok(record)
    }
}
