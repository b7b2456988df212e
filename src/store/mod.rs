//! Blob store and pointer registry contracts, plus the adapters shipped
//! with the crate
//!
//! - `PinningServiceStore`: remote pinning service over HTTP
//! - `LocalBlobStore` / `MemoryBlobStore`: SHA-256 addressed stores
//! - `FilePointerRegistry` / `MemoryPointerRegistry`: current-pointer storage

pub mod local;
pub mod memory;
pub mod pinning;
pub mod registry;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::snapshot::{ContentId, PointerRecord};

pub use local::LocalBlobStore;
pub use memory::{MemoryBlobStore, MemoryPointerRegistry};
pub use pinning::PinningServiceStore;
pub use registry::FilePointerRegistry;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Blob not found: {0}")]
    NotFound(ContentId),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Store rejected request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode store response: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to read pointer registry: {0}")]
    ReadError(String),
    #[error("Failed to write pointer registry: {0}")]
    WriteError(String),
    #[error("Failed to parse pointer registry: {0}")]
    ParseError(String),
}

/// Descriptive metadata sent with an upload; stores may index or ignore it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlobMetadata {
    pub name: String,
    pub keyvalues: BTreeMap<String, String>,
}

impl BlobMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keyvalues: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.keyvalues.insert(key.to_string(), value.into());
        self
    }
}

/// Content-addressed blob storage with pin retention
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` and return the id that retrieves exactly these bytes
    async fn upload(&self, bytes: Bytes, metadata: &BlobMetadata) -> Result<ContentId, StoreError>;

    async fn fetch(&self, id: &ContentId) -> Result<Bytes, StoreError>;

    /// Signal that `id` may be garbage-collected
    async fn unpin(&self, id: &ContentId) -> Result<(), StoreError>;
}

/// Per-workspace record of the current snapshot.
///
/// Implementations must be read-after-write consistent within a process.
#[async_trait]
pub trait PointerRegistry: Send + Sync {
    async fn get(&self, workspace_id: &str) -> Result<Option<PointerRecord>, RegistryError>;

    async fn set(
        &self,
        workspace_id: &str,
        content_id: &ContentId,
    ) -> Result<PointerRecord, RegistryError>;
}

/// Lowercase hex SHA-256 of `data`, the id scheme of the local stores
pub fn sha256_content_id(data: &[u8]) -> ContentId {
    let digest = Sha256::digest(data);
    ContentId::new(digest.iter().map(|b| format!("{b:02x}")).collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_content_id() {
        let id = sha256_content_id(b"hello");
        assert_eq!(
            id.as_str(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_ne!(sha256_content_id(b"hello"), sha256_content_id(b"world"));
    }

    #[test]
    fn test_metadata_builder() {
        let meta = BlobMetadata::new("wsnap-ws").with("workspaceId", "ws");
        assert_eq!(meta.keyvalues.get("workspaceId").map(String::as_str), Some("ws"));
    }
}
