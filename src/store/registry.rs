//! File-backed pointer registry
//!
//! All pointers live in one JSON document keyed by workspace id. Every
//! `set` rewrites the document via temp file + rename while holding the
//! registry lock, so a reader in this process never observes a stale or
//! partially written pointer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use super::{PointerRegistry, RegistryError};
use crate::snapshot::{ContentId, PointerRecord};
use crate::util::fs::atomic_write;

/// On-disk layout of the registry file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistryFile {
    version: u32,
    #[serde(default)]
    pointers: BTreeMap<String, PointerRecord>,
}

impl Default for RegistryFile {
    fn default() -> Self {
        Self {
            version: 1,
            pointers: BTreeMap::new(),
        }
    }
}

pub struct FilePointerRegistry {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FilePointerRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All recorded pointers, ordered by workspace id
    pub async fn list(&self) -> Result<Vec<PointerRecord>, RegistryError> {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        let file = blocking(move || load(&path)).await?;
        Ok(file.pointers.into_values().collect())
    }
}

fn load(path: &Path) -> Result<RegistryFile, RegistryError> {
    if !path.exists() {
        return Ok(RegistryFile::default());
    }
    let content = fs::read_to_string(path).map_err(|e| RegistryError::ReadError(e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| RegistryError::ParseError(e.to_string()))
}

fn save(path: &Path, file: &RegistryFile) -> Result<(), RegistryError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| RegistryError::WriteError(e.to_string()))?;
    }
    let content =
        serde_json::to_vec_pretty(file).map_err(|e| RegistryError::WriteError(e.to_string()))?;
    atomic_write(path, &content).map_err(|e| RegistryError::WriteError(e.to_string()))
}

async fn blocking<T, F>(f: F) -> Result<T, RegistryError>
where
    F: FnOnce() -> Result<T, RegistryError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| RegistryError::ReadError(format!("registry task panicked: {}", e)))?
}

#[async_trait]
impl PointerRegistry for FilePointerRegistry {
    async fn get(&self, workspace_id: &str) -> Result<Option<PointerRecord>, RegistryError> {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        let mut file = blocking(move || load(&path)).await?;
        Ok(file.pointers.remove(workspace_id))
    }

    async fn set(
        &self,
        workspace_id: &str,
        content_id: &ContentId,
    ) -> Result<PointerRecord, RegistryError> {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        let record = PointerRecord::new(workspace_id, content_id.clone());
        let to_store = record.clone();

        blocking(move || {
            let mut file = load(&path)?;
            file.pointers
                .insert(to_store.workspace_id.clone(), to_store);
            save(&path, &file)
        })
        .await?;

        debug!("Pointer for {} -> {}", workspace_id, content_id);
        Ok(record)
    }
}
