//! SnapshotEngine: commit and restore orchestration
//!
//! Commit: scan → upload → read old pointer → set pointer → unpin old.
//! The pointer is only written after the upload succeeded, so an upload
//! failure or a cancelled commit leaves it untouched. Unpinning the
//! superseded blob is best-effort.
//!
//! Restore: fetch → validate → materialize. Nothing is written when the
//! blob fails validation.
//!
//! The engine does no locking of its own; callers serialize operations on
//! the same workspace id.

use bytes::Bytes;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::app_state::AppStateProvider;
use super::error::{Diagnostic, SnapshotError};
use super::materializer::FileMaterializer;
use super::model::{ContentId, PointerRecord, WorkspaceSnapshot, SCHEMA_VERSION};
use super::serializer::{ScanResult, StateSerializer};
use crate::config::{ConfigError, EngineConfig, StoreKind};
use crate::store::{
    BlobMetadata, BlobStore, FilePointerRegistry, LocalBlobStore, PinningServiceStore,
    PointerRegistry,
};

/// Result of a successful commit
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub content_id: ContentId,
    /// Pointer value replaced by this commit, if any
    pub previous: Option<ContentId>,
    pub pointer: PointerRecord,
    pub file_count: usize,
    pub folder_count: usize,
    /// The file cap was hit and some entries were not captured
    pub truncated: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Result of a successful restore
#[derive(Debug, Clone)]
pub struct RestoreOutcome {
    pub content_id: ContentId,
    pub snapshot: WorkspaceSnapshot,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct SnapshotEngine {
    store: Arc<dyn BlobStore>,
    registry: Arc<dyn PointerRegistry>,
    serializer: Arc<StateSerializer>,
    materializer: FileMaterializer,
}

impl SnapshotEngine {
    pub fn new(store: Arc<dyn BlobStore>, registry: Arc<dyn PointerRegistry>) -> Self {
        Self {
            store,
            registry,
            serializer: Arc::new(StateSerializer::default()),
            materializer: FileMaterializer::new(),
        }
    }

    pub fn with_serializer(mut self, serializer: StateSerializer) -> Self {
        self.serializer = Arc::new(serializer);
        self
    }

    /// Build an engine with the store and registry selected by `config`
    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        let store: Arc<dyn BlobStore> = match config.store.kind {
            StoreKind::Pinning => Arc::new(PinningServiceStore::new(&config.pinning)?),
            StoreKind::Local => Arc::new(LocalBlobStore::new(config.blob_dir()?)),
        };
        let registry: Arc<dyn PointerRegistry> =
            Arc::new(FilePointerRegistry::new(config.registry_path()?));

        Ok(Self::new(store, registry)
            .with_serializer(StateSerializer::new(config.serializer_options())))
    }

    /// Snapshot `scan_root` and make it the current snapshot of `workspace_id`
    pub async fn commit(
        &self,
        workspace_id: &str,
        scan_root: &Path,
        app_state: &dyn AppStateProvider,
    ) -> Result<CommitOutcome, SnapshotError> {
        check_workspace_id(workspace_id)?;

        let scan = self
            .scan(workspace_id, scan_root, app_state.app_state())
            .await?;
        let ScanResult {
            snapshot,
            diagnostics,
            truncated,
            binary_skipped,
        } = scan;

        if truncated {
            info!(
                "Snapshot of {} truncated at {} files",
                workspace_id,
                snapshot.files.len()
            );
        }
        if binary_skipped > 0 {
            debug!("Skipped {} non-text files", binary_skipped);
        }

        let bytes = Bytes::from(snapshot.to_canonical_bytes()?);
        let metadata = BlobMetadata::new(format!("wsnap-{}", workspace_id))
            .with("workspaceId", workspace_id)
            .with("schemaVersion", snapshot.schema_version.clone())
            .with("createdAt", snapshot.created_at.to_rfc3339());

        let content_id = self
            .store
            .upload(bytes, &metadata)
            .await
            .map_err(SnapshotError::UploadFailed)?;

        let previous = self
            .registry
            .get(workspace_id)
            .await?
            .map(|record| record.current_content_id);
        let pointer = self.registry.set(workspace_id, &content_id).await?;

        info!(
            "Committed {} as {} ({} files, {} folders, {} diagnostics)",
            workspace_id,
            content_id,
            snapshot.files.len(),
            snapshot.folders.len(),
            diagnostics.len()
        );

        if let Some(old) = previous.as_ref().filter(|old| **old != content_id) {
            if let Err(e) = self.store.unpin(old).await {
                warn!("Failed to unpin superseded snapshot {}: {}", old, e);
            }
        }

        Ok(CommitOutcome {
            content_id,
            previous,
            pointer,
            file_count: snapshot.files.len(),
            folder_count: snapshot.folders.len(),
            truncated,
            diagnostics,
        })
    }

    /// Fetch `content_id` and write its files under `root`
    pub async fn restore(
        &self,
        content_id: &ContentId,
        root: &Path,
    ) -> Result<RestoreOutcome, SnapshotError> {
        let bytes = self
            .store
            .fetch(content_id)
            .await
            .map_err(SnapshotError::FetchFailed)?;

        let snapshot = WorkspaceSnapshot::from_blob(&bytes)?;
        if snapshot.schema_version != SCHEMA_VERSION {
            warn!(
                "Snapshot {} has schema version {} (expected {})",
                content_id, snapshot.schema_version, SCHEMA_VERSION
            );
        }

        let materializer = self.materializer;
        let to_write = snapshot.clone();
        let target: PathBuf = root.to_path_buf();
        let diagnostics =
            tokio::task::spawn_blocking(move || materializer.materialize(&to_write, &target))
                .await??;

        info!(
            "Restored {} ({}) into {:?}: {} files, {} diagnostics",
            content_id,
            snapshot.workspace_id,
            root,
            snapshot.files.len(),
            diagnostics.len()
        );

        Ok(RestoreOutcome {
            content_id: content_id.clone(),
            snapshot,
            diagnostics,
        })
    }

    /// Restore whatever snapshot the pointer of `workspace_id` names
    pub async fn restore_current(
        &self,
        workspace_id: &str,
        root: &Path,
    ) -> Result<RestoreOutcome, SnapshotError> {
        let record = self
            .current(workspace_id)
            .await?
            .ok_or_else(|| SnapshotError::NoSnapshot(workspace_id.to_string()))?;
        self.restore(&record.current_content_id, root).await
    }

    pub async fn current(
        &self,
        workspace_id: &str,
    ) -> Result<Option<PointerRecord>, SnapshotError> {
        check_workspace_id(workspace_id)?;
        Ok(self.registry.get(workspace_id).await?)
    }

    async fn scan(
        &self,
        workspace_id: &str,
        scan_root: &Path,
        app_state: Value,
    ) -> Result<ScanResult, SnapshotError> {
        let serializer = Arc::clone(&self.serializer);
        let workspace_id = workspace_id.to_string();
        let scan_root = scan_root.to_path_buf();
        tokio::task::spawn_blocking(move || serializer.scan(&workspace_id, &scan_root, app_state))
            .await?
    }
}

fn check_workspace_id(workspace_id: &str) -> Result<(), SnapshotError> {
    if workspace_id.trim().is_empty() {
        return Err(SnapshotError::InvalidWorkspaceId(workspace_id.to_string()));
    }
    Ok(())
}
