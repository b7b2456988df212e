//! Terminal errors and non-fatal diagnostics of snapshot operations

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::store::{RegistryError, StoreError};

/// Failure that aborts a whole commit or restore
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Upload failed: {0}")]
    UploadFailed(#[source] StoreError),

    #[error("Fetch failed: {0}")]
    FetchFailed(#[source] StoreError),

    #[error("Invalid snapshot format: {0}")]
    InvalidFormat(String),

    #[error("Failed to encode snapshot: {0}")]
    Encode(String),

    #[error("Pointer registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid workspace id: {0:?}")]
    InvalidWorkspaceId(String),

    #[error("No snapshot recorded for workspace '{0}'")]
    NoSnapshot(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl SnapshotError {
    /// Short machine-readable code, printed by the host binary on failure
    pub fn code(&self) -> &str {
        match self {
            SnapshotError::UploadFailed(_) => "upload_failed",
            SnapshotError::FetchFailed(_) => "fetch_failed",
            SnapshotError::InvalidFormat(_) => "invalid_format",
            SnapshotError::Encode(_) => "encode_error",
            SnapshotError::Registry(_) => "registry_error",
            SnapshotError::Io(_) => "io_error",
            SnapshotError::InvalidWorkspaceId(_) => "invalid_workspace_id",
            SnapshotError::NoSnapshot(_) => "no_snapshot",
            SnapshotError::Task(_) => "internal_error",
        }
    }
}

impl From<tokio::task::JoinError> for SnapshotError {
    fn from(e: tokio::task::JoinError) -> Self {
        SnapshotError::Task(e.to_string())
    }
}

/// Per-file problem collected during a successful operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// File could not be read while scanning; it is absent from the snapshot
    PartialRead { path: String, reason: String },
    /// File could not be written while materializing; other files were still written
    PartialWrite { path: String, reason: String },
}

impl Diagnostic {
    pub fn path(&self) -> &str {
        match self {
            Diagnostic::PartialRead { path, .. } | Diagnostic::PartialWrite { path, .. } => path,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::PartialRead { path, reason } => write!(f, "read {}: {}", path, reason),
            Diagnostic::PartialWrite { path, reason } => write!(f, "write {}: {}", path, reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let err = SnapshotError::UploadFailed(StoreError::Network("reset".into()));
        assert_eq!(err.code(), "upload_failed");
        let err: SnapshotError = RegistryError::WriteError("full".into()).into();
        assert_eq!(err.code(), "registry_error");
        assert_eq!(SnapshotError::NoSnapshot("ws".into()).code(), "no_snapshot");
    }

    #[test]
    fn test_diagnostic_json() {
        let diag = Diagnostic::PartialWrite {
            path: "a.txt".into(),
            reason: "denied".into(),
        };
        assert_eq!(
            serde_json::to_value(&diag).unwrap(),
            serde_json::json!({"kind": "partial_write", "path": "a.txt", "reason": "denied"})
        );
    }
}
