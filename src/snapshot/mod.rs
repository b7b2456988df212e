//! Snapshot engine - workspace commit and restore
//!
//! This module provides:
//! - The snapshot record and its canonical encoding
//! - Workspace scanning (StateSerializer)
//! - Writing snapshots back to disk (FileMaterializer)
//! - Commit/restore orchestration over a blob store and pointer registry

pub mod app_state;
pub mod engine;
pub mod error;
pub mod ignore;
pub mod materializer;
pub mod model;
pub mod serializer;

pub use app_state::{AppStateProvider, JsonAppState, NoAppState};
pub use engine::{CommitOutcome, RestoreOutcome, SnapshotEngine};
pub use error::{Diagnostic, SnapshotError};
pub use ignore::IgnoreRules;
pub use materializer::FileMaterializer;
pub use model::{ContentId, PointerRecord, WorkspaceSnapshot, SCHEMA_VERSION};
pub use serializer::{
    ScanResult, SerializerOptions, StateSerializer, DEFAULT_MAX_FILES, DEFAULT_MAX_FILE_BYTES,
};
