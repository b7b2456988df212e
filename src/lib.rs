//! wsnap-core: workspace snapshots over a content-addressed pinning service.
//!
//! A workspace (text files, folder layout and opaque application state) is
//! serialized into one immutable blob, uploaded to a [`store::BlobStore`],
//! and recorded as the workspace's current snapshot in a
//! [`store::PointerRegistry`]. Any blob can later be restored onto disk.

pub mod config;
pub mod snapshot;
pub mod store;
pub mod util;

pub use config::{ConfigError, EngineConfig};
pub use snapshot::{
    AppStateProvider, CommitOutcome, ContentId, Diagnostic, NoAppState, PointerRecord,
    RestoreOutcome, SnapshotEngine, SnapshotError, WorkspaceSnapshot,
};
pub use store::{BlobStore, PointerRegistry};
