//! StateSerializer: scans a workspace tree into a `WorkspaceSnapshot`
//!
//! Entries are walked in file-name order per directory so repeated scans of
//! an unchanged tree produce the same snapshot. Ignored directories are
//! pruned rather than walked. Scanning stops once the file cap is reached.

use serde_json::Value;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::app_state::AppStateProvider;
use super::error::{Diagnostic, SnapshotError};
use super::ignore::IgnoreRules;
use super::model::WorkspaceSnapshot;

/// Maximum number of files captured in one snapshot
pub const DEFAULT_MAX_FILES: usize = 100;

/// Files above this size are skipped: 1MB
pub const DEFAULT_MAX_FILE_BYTES: u64 = 1_048_576;

#[derive(Debug, Clone)]
pub struct SerializerOptions {
    pub ignore: IgnoreRules,
    pub max_files: usize,
    pub max_file_bytes: u64,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            ignore: IgnoreRules::defaults(),
            max_files: DEFAULT_MAX_FILES,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

/// Result of one scan
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub snapshot: WorkspaceSnapshot,
    pub diagnostics: Vec<Diagnostic>,
    /// Entries were left unscanned because the file cap was reached
    pub truncated: bool,
    /// Files skipped because their content is not text
    pub binary_skipped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct StateSerializer {
    options: SerializerOptions,
}

enum FileContent {
    Text(String),
    Binary,
}

impl StateSerializer {
    pub fn new(options: SerializerOptions) -> Self {
        Self { options }
    }

    /// Scan `scan_root` and attach the provider's application state
    pub fn serialize(
        &self,
        workspace_id: &str,
        scan_root: &Path,
        app_state: &dyn AppStateProvider,
    ) -> Result<ScanResult, SnapshotError> {
        self.scan(workspace_id, scan_root, app_state.app_state())
    }

    /// Scan `scan_root` with an already-captured application state.
    ///
    /// Only an unreadable scan root is an error; problems with individual
    /// entries are reported as diagnostics.
    pub fn scan(
        &self,
        workspace_id: &str,
        scan_root: &Path,
        app_state: Value,
    ) -> Result<ScanResult, SnapshotError> {
        let root_meta = fs::metadata(scan_root)?;
        if !root_meta.is_dir() {
            return Err(SnapshotError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("scan root is not a directory: {}", scan_root.display()),
            )));
        }

        let mut snapshot = WorkspaceSnapshot::new(workspace_id, app_state);
        let mut diagnostics = Vec::new();
        let mut truncated = false;
        let mut binary_skipped = 0;

        let ignore = &self.options.ignore;
        let walker = WalkDir::new(scan_root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| match relative_path(scan_root, entry.path()) {
                Some(rel) => !ignore.is_ignored(&rel),
                None => true,
            });

        for entry in walker {
            if snapshot.files.len() >= self.options.max_files {
                truncated = true;
                break;
            }

            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    let path = e
                        .path()
                        .and_then(|p| relative_path(scan_root, p))
                        .unwrap_or_default();
                    warn!("Failed to read entry {:?}: {}", path, e);
                    diagnostics.push(Diagnostic::PartialRead {
                        path,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let Some(rel) = relative_path(scan_root, entry.path()) else {
                diagnostics.push(Diagnostic::PartialRead {
                    path: entry.path().to_string_lossy().to_string(),
                    reason: "path is not valid UTF-8".to_string(),
                });
                continue;
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                snapshot.folders.insert(rel);
            } else if file_type.is_file() {
                match self.read_text(entry.path()) {
                    Ok(FileContent::Text(text)) => {
                        snapshot.files.insert(rel, text);
                    }
                    Ok(FileContent::Binary) => {
                        debug!("Skipping non-text file: {}", rel);
                        binary_skipped += 1;
                    }
                    Err(reason) => {
                        warn!("Skipping unreadable file {}: {}", rel, reason);
                        diagnostics.push(Diagnostic::PartialRead { path: rel, reason });
                    }
                }
            } else {
                debug!("Skipping non-regular entry: {}", rel);
            }
        }

        debug!(
            "Scanned {} files, {} folders from {:?} (truncated: {})",
            snapshot.files.len(),
            snapshot.folders.len(),
            scan_root,
            truncated
        );

        Ok(ScanResult {
            snapshot,
            diagnostics,
            truncated,
            binary_skipped,
        })
    }

    fn read_text(&self, path: &Path) -> Result<FileContent, String> {
        let metadata = fs::metadata(path).map_err(|e| e.to_string())?;
        if metadata.len() > self.options.max_file_bytes {
            return Err(format!(
                "file exceeds {} byte limit",
                self.options.max_file_bytes
            ));
        }

        let bytes = fs::read(path).map_err(|e| e.to_string())?;
        if bytes.contains(&0) {
            return Ok(FileContent::Binary);
        }
        Ok(match String::from_utf8(bytes) {
            Ok(text) => FileContent::Text(text),
            Err(_) => FileContent::Binary,
        })
    }
}

/// `/`-joined path of `path` below `root`, or `None` if it is not valid UTF-8
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}
