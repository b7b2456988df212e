//! FileMaterializer: writes a snapshot's folders and files under a root
//!
//! Folders are created first so every file's parent exists. Existing files
//! are overwritten (last write wins). A file that cannot be written is
//! reported and the remaining files are still written.

use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use super::error::{Diagnostic, SnapshotError};
use super::model::WorkspaceSnapshot;
use crate::util::fs::{atomic_write, is_contained, resolve_under};

#[derive(Debug, Clone, Copy, Default)]
pub struct FileMaterializer;

impl FileMaterializer {
    pub fn new() -> Self {
        Self
    }

    /// Materialize `snapshot` under `root`, creating `root` if needed.
    ///
    /// Only failure to create `root` itself is an error.
    pub fn materialize(
        &self,
        snapshot: &WorkspaceSnapshot,
        root: &Path,
    ) -> Result<Vec<Diagnostic>, SnapshotError> {
        fs::create_dir_all(root)?;
        let mut diagnostics = Vec::new();

        for folder in &snapshot.folders {
            let created = resolve_under(root, folder)
                .ok_or_else(|| ESCAPES_ROOT.to_string())
                .and_then(|path| create_dir_under(root, &path));
            if let Err(reason) = created {
                warn!("Failed to create folder {}: {}", folder, reason);
                diagnostics.push(Diagnostic::PartialWrite {
                    path: folder.clone(),
                    reason,
                });
            }
        }

        let mut written = 0usize;
        for (rel, content) in &snapshot.files {
            match write_one(root, rel, content) {
                Ok(()) => written += 1,
                Err(reason) => {
                    warn!("Failed to write {}: {}", rel, reason);
                    diagnostics.push(Diagnostic::PartialWrite {
                        path: rel.clone(),
                        reason,
                    });
                }
            }
        }

        debug!(
            "Materialized {} of {} files into {:?}",
            written,
            snapshot.files.len(),
            root
        );

        Ok(diagnostics)
    }
}

const ESCAPES_ROOT: &str = "path escapes restore root";

/// Create `dir` unless it, or an existing ancestor, resolves outside `root`
fn create_dir_under(root: &Path, dir: &Path) -> Result<(), String> {
    check_contained(root, dir)?;
    fs::create_dir_all(dir).map_err(|e| e.to_string())?;
    // Re-check in case a link was swapped in while creating
    check_contained(root, dir)
}

fn check_contained(root: &Path, path: &Path) -> Result<(), String> {
    match is_contained(root, path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(ESCAPES_ROOT.to_string()),
        Err(e) => Err(e.to_string()),
    }
}

fn write_one(root: &Path, rel: &str, content: &str) -> Result<(), String> {
    let path = resolve_under(root, rel).ok_or_else(|| ESCAPES_ROOT.to_string())?;
    let parent = path
        .parent()
        .ok_or_else(|| "path has no parent directory".to_string())?;

    create_dir_under(root, parent)?;

    if path.is_dir() {
        return Err("a directory exists at this path".to_string());
    }

    atomic_write(&path, content.as_bytes()).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample() -> WorkspaceSnapshot {
        let mut snap = WorkspaceSnapshot::new("ws", json!({}));
        snap.folders.insert("empty".into());
        snap.folders.insert("sub".into());
        snap.files.insert("a.txt".into(), "hello".into());
        snap.files.insert("sub/b.txt".into(), "world".into());
        snap.files.insert("deep/er/c.txt".into(), "!".into());
        snap
    }

    #[test]
    fn test_materialize_basic() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("out");

        let diags = FileMaterializer::new().materialize(&sample(), &root).unwrap();
        assert!(diags.is_empty());
        assert_eq!(fs::read_to_string(root.join("a.txt")).unwrap(), "hello");
        assert_eq!(fs::read_to_string(root.join("sub/b.txt")).unwrap(), "world");
        assert_eq!(fs::read_to_string(root.join("deep/er/c.txt")).unwrap(), "!");
        assert!(root.join("empty").is_dir());
    }

    #[test]
    fn test_materialize_overwrites() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("a.txt"), "stale content").unwrap();

        FileMaterializer::new().materialize(&sample(), root).unwrap();
        assert_eq!(fs::read_to_string(root.join("a.txt")).unwrap(), "hello");
    }

    #[test]
    fn test_materialize_twice_idempotent() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let m = FileMaterializer::new();

        m.materialize(&sample(), root).unwrap();
        let first = fs::read(root.join("sub/b.txt")).unwrap();
        let diags = m.materialize(&sample(), root).unwrap();
        assert!(diags.is_empty());
        assert_eq!(fs::read(root.join("sub/b.txt")).unwrap(), first);
    }

    #[test]
    fn test_escape_paths_reported_others_written() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("out");

        let mut snap = sample();
        snap.files.insert("../evil.txt".into(), "x".into());
        snap.folders.insert("../../evil".into());

        let diags = FileMaterializer::new().materialize(&snap, &root).unwrap();
        assert_eq!(diags.len(), 2);
        assert!(diags
            .iter()
            .all(|d| matches!(d, Diagnostic::PartialWrite { .. })));
        assert!(!temp.path().join("evil.txt").exists());
        assert_eq!(fs::read_to_string(root.join("a.txt")).unwrap(), "hello");
    }

    #[test]
    fn test_directory_in_the_way() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("a.txt")).unwrap();

        let diags = FileMaterializer::new().materialize(&sample(), root).unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].path(), "a.txt");
        assert_eq!(fs::read_to_string(root.join("sub/b.txt")).unwrap(), "world");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_dir_creates_nothing_outside() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("root");
        let outside = temp.path().join("outside");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, root.join("link")).unwrap();

        let mut snap = WorkspaceSnapshot::new("ws", json!({}));
        snap.folders.insert("link/escaped".into());
        snap.folders.insert("inside".into());
        snap.files.insert("link/made/x.txt".into(), "x".into());
        snap.files.insert("link/y.txt".into(), "y".into());
        snap.files.insert("ok.txt".into(), "ok".into());

        let diags = FileMaterializer::new().materialize(&snap, &root).unwrap();
        let mut rejected: Vec<&str> = diags.iter().map(Diagnostic::path).collect();
        rejected.sort();
        assert_eq!(rejected, vec!["link/escaped", "link/made/x.txt", "link/y.txt"]);

        assert!(!outside.join("escaped").exists());
        assert!(!outside.join("made").exists());
        assert!(!outside.join("y.txt").exists());
        assert!(root.join("inside").is_dir());
        assert_eq!(fs::read_to_string(root.join("ok.txt")).unwrap(), "ok");
    }

    #[cfg(unix)]
    #[test]
    fn test_backslash_file_name_kept() {
        let temp = TempDir::new().unwrap();
        let mut snap = WorkspaceSnapshot::new("ws", json!({}));
        snap.files.insert("a\\b.txt".into(), "x".into());

        let diags = FileMaterializer::new().materialize(&snap, temp.path()).unwrap();
        assert!(diags.is_empty());
        assert_eq!(fs::read_to_string(temp.path().join("a\\b.txt")).unwrap(), "x");
        assert!(!temp.path().join("a").exists());
    }
}
