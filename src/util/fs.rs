//! Filesystem helpers shared by the materializer and the file-backed adapters

use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

/// Maximum relative path length accepted from a snapshot
pub const MAX_PATH_LENGTH: usize = 4096;

/// Resolve a `/`-separated relative path under `root` without touching disk.
///
/// `.` components are dropped and `..` pops; any attempt to climb above
/// `root`, an absolute path, or an overlong path yields `None`.
pub fn resolve_under(root: &Path, relative: &str) -> Option<PathBuf> {
    if relative.len() > MAX_PATH_LENGTH || relative.contains('\0') {
        return None;
    }
    if relative.starts_with('/') || Path::new(relative).is_absolute() {
        return None;
    }

    let mut components: Vec<&str> = Vec::new();
    for component in relative.split('/') {
        match component {
            "" | "." => continue,
            ".." => {
                components.pop()?;
            }
            c => {
                // Reject drive prefixes and separators on platforms that have them
                let mut parts = Path::new(c).components();
                if !matches!(parts.next(), Some(Component::Normal(_))) || parts.next().is_some() {
                    return None;
                }
                components.push(c);
            }
        }
    }
    if components.is_empty() {
        return None;
    }

    let mut full = root.to_path_buf();
    full.extend(components);
    Some(full)
}

/// Check that `path` would live under `root` once symlinks are resolved.
///
/// `path` need not exist: its deepest existing ancestor is resolved instead,
/// so the check can run before any directory is created.
pub fn is_contained(root: &Path, path: &Path) -> io::Result<bool> {
    let root_canonical = root.canonicalize()?;
    let mut current = path;
    loop {
        match current.symlink_metadata() {
            Ok(_) => return Ok(current.canonicalize()?.starts_with(&root_canonical)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                current = current.parent().ok_or(e)?;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Write `data` to `path` via a uniquely named temp file in the same directory
/// followed by a rename, so readers see either the old or the new content.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;

    let temp_path = parent.join(format!(
        ".{}.{}.tmp",
        file_name.to_string_lossy(),
        Uuid::new_v4().simple()
    ));

    let result = (|| {
        let mut temp_file = fs::File::create(&temp_path)?;
        temp_file.write_all(data)?;
        temp_file.sync_all()?;
        fs::rename(&temp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_under() {
        let root = Path::new("/ws");
        assert_eq!(resolve_under(root, "a.txt"), Some(PathBuf::from("/ws/a.txt")));
        assert_eq!(resolve_under(root, "./d/a.txt"), Some(PathBuf::from("/ws/d/a.txt")));
        assert_eq!(resolve_under(root, "d/../a.txt"), Some(PathBuf::from("/ws/a.txt")));

        assert_eq!(resolve_under(root, "../a.txt"), None);
        assert_eq!(resolve_under(root, "d/../../a.txt"), None);
        assert_eq!(resolve_under(root, "/etc/passwd"), None);
        assert_eq!(resolve_under(root, ""), None);
        assert_eq!(resolve_under(root, "."), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_under_keeps_backslash_in_name() {
        let root = Path::new("/ws");
        assert_eq!(
            resolve_under(root, "d/a\\b.txt"),
            Some(PathBuf::from("/ws/d").join("a\\b.txt"))
        );
        assert_eq!(resolve_under(root, "..\\a.txt"), Some(PathBuf::from("/ws/..\\a.txt")));
    }

    #[test]
    fn test_atomic_write_overwrites() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("file.txt");

        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");

        // No temp files left behind
        let entries: Vec<_> = fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_atomic_write_missing_parent_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing/file.txt");
        assert!(atomic_write(&path, b"x").is_err());
    }

    #[test]
    fn test_is_contained() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("d")).unwrap();
        assert!(is_contained(root, &root.join("d")).unwrap());
        assert!(is_contained(root, &root.join("d/not/yet/created")).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_is_contained_through_symlink() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("root");
        let outside = temp.path().join("outside");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, root.join("link")).unwrap();

        assert!(!is_contained(&root, &root.join("link")).unwrap());
        assert!(!is_contained(&root, &root.join("link/a/b")).unwrap());
        assert!(!outside.join("a").exists());
    }
}
