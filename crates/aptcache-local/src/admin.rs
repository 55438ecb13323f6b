//! Cache admin operations: validity check and guarded single-file delete.

use std::path::Path;
use std::time::{Duration, SystemTime};

/// `false` if the file is absent. If retention is disabled, `true` for any
/// extant file. Otherwise compares `now - atime` (fallback `mtime`) against
/// `cache_days`.
pub fn is_cache_valid(path: &Path, cache_days: u64, retention_enabled: bool) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !retention_enabled {
        return true;
    }
    let last_access = meta
        .accessed()
        .or_else(|_| meta.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH);
    let age = SystemTime::now()
        .duration_since(last_access)
        .unwrap_or(Duration::ZERO);
    age < Duration::from_secs(cache_days.saturating_mul(24 * 60 * 60))
}

/// Deletes `storage_root.join(rel_path)` if, and only if, the resolved
/// absolute path stays under the resolved storage root (directory
/// traversal guard). Directories are never deleted. Returns whether a
/// deletion occurred.
pub fn delete(storage_root: &Path, rel_path: &str) -> bool {
    let candidate = storage_root.join(rel_path);

    let Ok(root_resolved) = storage_root.canonicalize() else {
        return false;
    };

    // The target need not exist yet for canonicalize to succeed on its
    // parent, but if it doesn't exist at all there is nothing to delete —
    // and we must still refuse traversal even in that case, so resolve the
    // deepest existing ancestor and check the remaining suffix textually.
    let resolved = match candidate.canonicalize() {
        Ok(p) => p,
        Err(_) => return false,
    };

    if !resolved.starts_with(&root_resolved) {
        return false;
    }
    if !resolved.is_file() {
        return false;
    }

    std::fs::remove_file(&resolved).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_when_absent() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(!is_cache_valid(&tmp.path().join("nope"), 7, true));
    }

    #[test]
    fn valid_when_retention_disabled() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("a");
        std::fs::write(&p, b"x").unwrap();
        assert!(is_cache_valid(&p, 0, false));
    }

    #[test]
    fn valid_within_retention_window() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("a");
        std::fs::write(&p, b"x").unwrap();
        assert!(is_cache_valid(&p, 7, true));
    }

    #[test]
    fn delete_removes_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("a.deb");
        std::fs::write(&p, b"x").unwrap();
        assert!(delete(tmp.path(), "a.deb"));
        assert!(!p.exists());
    }

    #[test]
    fn delete_returns_false_for_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(!delete(tmp.path(), "missing.deb"));
    }

    #[test]
    fn delete_refuses_traversal_with_dotdot() {
        let tmp = tempfile::tempdir().unwrap();
        let outside = tmp.path().parent().unwrap().join("outside-secret.txt");
        std::fs::write(&outside, b"secret").unwrap();
        let rel = format!("../{}", outside.file_name().unwrap().to_string_lossy());
        assert!(!delete(tmp.path(), &rel));
        assert!(outside.exists());
        let _ = std::fs::remove_file(&outside);
    }

    #[test]
    fn delete_refuses_absolute_path_escaping_storage() {
        let tmp = tempfile::tempdir().unwrap();
        let outside = tmp.path().parent().unwrap().join("also-outside.txt");
        std::fs::write(&outside, b"secret").unwrap();
        assert!(!delete(tmp.path(), outside.to_str().unwrap()));
        assert!(outside.exists());
        let _ = std::fs::remove_file(&outside);
    }

    #[test]
    fn delete_never_removes_directories() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("subdir")).unwrap();
        assert!(!delete(tmp.path(), "subdir"));
        assert!(tmp.path().join("subdir").exists());
    }
}
