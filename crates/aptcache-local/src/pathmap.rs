//! Deterministic mapping from `(distro, request-path)` to a cache file path.
//!
//! The hash fully disambiguates cache entries; the appended basename is for
//! human inspection only and must never be used for identity comparisons —
//! two different request paths that happen to share a basename still land
//! under different `H` prefixes.

use aptcache_core::Error;
use md5::{Digest, Md5};
use std::path::{Path, PathBuf};

/// `hex(md5(request_path))`, lowercase, 32 chars.
pub fn fingerprint(request_path: &str) -> String {
    let digest = Md5::digest(request_path.as_bytes());
    format!("{digest:x}")
}

pub(crate) fn basename(request_path: &str) -> String {
    let last = request_path.rsplit('/').next().unwrap_or("");
    if last.is_empty() {
        "index".to_string()
    } else {
        last.to_string()
    }
}

/// `<storage_root>/<distro>/<hash[0:2]>/<hash>_<basename>`, without
/// touching the filesystem.
pub fn map_pure(storage_root: &Path, distro: &str, request_path: &str) -> PathBuf {
    let hash = fingerprint(request_path);
    let dir = storage_root.join(distro).join(&hash[0..2]);
    dir.join(format!("{hash}_{}", basename(request_path)))
}

/// Same as [`map_pure`] but also creates the parent directory (idempotent
/// `mkdir -p`).
pub fn map(storage_root: &Path, distro: &str, request_path: &str) -> aptcache_core::Result<PathBuf> {
    let path = map_pure(storage_root, distro, request_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::Cache(format!("mkdir -p {}: {e}", parent.display())))?;
    }
    Ok(path)
}

/// The `.tmp` sibling of a cache path, used as the private write target of
/// an in-flight writer.
pub fn tmp_path(cache_path: &Path) -> PathBuf {
    let mut os = cache_path.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}

/// Extracts the real (non-hash-prefixed) filename from a cache path's file
/// name, i.e. reverses the `<hash>_<realname>` convention. Used by the
/// blacklist matcher (§4.B) and the index scan's `Packages` filter (§4.G).
pub fn real_basename(cache_path: &Path) -> String {
    let name = cache_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    match name.split_once('_') {
        Some((_, rest)) => rest.to_string(),
        None => name,
    }
}
