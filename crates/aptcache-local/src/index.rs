//! Package index search: a direct-path upstream probe plus a scan of any
//! cached `Packages`/`Packages.gz` index files already on disk.

use crate::fetcher::HEAD_TIMEOUT;
use crate::pathmap::real_basename;
use aptcache_core::{IndexHit, MirrorDirectory};
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

/// Hard cap on hits returned from the corpus scan: stop after the first
/// handful of matches rather than materializing every hit in a potentially
/// huge archive.
const MAX_HITS: usize = 20;

/// Parses one `Packages` control file's stanzas (blank-line delimited
/// `Key: Value` blocks) and returns every stanza whose `Package` field
/// contains `query` case-insensitively, up to `remaining` hits.
fn scan_stanzas(body: &str, query_lower: &str, distro: &str, remaining: usize) -> Vec<IndexHit> {
    let mut hits = Vec::new();
    for stanza in body.split("\n\n") {
        if hits.len() >= remaining {
            break;
        }
        let mut name = None;
        let mut filename = None;
        let mut version = None;
        for line in stanza.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "Package" => name = Some(value.to_string()),
                "Filename" => filename = Some(value.to_string()),
                "Version" => version = Some(value.to_string()),
                _ => {}
            }
        }
        // A stanza is only a hit if it carries both `Package` and
        // `Filename` — a stanza missing either can't be resolved to a
        // cache path, so it must not surface as a result.
        let (Some(name), Some(filename)) = (name, filename) else {
            continue;
        };
        if !name.to_ascii_lowercase().contains(query_lower) {
            continue;
        }
        hits.push(IndexHit {
            name,
            path: filename,
            distro: distro.to_string(),
            url: None,
            version,
            cached: false,
        });
    }
    hits
}

fn read_index_file(path: &Path) -> std::io::Result<String> {
    let raw = std::fs::read(path)?;
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        let mut decoder = GzDecoder::new(&raw[..]);
        let mut out = String::new();
        decoder.read_to_string(&mut out)?;
        Ok(out)
    } else {
        String::from_utf8(raw).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// Walks `storage_root/distro` for any file whose real basename contains
/// `Packages` and scans its stanzas for `query`. Deterministic: directory
/// entries are sorted by path before scanning so repeated searches against
/// an unchanged cache return hits in the same order.
pub fn scan_corpus(storage_root: &Path, distro: &str, query: &str) -> Vec<IndexHit> {
    let distro_root = storage_root.join(distro);
    let query_lower = query.to_ascii_lowercase();

    let mut index_files: Vec<_> = WalkDir::new(&distro_root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| real_basename(e.path()).contains("Packages"))
        .map(|e| e.path().to_path_buf())
        .collect();
    index_files.sort();

    let mut hits = Vec::new();
    for path in index_files {
        if hits.len() >= MAX_HITS {
            break;
        }
        let body = match read_index_file(&path) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read index file during search");
                continue;
            }
        };
        hits.extend(scan_stanzas(&body, &query_lower, distro, MAX_HITS - hits.len()));
    }
    hits
}

/// Probes `query` as a literal upstream path via `HEAD` against every mirror
/// for `distro`, stopping at the first mirror that answers 200. Each attempt
/// is bounded by [`HEAD_TIMEOUT`] so a slow/dead mirror cannot stall a search.
pub async fn probe_direct_path(
    client: &reqwest::Client,
    mirrors: &Arc<dyn MirrorDirectory>,
    distro: &str,
    query: &str,
) -> Option<IndexHit> {
    let mirror_set = mirrors.mirrors_for(distro)?;
    let rel = query.trim_start_matches('/');
    for base in mirror_set {
        let url = format!("{}/{}", base.trim_end_matches('/'), rel);
        let attempt = tokio::time::timeout(HEAD_TIMEOUT, client.head(&url).send()).await;
        if let Ok(Ok(resp)) = attempt {
            if resp.status().is_success() {
                return Some(IndexHit {
                    name: rel.rsplit('/').next().unwrap_or(rel).to_string(),
                    path: rel.to_string(),
                    distro: distro.to_string(),
                    url: Some(url),
                    version: None,
                    cached: false,
                });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Package: hello\nVersion: 2.10-3\nFilename: pool/main/h/hello/hello_2.10-3_amd64.deb\n\nPackage: hello-traineesis\nVersion: 1.0\nFilename: pool/main/h/hello-traineesis/hello-traineesis_1.0_all.deb\n";

    #[test]
    fn scan_stanzas_matches_exact_and_substring() {
        let hits = scan_stanzas(SAMPLE, "hello", "debian", 20);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].name, "hello");
        assert_eq!(hits[0].version.as_deref(), Some("2.10-3"));
    }

    #[test]
    fn scan_stanzas_respects_remaining_cap() {
        let hits = scan_stanzas(SAMPLE, "hello", "debian", 1);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn scan_stanzas_case_insensitive() {
        let hits = scan_stanzas(SAMPLE, "HELLO", "debian", 20);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn scan_stanzas_skips_stanza_missing_filename() {
        let body = "Package: hello\nVersion: 2.10-3\n\nPackage: hello-traineesis\nVersion: 1.0\nFilename: pool/main/h/hello-traineesis/hello-traineesis_1.0_all.deb\n";
        let hits = scan_stanzas(body, "hello", "debian", 20);
        assert_eq!(hits.len(), 1, "a stanza with no Filename must not surface as a hit");
        assert_eq!(hits[0].name, "hello-traineesis");
    }

    #[test]
    fn scan_corpus_finds_plain_packages_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("debian/ab");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("abcd1234_Packages"), SAMPLE).unwrap();
        let hits = scan_corpus(tmp.path(), "debian", "hello");
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn scan_corpus_ignores_non_index_files() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("debian/ab");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("abcd1234_hello_2.10.deb"), b"binary junk").unwrap();
        let hits = scan_corpus(tmp.path(), "debian", "hello");
        assert!(hits.is_empty());
    }
}
