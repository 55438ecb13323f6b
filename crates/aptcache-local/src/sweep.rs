//! Background retention sweep.
//!
//! Walks the storage root iteratively (via [`walkdir`], which maintains its
//! own explicit directory frontier rather than recursing — this bounds
//! stack depth on deep trees and keeps the walk interruptible). Errors on
//! individual files/directories are logged and skipped; the sweep always
//! completes.

use aptcache_core::{EventLevel, EventSink};
use std::path::Path;
use std::time::{Duration, SystemTime};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct SweepReport {
    pub scanned: u64,
    pub deleted: u64,
    pub errors: u64,
}

fn file_age(path: &Path, now: SystemTime) -> Option<Duration> {
    let meta = std::fs::metadata(path).ok()?;
    let mtime = meta.modified().ok();
    let atime = meta.accessed().ok();
    // File age for retention is max(atime, mtime); mtime dominates if atime
    // lags behind a write that touched the file more recently than it was read.
    let newest = match (atime, mtime) {
        (Some(a), Some(m)) => Some(if a > m { a } else { m }),
        (Some(a), None) => Some(a),
        (None, Some(m)) => Some(m),
        (None, None) => None,
    }?;
    now.duration_since(newest).ok()
}

/// Runs one full sweep, synchronously. The caller (a timer thread, or the
/// CLI's `sweep` subcommand) decides the schedule; this holds no locks on
/// the fetch path. When `dry_run` is set, aged files are counted but never
/// removed — used by the CLI's `--dry-run` flag.
#[tracing::instrument(skip(events), fields(root = %storage_root.display()))]
pub fn sweep(
    storage_root: &Path,
    cache_days: u64,
    retention_enabled: bool,
    dry_run: bool,
    events: &dyn EventSink,
) -> SweepReport {
    let mut report = SweepReport::default();
    if !retention_enabled {
        tracing::info!("cache retention disabled, skipping cleanup");
        return report;
    }
    let cutoff = Duration::from_secs(cache_days.saturating_mul(24 * 60 * 60));
    let now = SystemTime::now();

    for entry in WalkDir::new(storage_root)
        .into_iter()
        .filter_map(|e| match e {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::warn!(error = %err, "error scanning directory during sweep");
                None
            }
        })
    {
        if !entry.file_type().is_file() {
            continue;
        }
        report.scanned += 1;
        let path = entry.path();
        let Some(age) = file_age(path, now) else {
            report.errors += 1;
            continue;
        };
        if age > cutoff {
            if dry_run {
                report.deleted += 1;
                continue;
            }
            match std::fs::remove_file(path) {
                Ok(()) => {
                    report.deleted += 1;
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "failed to delete aged cache file");
                    report.errors += 1;
                }
            }
        }
    }

    if report.deleted > 0 && !dry_run {
        let msg = format!(
            "cleanup: removed {} old files (idle > {} days)",
            report.deleted, cache_days
        );
        tracing::info!("{msg}");
        events.push(EventLevel::Info, msg);
    }
    report
}
