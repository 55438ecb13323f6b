//! In-process `StatsSink`/`EventSink` implementations.
//!
//! There is no embedded database anywhere in this stack, so counters are
//! held in memory and persisted as a single JSON document using the same
//! tmp-write-then-rename idiom the cache writer itself uses for published
//! files — a crash mid-save leaves the previous snapshot intact.

use aptcache_core::{EventLevel, EventSink, StatsSink};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Cap on the live event ring.
const LOG_CAPACITY: usize = 100;
/// Persist after this many bytes have been served since the last save, so a
/// busy proxy doesn't fsync on every single request.
const PERSIST_EVERY_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistedStats {
    bytes_served: u64,
    hits: u64,
    misses: u64,
    #[serde(default)]
    per_distro_files: BTreeMap<String, u64>,
    #[serde(default)]
    per_distro_bytes: BTreeMap<String, u64>,
}

#[derive(Debug, Default)]
struct Counters {
    persisted: PersistedStats,
    unpersisted_bytes: u64,
}

/// Process-lifetime counters, periodically flushed to `<storage_root>/stats.json`.
pub struct InMemoryStats {
    path: PathBuf,
    inner: Mutex<Counters>,
}

impl InMemoryStats {
    /// Loads any prior snapshot found at `storage_root/stats.json`, or
    /// starts from zero.
    pub fn load(storage_root: &Path) -> Self {
        let path = storage_root.join("stats.json");
        let persisted = std::fs::read(&path)
            .ok()
            .and_then(|b| serde_json::from_slice(&b).ok())
            .unwrap_or_default();
        Self {
            path,
            inner: Mutex::new(Counters {
                persisted,
                unpersisted_bytes: 0,
            }),
        }
    }

    fn save(&self, counters: &Counters) {
        Self::save_persisted(&self.path, &counters.persisted);
    }

    /// Writes `persisted` to `path` via tmp-write-then-rename. Takes no
    /// `&self` so it can run on a detached thread, away from whatever
    /// mutex guarded the counters it was handed.
    fn save_persisted(path: &Path, persisted: &PersistedStats) {
        let tmp = {
            let mut os = path.as_os_str().to_owned();
            os.push(".tmp");
            PathBuf::from(os)
        };
        let body = match serde_json::to_vec_pretty(persisted) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize stats");
                return;
            }
        };
        if let Err(e) = std::fs::write(&tmp, &body) {
            tracing::warn!(error = %e, path = %tmp.display(), "failed to write stats tmp file");
            return;
        }
        if let Err(e) = std::fs::rename(&tmp, path) {
            tracing::warn!(error = %e, "failed to publish stats snapshot");
        }
    }

    /// Forces an immediate flush, regardless of the byte-trigger threshold.
    /// Called on clean shutdown and by the CLI after one-shot operations.
    pub fn flush(&self) {
        let counters = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        self.save(&counters);
    }

    pub fn snapshot(&self) -> serde_json::Value {
        let counters = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        serde_json::to_value(&counters.persisted).unwrap_or(serde_json::Value::Null)
    }

    /// Recomputes `per_distro_files`/`per_distro_bytes` by walking the
    /// storage root, as a periodic full pass rather than trying to track
    /// per-distro deltas on every request.
    pub fn rescan(&self, storage_root: &Path) {
        let mut files = BTreeMap::new();
        let mut bytes = BTreeMap::new();
        let Ok(distros) = std::fs::read_dir(storage_root) else {
            return;
        };
        for distro_entry in distros.flatten() {
            if !distro_entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let distro = distro_entry.file_name().to_string_lossy().to_string();
            let mut count = 0u64;
            let mut size = 0u64;
            for entry in walkdir::WalkDir::new(distro_entry.path())
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if entry.file_type().is_file() && entry.path().extension().map(|e| e != "tmp").unwrap_or(true) {
                    count += 1;
                    size += entry.metadata().map(|m| m.len()).unwrap_or(0);
                }
            }
            files.insert(distro.clone(), count);
            bytes.insert(distro, size);
        }
        let mut counters = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        counters.persisted.per_distro_files = files;
        counters.persisted.per_distro_bytes = bytes;
        self.save(&counters);
    }
}

impl StatsSink for InMemoryStats {
    /// Increments the in-memory counter under the mutex only long enough to
    /// decide whether this call crosses the persist threshold; the actual
    /// disk write happens on a detached thread after the guard is dropped,
    /// so neither the hot streaming path nor a concurrent `record_request`
    /// ever blocks on `fs::write`/`fs::rename` — mirroring the original's
    /// fire-and-forget `threading.Thread(target=save_stats_to_db).start()`.
    fn add_bytes_served(&self, n: u64) {
        let due_for_persist = {
            let mut counters = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            counters.persisted.bytes_served += n;
            counters.unpersisted_bytes += n;
            if counters.unpersisted_bytes >= PERSIST_EVERY_BYTES {
                counters.unpersisted_bytes = 0;
                Some(counters.persisted.clone())
            } else {
                None
            }
        };
        if let Some(persisted) = due_for_persist {
            let path = self.path.clone();
            std::thread::spawn(move || Self::save_persisted(&path, &persisted));
        }
    }

    fn record_request(&self, hit: bool) {
        let mut counters = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if hit {
            counters.persisted.hits += 1;
        } else {
            counters.persisted.misses += 1;
        }
    }
}

/// Bounded FIFO of human-readable cache events, independent of structured
/// `tracing` output — this is what an admin surface displays.
#[derive(Default)]
pub struct RingLog {
    entries: Mutex<VecDeque<(EventLevel, String)>>,
}

impl RingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recent(&self) -> Vec<(EventLevel, String)> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}

impl EventSink for RingLog {
    fn push(&self, level: EventLevel, message: String) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() >= LOG_CAPACITY {
            entries.pop_front();
        }
        entries.push_back((level, message));
    }
}
