use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid cache path: {0}")]
    InvalidPath(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("cache error: {0}")]
    Cache(String),
    #[error("search failed: {0}")]
    Search(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Typed configuration the engine consumes. Persistence/loading is owned by
/// the caller (the CLI's config layer); this type is the contract between
/// them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    pub storage_path_resolved: PathBuf,
    pub cache_days: u64,
    pub cache_retention_enabled: bool,
    /// Consulted by the CLI when installing the tracing subscriber, not by
    /// the engine itself.
    pub log_level: String,
    /// If true, a response that cannot be cached (blacklisted, 206, ...)
    /// still streams to the client rather than the request failing.
    pub passthrough_mode: bool,
    /// Opaque token gating destructive CLI admin subcommands. Never
    /// inspected by the engine.
    pub admin_token: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            storage_path_resolved: PathBuf::from("storage"),
            cache_days: 7,
            cache_retention_enabled: true,
            log_level: "info".to_string(),
            passthrough_mode: true,
            admin_token: "changeme_to_secure_random_string".to_string(),
        }
    }
}

/// An ordered sequence of interchangeable upstream base URLs serving the
/// same logical repository.
pub type MirrorSet = Vec<String>;

/// External collaborator: resolves `upstream_key -> [mirror_base_url...]`.
/// Mirror configuration storage lives outside the core.
pub trait MirrorDirectory: Send + Sync {
    fn mirrors_for(&self, upstream_key: &str) -> Option<MirrorSet>;
}

/// Severity of an `EventSink` message (`CACHED`, `HIT (304)`, `PARTIAL`,
/// `BLACKLISTED`, `FAILED`) at `INFO`/`SUCCESS`/`WARNING`/`ERROR`
/// granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// External collaborator: a bounded, live-viewable log of cache events.
/// This is distinct from the structured application logger; it backs an
/// admin view.
pub trait EventSink: Send + Sync {
    fn push(&self, level: EventLevel, message: String);
}

/// External collaborator: receives counter deltas for persistence. The
/// engine never reads these back.
pub trait StatsSink: Send + Sync {
    fn add_bytes_served(&self, n: u64);
    fn record_request(&self, hit: bool);
}

/// A blacklist pattern as read from durable storage: either a `*`-wildcard
/// glob or a plain substring, matched case-insensitively against a cache
/// filename.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlacklistPattern(pub String);

/// One hit from `search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexHit {
    pub name: String,
    pub path: String,
    pub distro: String,
    pub url: Option<String>,
    pub version: Option<String>,
    pub cached: bool,
}

/// Headers stripped from an upstream response before it is handed back to
/// the HTTP front-end.
pub const STRIPPED_RESPONSE_HEADERS: &[&str] = &[
    "transfer-encoding",
    "connection",
    "content-encoding",
    "content-length",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_defaults() {
        let c = CoreConfig::default();
        assert_eq!(c.cache_days, 7);
        assert!(c.cache_retention_enabled);
        assert!(c.passthrough_mode);
    }
}
