//! Filesystem- and `reqwest`-backed implementation of the cache engine
//! described by `aptcache-core`'s traits.
//!
//! [`Engine`] is the single entry point: it owns the upstream HTTP client,
//! the live configuration, the blacklist snapshot, and the `MirrorDirectory`
//! / `StatsSink` / `EventSink` collaborators, and wires the `pathmap`,
//! `blacklist`, `fetcher`, `sweep`, `admin` and `index` modules together
//! into the request-handling and admin operations a front-end calls.

pub mod admin;
pub mod blacklist;
pub mod fetcher;
pub mod index;
pub mod pathmap;
pub mod stats;
pub mod sweep;

use aptcache_core::{CoreConfig, EventLevel, EventSink, IndexHit, MirrorDirectory, StatsSink};
use blacklist::Blacklist;
use bytes::Bytes;
use fetcher::{ChunkBuffer, FetchOutcome};
use futures_util::StreamExt;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use sweep::SweepReport;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

pub use fetcher::BodyStream;

/// Handed back to the HTTP front-end for a successfully routed request.
/// `body` streams lazily; the engine never materializes the full payload
/// in memory.
pub struct ResponseEnvelope {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: BodyStream,
    pub cached: bool,
}

/// Bounded channel capacity between the upstream tee task and the body
/// stream handed to the client; bounds how far the writer can run ahead of
/// a slow client without buffering the whole response.
const TEE_CHANNEL_CAPACITY: usize = 8;

pub struct Engine {
    client: reqwest::Client,
    config: RwLock<CoreConfig>,
    blacklist: Blacklist,
    mirrors: Arc<dyn MirrorDirectory>,
    stats: Arc<dyn StatsSink>,
    events: Arc<dyn EventSink>,
}

impl Engine {
    pub fn new(
        config: CoreConfig,
        blacklist_patterns: Vec<String>,
        mirrors: Arc<dyn MirrorDirectory>,
        stats: Arc<dyn StatsSink>,
        events: Arc<dyn EventSink>,
    ) -> aptcache_core::Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| aptcache_core::Error::Config(format!("building HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: RwLock::new(config),
            blacklist: Blacklist::new(blacklist_patterns),
            mirrors,
            stats,
            events,
        })
    }

    pub fn config(&self) -> CoreConfig {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_config(&self, config: CoreConfig) {
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = config;
    }

    pub fn reload_blacklist(&self, patterns: Vec<String>) {
        self.blacklist.reload(patterns);
    }

    pub fn blacklist_snapshot(&self) -> Vec<String> {
        self.blacklist.snapshot()
    }

    fn storage_root(&self) -> PathBuf {
        self.config().storage_path_resolved
    }

    pub fn cache_path(&self, distro: &str, request_path: &str) -> aptcache_core::Result<PathBuf> {
        pathmap::map(&self.storage_root(), distro, request_path)
    }

    pub fn is_cache_valid(&self, path: &std::path::Path) -> bool {
        let cfg = self.config();
        admin::is_cache_valid(path, cfg.cache_days, cfg.cache_retention_enabled)
    }

    /// Deletes a single cached file by path relative to the storage root.
    /// Refuses traversal outside the storage root.
    pub fn delete(&self, rel_path: &str) -> bool {
        admin::delete(&self.storage_root(), rel_path)
    }

    /// Runs one retention sweep synchronously. Callers schedule this on
    /// whatever cadence fits their front-end (a timer, a CLI subcommand,
    /// ...); the engine holds no internal scheduler.
    pub fn sweep(&self, dry_run: bool) -> SweepReport {
        let cfg = self.config();
        sweep::sweep(
            &cfg.storage_path_resolved,
            cfg.cache_days,
            cfg.cache_retention_enabled,
            dry_run,
            self.events.as_ref(),
        )
    }

    /// Index search, two strategies tried in order: if `query` looks like a
    /// relative path (contains `/`), a direct `HEAD` probe against each
    /// mirror short-circuits with a single hit; otherwise (or if the probe
    /// finds nothing) falls back to scanning cached `Packages` files for a
    /// name match.
    #[tracing::instrument(skip(self), fields(distro = %distro, query = %query))]
    pub async fn search(&self, distro: &str, query: &str) -> Vec<IndexHit> {
        let storage_root = self.storage_root();

        if query.contains('/') {
            if let Some(mut direct) = index::probe_direct_path(&self.client, &self.mirrors, distro, query).await {
                let cache_path = pathmap::map_pure(&storage_root, distro, &direct.path);
                direct.cached = self.is_cache_valid(&cache_path);
                return vec![direct];
            }
        }

        let mut hits = index::scan_corpus(&storage_root, distro, query);
        // `scan_corpus` only emits stanzas with both `Package` and
        // `Filename`, so `path` should never be empty here; retain anyway
        // as a defensive guard against a hit no `cache_path` can be computed
        // for ever reaching the caller.
        hits.retain(|h| !h.path.is_empty());
        for hit in &mut hits {
            let cache_path = pathmap::map_pure(&storage_root, distro, &hit.path);
            hit.cached = self.is_cache_valid(&cache_path);
        }
        hits
    }

    /// Downloads `request_path` from `distro`'s mirrors straight to the
    /// cache, without a waiting client. Returns `(already_cached, message)`.
    #[tracing::instrument(skip(self), fields(distro = %distro, path = %request_path))]
    pub async fn prefetch(&self, distro: &str, request_path: &str) -> (bool, String) {
        let cache_path = match self.cache_path(distro, request_path) {
            Ok(p) => p,
            Err(e) => return (false, format!("cache path error: {e}")),
        };
        if self.is_cache_valid(&cache_path) {
            return (true, "already cached".to_string());
        }

        let basename = pathmap::basename(request_path);
        if self.blacklist.is_blacklisted(&basename) {
            return (false, "blacklisted, refusing to prefetch".to_string());
        }

        let Some(mirror_set) = self.mirrors.mirrors_for(distro) else {
            return (false, format!("no mirrors configured for {distro}"));
        };

        let headers = BTreeMap::new();
        let mut last_error = "no mirrors tried".to_string();
        for base in &mirror_set {
            let url = format!("{}/{}", base.trim_end_matches('/'), request_path.trim_start_matches('/'));
            match fetcher::fetch_one(&self.client, &url, &headers).await {
                FetchOutcome::Stream { resp, .. } => {
                    let tmp_path = pathmap::tmp_path(&cache_path);
                    let Ok(mut file) = fetcher::open_tmp_for_write(&tmp_path) else {
                        last_error = "failed to open tmp file".to_string();
                        continue;
                    };
                    let mut io_failed = false;
                    let outcome = fetcher::drain_chunked(resp, |chunk| {
                        use std::io::Write;
                        if file.write_all(&chunk).is_err() {
                            io_failed = true;
                        }
                    })
                    .await;
                    drop(file);
                    match outcome {
                        fetcher::DrainOutcome::Complete(total) if !io_failed => {
                            if std::fs::rename(&tmp_path, &cache_path).is_ok() {
                                self.stats.add_bytes_served(total);
                                let msg = format!("prefetched {basename} ({total} bytes)");
                                self.events.push(EventLevel::Success, msg.clone());
                                return (false, msg);
                            }
                            last_error = "failed to publish cache file".to_string();
                        }
                        fetcher::DrainOutcome::UpstreamError(_, reason) => {
                            let _ = std::fs::remove_file(&tmp_path);
                            last_error = reason;
                        }
                        _ => {
                            let _ = std::fs::remove_file(&tmp_path);
                            last_error = "local write error".to_string();
                        }
                    }
                }
                FetchOutcome::NotModified { .. } => {
                    return (true, "already cached".to_string());
                }
                FetchOutcome::Recoverable(reason) => {
                    last_error = reason;
                }
            }
        }
        self.events
            .push(EventLevel::Error, format!("FAILED prefetch {basename}: {last_error}"));
        (false, format!("prefetch failed: {last_error}"))
    }

    /// Streams a file straight from an existing cache entry (the cache-hit
    /// path).
    fn stream_cached(&self, path: PathBuf) -> aptcache_core::Result<BodyStream> {
        let (tx, rx) = mpsc::channel::<Bytes>(TEE_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            let Ok(mut file) = tokio::fs::File::open(&path).await else {
                return;
            };
            let mut buf = vec![0u8; fetcher::CHUNK_SIZE];
            loop {
                use tokio::io::AsyncReadExt;
                match file.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(Bytes::copy_from_slice(&buf[..n])).await.is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });
        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    /// Routes a request for `request_path` under `distro`: serves a valid
    /// cache entry directly, otherwise fails over across mirrors, teeing the
    /// winning response to disk while streaming it to
    /// the caller.
    #[tracing::instrument(skip(self, request_headers), fields(distro = %distro, path = %request_path))]
    pub async fn serve(
        &self,
        distro: &str,
        request_path: &str,
        request_headers: &BTreeMap<String, String>,
    ) -> aptcache_core::Result<ResponseEnvelope> {
        let cache_path = self.cache_path(distro, request_path)?;
        let basename = pathmap::basename(request_path);
        let blacklisted = self.blacklist.is_blacklisted(&basename);

        if !blacklisted && self.is_cache_valid(&cache_path) {
            self.stats.record_request(true);
            let body = self.stream_cached(cache_path)?;
            return Ok(ResponseEnvelope {
                status: 200,
                headers: BTreeMap::new(),
                body,
                cached: true,
            });
        }

        let mirror_set = self
            .mirrors
            .mirrors_for(distro)
            .ok_or_else(|| aptcache_core::Error::NotConfigured(format!("no mirrors configured for {distro}")))?;

        let passthrough = self.config().passthrough_mode;
        let mut last_error = "no mirrors tried".to_string();

        for base in &mirror_set {
            let url = format!("{}/{}", base.trim_end_matches('/'), request_path.trim_start_matches('/'));
            match fetcher::fetch_one(&self.client, &url, request_headers).await {
                FetchOutcome::Stream { status, headers, resp } => {
                    self.stats.record_request(false);
                    let should_cache = !blacklisted && status == 200;
                    let body = if should_cache {
                        self.tee_and_cache(resp, cache_path.clone(), basename.clone())
                    } else {
                        if blacklisted {
                            self.events
                                .push(EventLevel::Warning, format!("BLACKLISTED {basename}, streaming without caching"));
                            if !passthrough {
                                return Err(aptcache_core::Error::Cache(format!("{basename} is blacklisted")));
                            }
                        }
                        self.forward_only(resp, status == 206, basename.clone())
                    };
                    return Ok(ResponseEnvelope { status, headers, body, cached: false });
                }
                FetchOutcome::NotModified { headers } => {
                    self.stats.record_request(true);
                    self.events.push(EventLevel::Success, format!("HIT (304) {basename}"));
                    return Ok(ResponseEnvelope {
                        status: 304,
                        headers,
                        body: Box::pin(futures_util::stream::empty()),
                        cached: true,
                    });
                }
                FetchOutcome::Recoverable(reason) => {
                    last_error = reason;
                }
            }
        }

        self.events.push(EventLevel::Error, format!("FAILED {basename}: {last_error}"));
        Err(aptcache_core::Error::Fetch(last_error))
    }

    /// Forwards an upstream body to the client without writing it to disk
    /// (blacklisted entries in passthrough mode, or a `206` partial
    /// response). The bytes-served counter still grows by the streamed
    /// length; `is_partial` only changes the event emitted on completion.
    fn forward_only(&self, resp: reqwest::Response, is_partial: bool, basename: String) -> BodyStream {
        let (tx, rx) = mpsc::channel::<Bytes>(TEE_CHANNEL_CAPACITY);
        let stats = Arc::clone(&self.stats);
        let events = Arc::clone(&self.events);
        tokio::spawn(async move {
            let mut stream = resp.bytes_stream();
            let mut total: u64 = 0;
            while let Some(item) = stream.next().await {
                let Ok(bytes) = item else { break };
                total += bytes.len() as u64;
                if tx.send(bytes).await.is_err() {
                    break;
                }
            }
            stats.add_bytes_served(total);
            if is_partial {
                events.push(EventLevel::Info, format!("PARTIAL {basename} ({total} bytes)"));
            }
        });
        Box::pin(ReceiverStream::new(rx))
    }

    /// Drives the response body to completion exactly once, writing every
    /// chunk to `cache_path`'s `.tmp` sibling while forwarding the same
    /// chunk to the client over a bounded channel. Renames into place on a
    /// clean finish; deletes the partial file on any failure.
    fn tee_and_cache(&self, resp: reqwest::Response, cache_path: PathBuf, basename: String) -> BodyStream {
        let tmp_path = pathmap::tmp_path(&cache_path);
        let (tx, rx) = mpsc::channel::<Bytes>(TEE_CHANNEL_CAPACITY);
        let stats = Arc::clone(&self.stats);
        let events = Arc::clone(&self.events);

        tokio::spawn(async move {
            let mut file = match tokio::fs::File::create(&tmp_path).await {
                Ok(f) => f,
                Err(e) => {
                    tracing::warn!(error = %e, path = %tmp_path.display(), "failed to open tmp cache file, streaming uncached");
                    let mut stream = resp.bytes_stream();
                    let mut total: u64 = 0;
                    while let Some(item) = stream.next().await {
                        let Ok(bytes) = item else { break };
                        total += bytes.len() as u64;
                        if tx.send(bytes).await.is_err() {
                            break;
                        }
                    }
                    // Every byte actually handed to the client counts toward
                    // bytes_served, tmp-file failure or not.
                    stats.add_bytes_served(total);
                    return;
                }
            };

            let mut stream = resp.bytes_stream();
            let mut buffer = ChunkBuffer::default();
            let mut total: u64 = 0;
            let mut failed = false;

            'read: while let Some(item) = stream.next().await {
                match item {
                    Ok(bytes) => {
                        for chunk in buffer.push(&bytes) {
                            total += chunk.len() as u64;
                            if file.write_all(&chunk).await.is_err() {
                                failed = true;
                            }
                            if tx.send(chunk).await.is_err() {
                                break 'read;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "upstream body errored mid-stream");
                        failed = true;
                        break;
                    }
                }
            }
            if !failed {
                if let Some(chunk) = buffer.flush() {
                    total += chunk.len() as u64;
                    if file.write_all(&chunk).await.is_err() {
                        failed = true;
                    }
                    let _ = tx.send(chunk).await;
                }
            }
            let _ = file.flush().await;
            drop(file);

            // The bytes-served counter tracks what was actually streamed to
            // the client, independent of whether the tee to disk succeeded.
            stats.add_bytes_served(total);

            if failed {
                let _ = tokio::fs::remove_file(&tmp_path).await;
                events.push(EventLevel::Error, format!("FAILED {basename}: upstream body error"));
            } else if let Err(e) = tokio::fs::rename(&tmp_path, &cache_path).await {
                tracing::warn!(error = %e, "failed to publish cache file");
                let _ = tokio::fs::remove_file(&tmp_path).await;
                events.push(EventLevel::Error, format!("FAILED {basename}: could not publish cache file"));
            } else {
                events.push(EventLevel::Success, format!("CACHED {basename} ({total} bytes)"));
            }
        });

        Box::pin(ReceiverStream::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aptcache_core::MirrorSet;
    use stats::{InMemoryStats, RingLog};

    struct FixedMirrors(BTreeMap<String, MirrorSet>);
    impl MirrorDirectory for FixedMirrors {
        fn mirrors_for(&self, upstream_key: &str) -> Option<MirrorSet> {
            self.0.get(upstream_key).cloned()
        }
    }

    fn test_engine(storage_root: &std::path::Path, mirrors: BTreeMap<String, MirrorSet>) -> Engine {
        test_engine_with_stats(storage_root, mirrors).0
    }

    fn test_engine_with_stats(
        storage_root: &std::path::Path,
        mirrors: BTreeMap<String, MirrorSet>,
    ) -> (Engine, Arc<InMemoryStats>) {
        let mut cfg = CoreConfig::default();
        cfg.storage_path_resolved = storage_root.to_path_buf();
        let stats = Arc::new(InMemoryStats::load(storage_root));
        let events = Arc::new(RingLog::new());
        let engine = Engine::new(cfg, vec![], Arc::new(FixedMirrors(mirrors)), Arc::clone(&stats) as _, events).unwrap();
        (engine, stats)
    }

    async fn spawn_test_mirror(app: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn serve_errors_when_distro_has_no_mirrors() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = test_engine(tmp.path(), BTreeMap::new());
        let result = engine.serve("debian", "pool/main/h/hello/hello_2.10.deb", &BTreeMap::new()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn serve_returns_cached_body_without_network() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = test_engine(tmp.path(), BTreeMap::new());
        let cache_path = engine.cache_path("debian", "pool/main/h/hello/hello_2.10.deb").unwrap();
        tokio::fs::write(&cache_path, b"package bytes").await.unwrap();

        let envelope = engine
            .serve("debian", "pool/main/h/hello/hello_2.10.deb", &BTreeMap::new())
            .await
            .unwrap();
        assert!(envelope.cached);
        let collected: Vec<_> = envelope.body.collect().await;
        let total: usize = collected.iter().map(|b| b.len()).sum();
        assert_eq!(total, "package bytes".len());
    }

    #[tokio::test]
    async fn prefetch_reports_already_cached_without_network() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = test_engine(tmp.path(), BTreeMap::new());
        let cache_path = engine.cache_path("debian", "pool/main/h/hello/hello_2.10.deb").unwrap();
        tokio::fs::write(&cache_path, b"x").await.unwrap();

        let (already_cached, _msg) = engine.prefetch("debian", "pool/main/h/hello/hello_2.10.deb").await;
        assert!(already_cached);
    }

    #[test]
    fn sweep_delegates_to_sweep_module() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = test_engine(tmp.path(), BTreeMap::new());
        let report = engine.sweep(false);
        assert_eq!(report.scanned, 0);
    }

    #[test]
    fn delete_uses_admin_traversal_guard() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = test_engine(tmp.path(), BTreeMap::new());
        assert!(!engine.delete("../escape"));
    }

    #[tokio::test]
    async fn scenario_3_second_mirror_wins_and_publishes_cache_entry() {
        use axum::http::StatusCode;
        use axum::routing::get;

        let bad = axum::Router::new().route(
            "/hello_2.10.deb",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        );
        let good = axum::Router::new().route(
            "/hello_2.10.deb",
            get(|| async { vec![7u8; 1234] }),
        );
        let bad_base = spawn_test_mirror(bad).await;
        let good_base = spawn_test_mirror(good).await;

        let tmp = tempfile::tempdir().unwrap();
        let mut mirrors = BTreeMap::new();
        mirrors.insert("debian".to_string(), vec![bad_base, good_base]);
        let engine = test_engine(tmp.path(), mirrors);

        let envelope = engine
            .serve("debian", "hello_2.10.deb", &BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(envelope.status, 200);
        let collected: Vec<_> = envelope.body.collect().await;
        let total: usize = collected.iter().map(|b| b.len()).sum();
        assert_eq!(total, 1234);

        let cache_path = engine.cache_path("debian", "hello_2.10.deb").unwrap();
        // Publish happens on a spawned task; poll briefly for the rename.
        for _ in 0..50 {
            if cache_path.exists() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(cache_path.exists(), "winning mirror's body must be published to the cache");
        assert_eq!(tokio::fs::metadata(&cache_path).await.unwrap().len(), 1234);
    }

    #[tokio::test]
    async fn scenario_4_all_mirrors_404_yields_failure_and_no_cache_entry() {
        use axum::http::StatusCode;
        use axum::routing::get;

        let miss = axum::Router::new().route(
            "/missing.deb",
            get(|| async { StatusCode::NOT_FOUND }),
        );
        let base = spawn_test_mirror(miss).await;

        let tmp = tempfile::tempdir().unwrap();
        let mut mirrors = BTreeMap::new();
        mirrors.insert("debian".to_string(), vec![base]);
        let engine = test_engine(tmp.path(), mirrors);

        let result = engine.serve("debian", "missing.deb", &BTreeMap::new()).await;
        assert!(result.is_err());
        let cache_path = engine.cache_path("debian", "missing.deb").unwrap();
        assert!(!cache_path.exists());
    }

    #[tokio::test]
    async fn scenario_5_partial_content_is_not_cached_but_grows_bytes_served() {
        use axum::http::StatusCode;
        use axum::response::IntoResponse;
        use axum::routing::get;

        let body = vec![9u8; 512];
        let partial = axum::Router::new().route(
            "/hello_2.10.deb",
            get(move || {
                let body = body.clone();
                async move { (StatusCode::PARTIAL_CONTENT, body).into_response() }
            }),
        );
        let base = spawn_test_mirror(partial).await;

        let tmp = tempfile::tempdir().unwrap();
        let mut mirrors = BTreeMap::new();
        mirrors.insert("debian".to_string(), vec![base]);
        let (engine, stats) = test_engine_with_stats(tmp.path(), mirrors);

        let envelope = engine
            .serve("debian", "hello_2.10.deb", &BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(envelope.status, 206);
        let collected: Vec<_> = envelope.body.collect().await;
        let total: usize = collected.iter().map(|b| b.len()).sum();
        assert_eq!(total, 512);

        let cache_path = engine.cache_path("debian", "hello_2.10.deb").unwrap();
        assert!(!cache_path.exists(), "206 must never be cached");

        for _ in 0..50 {
            if stats.snapshot()["bytes_served"].as_u64() == Some(512) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(stats.snapshot()["bytes_served"], 512);
    }

    #[tokio::test]
    async fn blacklisted_file_streams_without_caching_in_passthrough_mode() {
        use axum::routing::get;

        let app = axum::Router::new().route(
            "/vim-doc_9.0.deb",
            get(|| async { "doc bytes" }),
        );
        let base = spawn_test_mirror(app).await;

        let tmp = tempfile::tempdir().unwrap();
        let mut mirrors = BTreeMap::new();
        mirrors.insert("debian".to_string(), vec![base]);
        let mut cfg = CoreConfig::default();
        cfg.storage_path_resolved = tmp.path().to_path_buf();
        let stats = Arc::new(InMemoryStats::load(tmp.path()));
        let events = Arc::new(RingLog::new());
        let engine = Engine::new(
            cfg,
            vec!["*-doc_*.deb".to_string()],
            Arc::new(FixedMirrors(mirrors)),
            stats,
            events,
        )
        .unwrap();

        let envelope = engine
            .serve("debian", "vim-doc_9.0.deb", &BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(envelope.status, 200);
        let collected: Vec<_> = envelope.body.collect().await;
        let total: usize = collected.iter().map(|b| b.len()).sum();
        assert_eq!(total, "doc bytes".len());

        let cache_path = engine.cache_path("debian", "vim-doc_9.0.deb").unwrap();
        assert!(!cache_path.exists(), "blacklisted entries must never be written to disk");
    }
}
