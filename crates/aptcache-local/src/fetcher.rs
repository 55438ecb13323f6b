//! Single-URL upstream fetch with streaming body and status classification,
//! plus the byte-chunking tee used by the cache writer.

use aptcache_core::STRIPPED_RESPONSE_HEADERS;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

/// 20s total for connect + headers. `reqwest::RequestBuilder::send` resolves
/// once status/headers arrive, before the body is read, so wrapping just
/// the `send().await` in this timeout yields exactly a "connect + headers"
/// deadline — a slow-but-progressing body has no further deadline.
pub const HEADERS_TIMEOUT: Duration = Duration::from_secs(20);
/// Direct path probe `HEAD` timeout.
pub const HEAD_TIMEOUT: Duration = Duration::from_secs(2);
/// Chunk size used while reading/teeing the body.
pub const CHUNK_SIZE: usize = 1024 * 1024;

pub type BodyStream = Pin<Box<dyn Stream<Item = Bytes> + Send>>;

/// Classification of a single mirror attempt.
pub enum FetchOutcome {
    /// `200` or `206` — caller streams the body; `status` distinguishes them.
    Stream {
        status: u16,
        headers: BTreeMap<String, String>,
        resp: reqwest::Response,
    },
    /// `304 Not Modified` — empty body, filtered headers.
    NotModified { headers: BTreeMap<String, String> },
    /// Recoverable failure: try the next mirror. Carries a human-readable
    /// reason for the eventual `last_error`.
    Recoverable(String),
}

fn filtered_headers(headers: &reqwest::header::HeaderMap) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (k, v) in headers.iter() {
        let kl = k.as_str().to_ascii_lowercase();
        if STRIPPED_RESPONSE_HEADERS.contains(&kl.as_str()) {
            continue;
        }
        if let Ok(s) = v.to_str() {
            out.insert(k.as_str().to_string(), s.to_string());
        }
    }
    out
}

/// Fetches a single URL. Never returns an `Err`: every failure mode here is
/// "recoverable" from the mirror loop's point of view, surfaced as
/// `FetchOutcome::Recoverable`.
#[tracing::instrument(skip(client, headers), fields(url = %url))]
pub async fn fetch_one(
    client: &reqwest::Client,
    url: &str,
    headers: &BTreeMap<String, String>,
) -> FetchOutcome {
    let mut rb = client.get(url);
    for (k, v) in headers {
        rb = rb.header(k.as_str(), v.as_str());
    }

    let sent = tokio::time::timeout(HEADERS_TIMEOUT, rb.send()).await;
    let resp = match sent {
        Err(_) => {
            tracing::warn!("timeout fetching {url}");
            return FetchOutcome::Recoverable("Timeout".to_string());
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "error fetching {url}");
            return FetchOutcome::Recoverable(e.to_string());
        }
        Ok(Ok(r)) => r,
    };

    let status = resp.status().as_u16();
    match status {
        200 | 206 => FetchOutcome::Stream {
            status,
            headers: filtered_headers(resp.headers()),
            resp,
        },
        304 => FetchOutcome::NotModified {
            headers: filtered_headers(resp.headers()),
        },
        404 => {
            tracing::warn!("file not found (404): {url}");
            FetchOutcome::Recoverable("404 Not Found".to_string())
        }
        other => {
            tracing::warn!("upstream returned status {other} for {url}");
            FetchOutcome::Recoverable(format!("HTTP {other}"))
        }
    }
}

/// Accumulates arbitrary-sized network reads into fixed [`CHUNK_SIZE`]
/// chunks for streaming to disk and client alike.
#[derive(Default)]
pub struct ChunkBuffer {
    buf: Vec<u8>,
}

impl ChunkBuffer {
    /// Appends `data`, returning any chunks now large enough to flush.
    pub fn push(&mut self, data: &[u8]) -> Vec<Bytes> {
        self.buf.extend_from_slice(data);
        let mut out = Vec::new();
        while self.buf.len() >= CHUNK_SIZE {
            let chunk: Vec<u8> = self.buf.drain(..CHUNK_SIZE).collect();
            out.push(Bytes::from(chunk));
        }
        out
    }

    /// Drains whatever partial chunk remains (call once at EOF).
    pub fn flush(&mut self) -> Option<Bytes> {
        if self.buf.is_empty() {
            None
        } else {
            Some(Bytes::from(std::mem::take(&mut self.buf)))
        }
    }
}

/// Outcome of draining an upstream body through [`ChunkBuffer`].
pub enum DrainOutcome {
    /// Clean EOF; carries total bytes observed.
    Complete(u64),
    /// The upstream stream errored partway through; carries bytes observed
    /// before the error and a reason.
    UpstreamError(u64, String),
}

/// Reads `resp`'s body to completion, invoking `on_chunk` for every
/// [`CHUNK_SIZE`]-ish piece — each chunk is handed to the sink before the
/// next network read happens. Never buffers the full body.
pub async fn drain_chunked<F>(resp: reqwest::Response, mut on_chunk: F) -> DrainOutcome
where
    F: FnMut(Bytes),
{
    let mut stream = resp.bytes_stream();
    let mut buffer = ChunkBuffer::default();
    let mut total: u64 = 0;

    while let Some(item) = stream.next().await {
        match item {
            Ok(bytes) => {
                for chunk in buffer.push(&bytes) {
                    total += chunk.len() as u64;
                    on_chunk(chunk);
                }
            }
            Err(e) => {
                return DrainOutcome::UpstreamError(total, e.to_string());
            }
        }
    }
    if let Some(chunk) = buffer.flush() {
        total += chunk.len() as u64;
        on_chunk(chunk);
    }
    DrainOutcome::Complete(total)
}

/// Temp file path a cache write uses while in flight; deleted on any
/// failure, renamed into place on success.
pub fn open_tmp_for_write(tmp_path: &PathBuf) -> std::io::Result<std::fs::File> {
    std::fs::File::create(tmp_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_buffer_flushes_at_chunk_size() {
        let mut buf = ChunkBuffer::default();
        let piece = vec![7u8; CHUNK_SIZE - 1];
        assert!(buf.push(&piece).is_empty());
        let more = buf.push(&[1, 2]);
        assert_eq!(more.len(), 1);
        assert_eq!(more[0].len(), CHUNK_SIZE);
        let tail = buf.flush().unwrap();
        assert_eq!(tail.len(), 1);
    }

    #[test]
    fn chunk_buffer_empty_flush_is_none() {
        let mut buf = ChunkBuffer::default();
        assert!(buf.flush().is_none());
    }

    async fn spawn_mirror(app: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn fetch_one_streams_a_200_response() {
        use axum::routing::get;
        let app = axum::Router::new().route("/hello_2.10.deb", get(|| async { "package bytes" }));
        let base = spawn_mirror(app).await;
        let client = reqwest::Client::new();

        let outcome = fetch_one(&client, &format!("{base}/hello_2.10.deb"), &BTreeMap::new()).await;
        match outcome {
            FetchOutcome::Stream { status, resp, .. } => {
                assert_eq!(status, 200);
                let body = resp.bytes().await.unwrap();
                assert_eq!(&body[..], b"package bytes");
            }
            _ => panic!("expected a streaming 200 response"),
        }
    }

    #[tokio::test]
    async fn fetch_one_classifies_404_as_recoverable() {
        use axum::http::StatusCode;
        use axum::routing::get;
        let app = axum::Router::new().route(
            "/missing.deb",
            get(|| async { StatusCode::NOT_FOUND }),
        );
        let base = spawn_mirror(app).await;
        let client = reqwest::Client::new();

        let outcome = fetch_one(&client, &format!("{base}/missing.deb"), &BTreeMap::new()).await;
        assert!(matches!(outcome, FetchOutcome::Recoverable(reason) if reason.contains("404")));
    }

    #[tokio::test]
    async fn fetch_one_treats_304_as_not_modified() {
        use axum::http::StatusCode;
        use axum::routing::get;
        let app = axum::Router::new().route(
            "/unchanged.deb",
            get(|| async { StatusCode::NOT_MODIFIED }),
        );
        let base = spawn_mirror(app).await;
        let client = reqwest::Client::new();

        let outcome = fetch_one(&client, &format!("{base}/unchanged.deb"), &BTreeMap::new()).await;
        assert!(matches!(outcome, FetchOutcome::NotModified { .. }));
    }
}
