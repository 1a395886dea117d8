//! Low-level HTTPS access to the archive host.
//!
//! [`HttpsClient`] is the single place that knows about HTTP, politeness,
//! retries, compression, and atomic file writes. The retrievers built on top
//! of it deal purely in remote paths and local paths.
//!
//! Three operations cover everything the pipeline needs:
//! - [`HttpsClient::retrieve_text`] for index listings and the ticker manifest,
//! - [`HttpsClient::list_directory`] for HTML directory pages,
//! - [`HttpsClient::download_file`] for mirroring artifacts to disk.
//!
//! # Politeness
//!
//! The SEC's fair-access policy expects automated clients to pace themselves
//! and identify who they are. Every request passes through a token-bucket
//! rate limiter before it is sent, and the configured User-Agent rides on
//! every request. Transient failures (429, 5xx, transport errors) are retried
//! with exponential backoff and jitter before the terminal error surfaces.
//!
//! # Atomicity
//!
//! Downloads stream into a named temp file in the destination directory
//! which is persisted over the destination only after the body completed
//! and decoded cleanly. A failed or disk-full write therefore never leaves
//! a partial artifact behind: the temp file is deleted on drop. Disk writes
//! are blocking, so they run on the blocking pool, off the async workers.

use bytes::Bytes;
use flate2::write::GzDecoder;
use futures_util::StreamExt;
use governor::{
    Quota, RateLimiter, clock::DefaultClock, middleware::NoOpMiddleware, state::InMemoryState,
    state::NotKeyed,
};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::io::{self, Write};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::time::sleep;

use super::config::MirrorConfig;
use super::error::{MirrorError, Result};

type Governor = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// HTTPS fetcher with rate limiting, retry logic, and gzip-aware downloads.
#[derive(Debug, Clone)]
pub struct HttpsClient {
    /// HTTP client for making requests
    client: reqwest::Client,

    /// Token bucket rate limiter for fair-access compliance
    rate_limiter: Arc<Governor>,

    /// Base URL of the archive host
    archive_url: String,

    /// Retry budget for transient failures
    max_retries: u32,

    /// First backoff step; doubles per retry
    initial_backoff: Duration,
}

impl HttpsClient {
    /// Creates a client from a configuration.
    ///
    /// # Errors
    ///
    /// Returns `MirrorError::InvalidInput` if the user agent is malformed,
    /// the rate limit is zero, or the HTTP client cannot be built.
    pub fn new(config: MirrorConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| MirrorError::InvalidInput(format!("invalid user agent: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| MirrorError::InvalidInput(format!("failed to build HTTP client: {e}")))?;

        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(
            NonZeroU32::new(config.rate_limit).ok_or_else(|| {
                MirrorError::InvalidInput("rate limit must be greater than zero".to_string())
            })?,
        )));

        Ok(HttpsClient {
            client,
            rate_limiter,
            archive_url: config.archive_url,
            max_retries: config.max_retries,
            initial_backoff: config.initial_backoff,
        })
    }

    /// Creates a client for a host/port pair with default settings.
    pub fn for_host(host: &str, port: u16) -> Result<Self> {
        Self::new(MirrorConfig::for_host(host, port))
    }

    /// Returns the archive base URL.
    pub fn archive_url(&self) -> &str {
        &self.archive_url
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.archive_url, path)
    }

    /// Wait duration for the given retry attempt: `initial × 2^retry ± 20%`.
    /// The jitter spreads concurrent workers apart after a shared stall.
    fn backoff(&self, retry: u32) -> Duration {
        let backoff_ms = self.initial_backoff.as_millis() as u64 * (2_u64.pow(retry));
        let jitter = (backoff_ms as f64 * 0.2 * (fastrand::f64() - 0.5)) as i64;
        Duration::from_millis((backoff_ms as i64 + jitter) as u64)
    }

    /// Performs a GET with the politeness gate and retry policy, returning
    /// the response once a 200 arrives.
    ///
    /// Status mapping: 404 → `NotFound`; 429 and 5xx are retried with
    /// backoff and become `Http` on exhaustion; other statuses are `Http`
    /// immediately; transport errors are retried and become `Network`.
    async fn send(&self, path: &str) -> Result<reqwest::Response> {
        let url = self.url_for(path);
        let mut retries = 0;

        loop {
            self.rate_limiter.until_ready().await;

            match self.client.get(&url).send().await {
                Ok(response) => {
                    let status = response.status();
                    match status {
                        StatusCode::OK => return Ok(response),
                        StatusCode::NOT_FOUND => return Err(MirrorError::NotFound),
                        s if s == StatusCode::TOO_MANY_REQUESTS || s.is_server_error() => {
                            if retries >= self.max_retries {
                                return Err(MirrorError::Http {
                                    status: s.as_u16(),
                                    url,
                                });
                            }
                            // Honor Retry-After on 429 when the server sends one.
                            let wait = response
                                .headers()
                                .get("retry-after")
                                .and_then(|h| h.to_str().ok())
                                .and_then(|v| v.parse::<u64>().ok())
                                .map(Duration::from_secs)
                                .unwrap_or_else(|| self.backoff(retries));
                            tracing::warn!(
                                "status {} for {}, attempt {}/{}, retrying in {:?}",
                                s,
                                url,
                                retries + 1,
                                self.max_retries + 1,
                                wait
                            );
                            sleep(wait).await;
                            retries += 1;
                        }
                        s => {
                            return Err(MirrorError::Http {
                                status: s.as_u16(),
                                url,
                            });
                        }
                    }
                }
                Err(e) => {
                    if retries >= self.max_retries {
                        return Err(MirrorError::Network(e));
                    }
                    let wait = self.backoff(retries);
                    tracing::warn!(
                        "request failed for {}: {}, attempt {}/{}, retrying in {:?}",
                        url,
                        e,
                        retries + 1,
                        self.max_retries + 1,
                        wait
                    );
                    sleep(wait).await;
                    retries += 1;
                }
            }
        }
    }

    /// Performs a GET and returns the decoded body.
    pub async fn retrieve_text(&self, path: &str) -> Result<String> {
        let response = self.send(path).await?;
        response.text().await.map_err(MirrorError::Network)
    }

    /// GETs a directory page and extracts the artifact names its anchors
    /// point at, in server order, duplicates removed.
    pub async fn list_directory(&self, path: &str) -> Result<Vec<String>> {
        let body = self.retrieve_text(path).await?;
        Ok(extract_artifact_names(&body))
    }

    /// Streams a remote file to `local`.
    ///
    /// `.gz` remotes are decompressed on the fly, so the local file holds
    /// the plain payload. `.zip` remotes are written verbatim; the returned
    /// path lets the caller extract the archive afterwards. The body streams
    /// into a named temp file in the destination directory which is
    /// persisted over `local` only on success; on failure the temp file is
    /// deleted on drop.
    ///
    /// # Errors
    ///
    /// * `MirrorError::NotFound` — artifact absent upstream
    /// * `MirrorError::Protocol` — truncated body or corrupt gzip stream
    /// * `MirrorError::Io` — local filesystem failure
    pub async fn download_file(&self, remote: &str, local: &Path) -> Result<PathBuf> {
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let response = self.send(remote).await?;
        let expected_len = response.content_length();
        self.write_body(response, local, remote.ends_with(".gz"), expected_len)
            .await?;

        tracing::debug!("mirrored {} -> {}", remote, local.display());
        Ok(local.to_path_buf())
    }

    /// Idempotent download: when `replace` is false and `local` already
    /// exists, nothing is fetched and the existing path is returned with its
    /// timestamps untouched.
    pub async fn mirror(&self, remote: &str, local: &Path, replace: bool) -> Result<PathBuf> {
        if !replace && local.exists() {
            tracing::debug!("{} already mirrored, skipping", local.display());
            return Ok(local.to_path_buf());
        }
        self.download_file(remote, local).await
    }

    /// Pumps the response body into a temp-file writer on the blocking
    /// pool, then persists the temp file over `local`.
    ///
    /// Disk writes are synchronous, so a dedicated blocking task owns the
    /// writer and drains a channel of body chunks; the async side only
    /// touches the network. The temp file is persisted only after the body
    /// arrived whole and decoded cleanly.
    async fn write_body(
        &self,
        response: reqwest::Response,
        local: &Path,
        gzipped: bool,
        expected_len: Option<u64>,
    ) -> Result<()> {
        let dir = match local.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, mut rx) = tokio::sync::mpsc::channel::<Bytes>(8);
        let writer = tokio::task::spawn_blocking(move || -> Result<NamedTempFile> {
            let mut sink = if gzipped {
                BodyWriter::Gzip(GzDecoder::new(NamedTempFile::new_in(&dir)?))
            } else {
                BodyWriter::Plain(NamedTempFile::new_in(&dir)?)
            };
            while let Some(chunk) = rx.blocking_recv() {
                sink.write_chunk(&chunk)?;
            }
            sink.finish()
        });

        let mut received: u64 = 0;
        let mut pumped: Result<()> = Ok(());
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(chunk) => {
                    received += chunk.len() as u64;
                    // A closed channel means the writer bailed; its error
                    // surfaces below.
                    if tx.send(chunk).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    pumped = Err(MirrorError::Protocol(format!("body read failed: {e}")));
                    break;
                }
            }
        }
        drop(tx);

        let written = writer
            .await
            .map_err(|e| MirrorError::Assertion(format!("download writer panicked: {e}")))?;
        // A body error is the root cause even when it also starved the
        // writer; dropping the temp file cleans up either way.
        pumped?;
        let tmp = written?;

        if let Some(expected) = expected_len {
            if received != expected {
                return Err(MirrorError::Protocol(format!(
                    "truncated response: got {received} of {expected} bytes"
                )));
            }
        }

        let dest = local.to_path_buf();
        tokio::task::spawn_blocking(move || {
            tmp.persist(&dest)
                .map(drop)
                .map_err(|e| MirrorError::Io(e.error))
        })
        .await
        .map_err(|e| MirrorError::Assertion(format!("persist task panicked: {e}")))?
    }
}

/// Sink for a download body, either verbatim or gunzipping as it goes.
enum BodyWriter {
    Plain(NamedTempFile),
    Gzip(GzDecoder<NamedTempFile>),
}

impl BodyWriter {
    fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        match self {
            BodyWriter::Plain(f) => f.write_all(chunk),
            BodyWriter::Gzip(d) => d.write_all(chunk),
        }
        .map_err(Self::classify)
    }

    fn finish(self) -> Result<NamedTempFile> {
        match self {
            BodyWriter::Plain(mut f) => {
                f.flush().map_err(MirrorError::Io)?;
                Ok(f)
            }
            BodyWriter::Gzip(d) => d.finish().map_err(Self::classify),
        }
    }

    /// flate2 reports corrupt streams as InvalidInput/InvalidData and a
    /// stream cut short as UnexpectedEof; real filesystem failures keep
    /// their errno-carrying kinds.
    fn classify(e: io::Error) -> MirrorError {
        match e.kind() {
            io::ErrorKind::InvalidInput
            | io::ErrorKind::InvalidData
            | io::ErrorKind::UnexpectedEof => {
                MirrorError::Protocol(format!("gzip decode failed: {e}"))
            }
            _ => MirrorError::Io(e),
        }
    }
}

/// Pulls artifact names out of a directory page.
///
/// Keeps anchor targets whose basename looks like a file (contains a dot),
/// dropping navigational links (parent dirs, sort toggles, subdirectories).
/// Order is the server's; duplicates are removed.
fn extract_artifact_names(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").expect("static selector");

    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if href.contains('?') || href.starts_with('#') || href.ends_with('/') {
            continue;
        }
        let name = href.rsplit('/').next().unwrap_or(href);
        if name.is_empty() || !name.contains('.') || name.starts_with('.') {
            continue;
        }
        if seen.insert(name.to_string()) {
            names.push(name.to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_growth() {
        let client = HttpsClient::new(MirrorConfig::default()).unwrap();
        let backoff0 = client.backoff(0);
        let backoff1 = client.backoff(1);
        let backoff2 = client.backoff(2);

        assert!(backoff0 < backoff1);
        assert!(backoff1 < backoff2);

        // ±20% around 500ms, 1000ms, 2000ms
        assert!(backoff0.as_millis() >= 400 && backoff0.as_millis() <= 600);
        assert!(backoff1.as_millis() >= 800 && backoff1.as_millis() <= 1200);
        assert!(backoff2.as_millis() >= 1600 && backoff2.as_millis() <= 2400);
    }

    #[test]
    fn test_extract_artifact_names() {
        let html = r#"
<html><body>
<h1>Index of /Archives/edgar/daily-index/2013/QTR4</h1>
<table>
<tr><td><a href="../">Parent Directory</a></td></tr>
<tr><td><a href="?C=N;O=D">Name</a></td></tr>
<tr><td><a href="form.20131014.idx">form.20131014.idx</a></td></tr>
<tr><td><a href="form.20131014.idx">form.20131014.idx</a></td></tr>
<tr><td><a href="master.20131014.idx.gz">master.20131014.idx.gz</a></td></tr>
<tr><td><a href="subdir/">subdir</a></td></tr>
</table>
</body></html>"#;
        let names = extract_artifact_names(html);
        assert_eq!(names, vec!["form.20131014.idx", "master.20131014.idx.gz"]);
    }

    #[test]
    fn test_extract_artifact_names_absolute_hrefs() {
        let html = r#"<a href="/Archives/edgar/daily-index/2013/QTR4/form.20131015.idx">form.20131015.idx</a>
<a href="/Archives/edgar/daily-index/2013/QTR4/">QTR4</a>"#;
        let names = extract_artifact_names(html);
        assert_eq!(names, vec!["form.20131015.idx"]);
    }

    #[test]
    fn test_invalid_rate_limit() {
        let config = MirrorConfig {
            rate_limit: 0,
            ..MirrorConfig::default()
        };
        assert!(matches!(
            HttpsClient::new(config),
            Err(MirrorError::InvalidInput(_))
        ));
    }
}
