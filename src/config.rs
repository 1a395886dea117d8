//! Configuration for the mirroring client.
//!
//! A [`MirrorConfig`] carries everything needed to construct an
//! [`HttpsClient`](crate::HttpsClient): the upstream endpoint, the polite
//! User-Agent the SEC requires, request pacing, the per-request timeout, and
//! the retry budget. Defaults are tuned for the public archive; tests point
//! `archive_url` at a mock server instead.

use std::time::Duration;

/// Settings for the HTTPS client.
///
/// The archive URL is normally derived from a host/port pair via
/// [`MirrorConfig::for_host`]; `with_archive_url` exists so tests can target
/// a local mock server without touching name resolution.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Base URL of the archive host (no trailing slash).
    pub archive_url: String,

    /// User agent string for HTTP requests (required by the SEC).
    pub user_agent: String,

    /// Politeness pacing in requests per second.
    pub rate_limit: u32,

    /// Per-request timeout.
    pub timeout: Duration,

    /// Retry budget for transient failures (429/5xx/transport).
    pub max_retries: u32,

    /// First backoff step; doubles per retry, with jitter.
    pub initial_backoff: Duration,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            archive_url: "https://www.sec.gov".to_string(),
            user_agent: "edgarmirror/0.1.0 (webmaster@example.com)".to_string(),
            rate_limit: 4,
            timeout: Duration::from_secs(30),
            max_retries: 5,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

impl MirrorConfig {
    /// Builds a config for an upstream host and port.
    ///
    /// Port 443 is elided from the URL so canonical paths stay bit-exact
    /// against the public archive.
    pub fn for_host(host: &str, port: u16) -> Self {
        let archive_url = if port == 443 {
            format!("https://{host}")
        } else {
            format!("https://{host}:{port}")
        };
        Self {
            archive_url,
            ..Self::default()
        }
    }

    /// Overrides the archive base URL verbatim. Used by tests against mock
    /// servers, which speak plain HTTP.
    pub fn with_archive_url(mut self, url: impl Into<String>) -> Self {
        self.archive_url = url.into();
        self
    }

    /// Overrides the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Overrides the retry budget. Tests set this low to keep failures fast.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}
