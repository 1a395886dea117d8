//! Error types for the edgarmirror library.
//!
//! All fallible operations return `Result<T, MirrorError>`. The variants map
//! directly onto the failure modes of a mirroring run: bad caller input,
//! dates outside the archive, artifacts missing upstream, transport failures,
//! unexpected HTTP statuses, malformed payloads, and local filesystem errors.
//!
//! Batch operations distinguish two classes of failure. A [`MirrorError::NotFound`]
//! on a single artifact is an expected outcome of server-side gaps and is
//! recovered by skipping the item; everything else aborts the batch. Use
//! [`MirrorError::is_skippable`] to make that call.

use thiserror::Error;

/// Error type covering every edgarmirror operation.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// Unparseable date string, malformed argument. Fatal for the invocation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Date beyond today, or no intersection with the upstream archive.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// Individual artifact absent upstream. Batches skip these with a warning.
    #[error("resource not found")]
    NotFound,

    /// TLS/DNS/TCP failure or request timeout, after retries are exhausted.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status that survived the retry policy.
    #[error("unexpected HTTP status {status} for {url}")]
    Http { status: u16, url: String },

    /// Truncated response body or decompression failure.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Local filesystem failure (disk full, permissions). Always fatal,
    /// including in concurrent paths.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON payload (ticker manifest).
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal invariant broken.
    #[error("invariant violated: {0}")]
    Assertion(String),
}

impl MirrorError {
    /// Whether a batch may recover from this error by skipping the item.
    ///
    /// Only `NotFound` qualifies: a missing artifact is an upstream gap, not
    /// a defect of the run.
    pub fn is_skippable(&self) -> bool {
        matches!(self, MirrorError::NotFound)
    }
}

pub type Result<T> = std::result::Result<T, MirrorError>;
