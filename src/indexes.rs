//! Daily and quarterly index retrieval.
//!
//! The archive publishes *index files* cataloguing filings, per day under
//! `daily-index/YYYY/QTRn/` and per quarter under `full-index/YYYY/QTRn/`.
//! Mirroring a date range starts here: the retriever turns the range into
//! the exact set of remote index paths, then copies each one into the local
//! tree.
//!
//! The two variants share the [`IndexRetriever`] trait. The daily retriever
//! confirms every candidate day against the quarter's directory listing
//! (weekends and holidays have no index), while the quarterly retriever
//! probes each quarter directory for whichever index product the server
//! serves — `master.idx` on newer archives, `form.idx` on older ones.
//!
//! Copies are idempotent: with `replace == false` an existing destination is
//! left untouched, preserved timestamps included. Batch copies skip files
//! the server no longer has and abort on anything worse.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

use super::client::HttpsClient;
use super::dates::{DateRange, Quarter};
use super::error::{MirrorError, Result};
use super::paths;
use super::pool::WorkerPool;

/// Operations shared by the daily and quarterly index retrievers.
#[async_trait]
pub trait IndexRetriever: Sync {
    /// The client downloads go through.
    fn client(&self) -> &HttpsClient;

    /// Remote index paths covering the range: ascending, duplicate-free,
    /// and only paths the variant can vouch for.
    async fn remote_paths_for_range(&self, range: &DateRange) -> Result<Vec<String>>;

    /// Mirrors one index file into `dir` flat (`<dir>/<basename>`).
    /// No-op returning the existing path when `replace` is false and the
    /// destination exists.
    async fn copy_index_file(&self, remote: &str, dir: &Path, replace: bool) -> Result<PathBuf> {
        self.client()
            .mirror(remote, &paths::flat_local_path(dir, remote), replace)
            .await
    }

    /// Mirrors one index file into `dir` hierarchically
    /// (`<dir>/YYYY/QTRn/<basename>`), same replace semantics.
    async fn copy_index_file_hierarchical(
        &self,
        remote: &str,
        dir: &Path,
        replace: bool,
    ) -> Result<PathBuf> {
        self.client()
            .mirror(remote, &paths::hierarchical_local_path(dir, remote), replace)
            .await
    }

    /// Mirrors a batch sequentially. Equivalent to the concurrent variant
    /// with a single worker.
    async fn copy_index_files(
        &self,
        remotes: &[String],
        dir: &Path,
        replace: bool,
    ) -> Result<Vec<PathBuf>> {
        self.copy_index_files_concurrent(remotes, dir, 1, replace)
            .await
    }

    /// Mirrors a batch with up to `max_workers` parallel downloads, laying
    /// files out hierarchically. Missing files are skipped with a warning;
    /// any other failure aborts the batch. The returned paths follow the
    /// input order.
    async fn copy_index_files_concurrent(
        &self,
        remotes: &[String],
        dir: &Path,
        max_workers: usize,
        replace: bool,
    ) -> Result<Vec<PathBuf>> {
        let jobs: Vec<_> = remotes
            .iter()
            .map(|remote| {
                let client = self.client().clone();
                let local = paths::hierarchical_local_path(dir, remote);
                let remote = remote.clone();
                async move { client.mirror(&remote, &local, replace).await }
            })
            .collect();
        let results = WorkerPool::new(max_workers).run(jobs).await?;
        Ok(results.into_iter().flatten().collect())
    }
}

/// Retriever over the daily index tree.
#[derive(Debug, Clone)]
pub struct DailyIndexRetriever {
    client: HttpsClient,
}

impl DailyIndexRetriever {
    pub fn new(client: HttpsClient) -> Self {
        Self { client }
    }

    /// Finds the daily index nearest to (at or before) `target` and records
    /// the date actually found.
    ///
    /// Weekends and federal holidays publish no index; this walks back to
    /// the latest business day the quarter listing carries.
    pub async fn nearest_index_file(&self, target: NaiveDate) -> Result<(String, NaiveDate)> {
        let dir = paths::daily_index_dir(&Quarter::of(target));
        let listing = self.client.list_directory(&dir).await?;
        let (name, actual) = paths::nearest_index_file(target, &listing)?;
        if actual != target {
            tracing::info!("no index for {target}, using nearest at {actual}");
        }
        Ok((format!("{dir}/{name}"), actual))
    }
}

#[async_trait]
impl IndexRetriever for DailyIndexRetriever {
    fn client(&self) -> &HttpsClient {
        &self.client
    }

    async fn remote_paths_for_range(&self, range: &DateRange) -> Result<Vec<String>> {
        let mut found = Vec::new();
        for quarter in range.quarters() {
            let dir = paths::daily_index_dir(&quarter);
            let listing = match self.client.list_directory(&dir).await {
                Ok(listing) => listing,
                Err(MirrorError::NotFound) => {
                    tracing::warn!("no daily index directory at {dir}");
                    continue;
                }
                Err(e) => return Err(e),
            };
            for day in range.days().filter(|d| Quarter::of(*d) == quarter) {
                if let Some(name) = paths::find_daily_index_file(day, &listing) {
                    found.push(format!("{dir}/{name}"));
                }
            }
        }
        Ok(found)
    }
}

/// Retriever over the quarterly (full) index tree.
#[derive(Debug, Clone)]
pub struct QuarterlyIndexRetriever {
    client: HttpsClient,
}

impl QuarterlyIndexRetriever {
    pub fn new(client: HttpsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IndexRetriever for QuarterlyIndexRetriever {
    fn client(&self) -> &HttpsClient {
        &self.client
    }

    async fn remote_paths_for_range(&self, range: &DateRange) -> Result<Vec<String>> {
        let mut found = Vec::new();
        for quarter in range.quarters() {
            let dir = paths::quarterly_index_dir(&quarter);
            match self.client.list_directory(&dir).await {
                Ok(listing) => match pick_quarterly_product(&listing) {
                    Some(name) => found.push(format!("{dir}/{name}")),
                    None => tracing::warn!("no quarterly index product in {dir}"),
                },
                Err(MirrorError::NotFound) => {
                    tracing::warn!("no quarterly index directory at {dir}");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(found)
    }
}

/// Picks the quarterly index product the server serves, preferring
/// `master.idx` over `form.idx` and a gzipped sibling over plain.
fn pick_quarterly_product(listing: &[String]) -> Option<String> {
    for candidate in paths::QUARTERLY_INDEX_CANDIDATES {
        let gz = format!("{candidate}.gz");
        if listing.iter().any(|n| *n == gz) {
            return Some(gz);
        }
        if listing.iter().any(|n| n == candidate) {
            return Some(candidate.to_string());
        }
    }
    None
}
