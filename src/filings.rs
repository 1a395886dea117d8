//! Bulk filing retrieval.
//!
//! Stage two of the pipeline: the index files have been parsed into a
//! [`FilingsPlan`], and the [`FilingRetriever`] mirrors every planned filing
//! to `<root>/<form-type>/<basename>`. Form types containing `/` (amendments
//! such as `10-K/A`) become nested directories. Every form type present in
//! the plan gets its subdirectory, created up front, so a completed run can
//! be audited by listing the root.
//!
//! Downloads go through the worker pool with the usual batch policy: a
//! filing the server has dropped is skipped with a warning, anything else
//! aborts the run. The sequential variant is the concurrent one with a
//! single worker, which keeps the two layouts provably identical.

use std::path::{Path, PathBuf};

use super::client::HttpsClient;
use super::error::Result;
use super::parsing::index::FilingsPlan;
use super::paths;
use super::pool::WorkerPool;

/// Mirrors the filings of a [`FilingsPlan`] under a destination root.
#[derive(Debug, Clone)]
pub struct FilingRetriever {
    client: HttpsClient,
}

impl FilingRetriever {
    pub fn new(client: HttpsClient) -> Self {
        Self { client }
    }

    /// Destination directory for one form type. `/` separators in the form
    /// name nest, so `10-K/A` lands under `<root>/10-K/A/`.
    pub fn form_dir(root: &Path, form_type: &str) -> PathBuf {
        let mut dir = root.to_path_buf();
        for segment in form_type.split('/') {
            let segment = segment.trim();
            if !segment.is_empty() {
                dir.push(segment);
            }
        }
        dir
    }

    /// Destination path for one filing.
    pub fn local_path(root: &Path, form_type: &str, remote: &str) -> PathBuf {
        Self::form_dir(root, form_type).join(paths::local_name(remote))
    }

    /// Mirrors the plan sequentially.
    pub async fn retrieve(
        &self,
        plan: &FilingsPlan,
        root: &Path,
        replace: bool,
    ) -> Result<Vec<PathBuf>> {
        self.retrieve_concurrent(plan, root, 1, replace).await
    }

    /// Mirrors the plan with up to `max_workers` parallel downloads.
    ///
    /// Returns the mirrored paths in plan order; skipped filings are
    /// omitted. Each work item writes to its own destination path, so no
    /// cross-worker coordination is needed.
    pub async fn retrieve_concurrent(
        &self,
        plan: &FilingsPlan,
        root: &Path,
        max_workers: usize,
        replace: bool,
    ) -> Result<Vec<PathBuf>> {
        for form in plan.forms() {
            tokio::fs::create_dir_all(Self::form_dir(root, form)).await?;
        }

        let jobs: Vec<_> = plan
            .iter()
            .map(|(form, remote)| {
                let client = self.client.clone();
                let local = Self::local_path(root, form, remote);
                let remote = remote.to_string();
                async move { client.mirror(&remote, &local, replace).await }
            })
            .collect();

        let results = WorkerPool::new(max_workers).run(jobs).await?;
        let mirrored: Vec<PathBuf> = results.into_iter().flatten().collect();
        tracing::info!("mirrored {} of {} planned filings", mirrored.len(), plan.len());
        Ok(mirrored)
    }
}
