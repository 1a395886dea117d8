//! Bounded-concurrency batch driver.
//!
//! Both retrievers push their downloads through a [`WorkerPool`]: submit a
//! batch of jobs, collect results in submission order. At most `max_workers`
//! jobs run at once. A job failing with [`NotFound`](crate::MirrorError::NotFound)
//! is recorded as a skip (server-side gaps are normal); any other failure
//! cancels the remaining work and becomes the batch's error — local I/O and
//! network faults must never be papered over by a concurrent path.
//!
//! Side-effect ordering between in-flight jobs is unspecified; the returned
//! vector always mirrors the submission order. Jobs write to disjoint
//! destination paths by construction, so the pool needs no locking.

use futures_util::stream::{self, StreamExt};
use std::future::Future;

use super::error::Result;

/// Runs batches of fallible jobs with bounded concurrency.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    max_workers: usize,
}

impl WorkerPool {
    /// Creates a pool. A worker count of zero is promoted to one.
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Drives `jobs` to completion, at most `max_workers` at a time.
    ///
    /// The result vector mirrors submission order: `Some(value)` for a
    /// completed job, `None` for one skipped on `NotFound`. The first fatal
    /// error aborts the batch; jobs not yet started never run, and in-flight
    /// ones are dropped.
    pub async fn run<T, Fut>(&self, jobs: Vec<Fut>) -> Result<Vec<Option<T>>>
    where
        Fut: Future<Output = Result<T>>,
    {
        let mut results = Vec::with_capacity(jobs.len());
        let mut inflight = stream::iter(jobs).buffered(self.max_workers);
        while let Some(outcome) = inflight.next().await {
            match outcome {
                Ok(value) => results.push(Some(value)),
                Err(e) if e.is_skippable() => {
                    tracing::warn!("skipping absent artifact: {e}");
                    results.push(None);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(results)
    }
}
