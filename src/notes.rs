//! Financial-statements-and-notes bundles.
//!
//! The publisher ships these data sets as zip bundles: one per quarter
//! historically, one per month after a cut-over. A date range may straddle
//! the cut-over, in which case both shapes are emitted in chronological
//! order:
//!
//! - quarterly: `YYYYqN_notes.zip`, extracted into `YYYY_N/`
//! - monthly: `YYYY_MM_notes.zip`, extracted into `YYYY_MM/`
//!
//! A bundle only exists once its period has closed, so [`NotesPeriods`]
//! emits a period only when its last day falls inside the range. After
//! download each zip is expanded into its target subdirectory; the original
//! zip is retained next to it.

use chrono::{Datelike, NaiveDate};
use std::path::{Path, PathBuf};

use super::client::HttpsClient;
use super::dates::{DateRange, Quarter};
use super::error::{MirrorError, Result};
use super::paths;
use super::pool::WorkerPool;

/// First month the publisher shipped monthly bundles instead of quarterly.
pub fn monthly_cutover() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).expect("cut-over is a valid date")
}

/// One bundle to mirror: the remote zip basename and the subdirectory its
/// contents expand into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesBundle {
    pub zip_name: String,
    pub subdir: String,
}

/// Lazy sequence of bundles covering a date range, chronological.
#[derive(Debug, Clone)]
pub struct NotesPeriods {
    cursor: NaiveDate,
    end: NaiveDate,
}

impl NotesPeriods {
    pub fn over(range: &DateRange) -> Self {
        Self {
            cursor: range.begin(),
            end: range.end(),
        }
    }
}

impl Iterator for NotesPeriods {
    type Item = NotesBundle;

    fn next(&mut self) -> Option<NotesBundle> {
        if self.cursor > self.end {
            return None;
        }
        if self.cursor < monthly_cutover() {
            let quarter = Quarter::of(self.cursor);
            let last = quarter.last_day();
            if last > self.end {
                return None;
            }
            self.cursor = last.succ_opt().expect("day after quarter end is valid");
            Some(NotesBundle {
                zip_name: format!("{}q{}_notes.zip", quarter.year(), quarter.number()),
                subdir: format!("{}_{}", quarter.year(), quarter.number()),
            })
        } else {
            let (year, month) = (self.cursor.year(), self.cursor.month());
            let last = month_end(year, month);
            if last > self.end {
                return None;
            }
            self.cursor = last.succ_opt().expect("day after month end is valid");
            Some(NotesBundle {
                zip_name: format!("{year}_{month:02}_notes.zip"),
                subdir: format!("{year}_{month:02}"),
            })
        }
    }
}

fn month_end(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .expect("month start is a valid date")
        .pred_opt()
        .expect("month end is a valid date")
}

/// Mirrors and expands FinNotes bundles.
#[derive(Debug, Clone)]
pub struct NotesRetriever {
    client: HttpsClient,
}

impl NotesRetriever {
    pub fn new(client: HttpsClient) -> Self {
        Self { client }
    }

    /// Mirrors every bundle the range covers into `dest` and expands each
    /// into `dest/<subdir>/`, keeping the zip. Returns the zip paths in
    /// chronological order; bundles absent upstream are skipped.
    pub async fn retrieve(
        &self,
        range: &DateRange,
        dest: &Path,
        max_workers: usize,
        replace: bool,
    ) -> Result<Vec<PathBuf>> {
        let bundles: Vec<NotesBundle> = NotesPeriods::over(range).collect();
        if bundles.is_empty() {
            tracing::info!("no completed notes period inside {:?}..{:?}", range.begin(), range.end());
            return Ok(Vec::new());
        }
        tokio::fs::create_dir_all(dest).await?;

        let jobs: Vec<_> = bundles
            .iter()
            .map(|bundle| {
                let client = self.client.clone();
                let remote = paths::notes_bundle_path(&bundle.zip_name);
                let local = dest.join(&bundle.zip_name);
                let target = dest.join(&bundle.subdir);
                async move {
                    let zip_path = client.mirror(&remote, &local, replace).await?;
                    let extracted = zip_path.clone();
                    tokio::task::spawn_blocking(move || extract_zip(&extracted, &target))
                        .await
                        .map_err(|e| MirrorError::Assertion(format!("unzip task panicked: {e}")))??;
                    Ok(zip_path)
                }
            })
            .collect();

        let results = WorkerPool::new(max_workers).run(jobs).await?;
        Ok(results.into_iter().flatten().collect())
    }
}

/// Expands a zip archive into `target`, creating it as needed.
fn extract_zip(zip_path: &Path, target: &Path) -> Result<()> {
    let file = std::fs::File::open(zip_path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| MirrorError::Protocol(format!("corrupt zip {}: {e}", zip_path.display())))?;
    std::fs::create_dir_all(target)?;
    archive
        .extract(target)
        .map_err(|e| MirrorError::Protocol(format!("failed to extract {}: {e}", zip_path.display())))?;
    tracing::debug!("extracted {} into {}", zip_path.display(), target.display());
    Ok(())
}
