//! Canonical remote paths and their local mirror layout.
//!
//! Everything here is a pure function: dates and quarters go in, POSIX-style
//! archive paths come out. The retrievers never build a path themselves.
//!
//! Canonical remote forms:
//! - daily index: `/Archives/edgar/daily-index/YYYY/QTRn/form.YYYYMMDD.idx[.gz]`
//! - quarterly index: `/Archives/edgar/full-index/YYYY/QTRn/{master,form}.idx`
//! - FinNotes bundle: `/files/dera/data/financial-statement-and-notes-data-sets/<zip>`
//!
//! Local layout is either flat (`<dir>/<basename>`) or hierarchical
//! (`<dir>/YYYY/QTRn/<basename>`). Because the client gunzips `.gz` remotes
//! while streaming, the `.gz` suffix is dropped from local names.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};

use super::dates::Quarter;
use super::error::{MirrorError, Result};

/// Root of the daily index tree on the archive host.
pub const DAILY_INDEX_ROOT: &str = "/Archives/edgar/daily-index";

/// Root of the quarterly (full) index tree.
pub const FULL_INDEX_ROOT: &str = "/Archives/edgar/full-index";

/// Root of the financial-statements-and-notes bundles.
pub const NOTES_ROOT: &str = "/files/dera/data/financial-statement-and-notes-data-sets";

/// Quarterly index product names, in preference order. The server decides
/// which one it serves for a given quarter; both are accepted.
pub const QUARTERLY_INDEX_CANDIDATES: [&str; 2] = ["master.idx", "form.idx"];

/// Remote directory holding the daily indices of a quarter.
pub fn daily_index_dir(quarter: &Quarter) -> String {
    format!("{DAILY_INDEX_ROOT}/{}/{}", quarter.year(), quarter.dir_name())
}

/// Daily form-index file name for a date (`form.YYYYMMDD.idx`).
pub fn daily_index_name(date: NaiveDate) -> String {
    format!("form.{}.idx", date.format("%Y%m%d"))
}

/// Full remote path of the daily form index for a date.
pub fn daily_index_path(date: NaiveDate) -> String {
    format!("{}/{}", daily_index_dir(&Quarter::of(date)), daily_index_name(date))
}

/// Remote directory holding the quarterly index products of a quarter.
pub fn quarterly_index_dir(quarter: &Quarter) -> String {
    format!("{FULL_INDEX_ROOT}/{}/{}", quarter.year(), quarter.dir_name())
}

/// Full remote path of a FinNotes bundle by zip basename.
pub fn notes_bundle_path(zip_name: &str) -> String {
    format!("{NOTES_ROOT}/{zip_name}")
}

/// Local basename for a remote artifact. `.gz` is stripped because the
/// client decompresses while streaming.
pub fn local_name(remote: &str) -> &str {
    let base = remote.rsplit('/').next().unwrap_or(remote);
    base.strip_suffix(".gz").unwrap_or(base)
}

/// Flat local layout: `<dir>/<basename>`.
pub fn flat_local_path(dir: &Path, remote: &str) -> PathBuf {
    dir.join(local_name(remote))
}

/// Hierarchical local layout mirroring the remote tree:
/// `<dir>/YYYY/QTRn/<basename>`. Falls back to flat when the remote path
/// carries no year/quarter components.
pub fn hierarchical_local_path(dir: &Path, remote: &str) -> PathBuf {
    let segments: Vec<&str> = remote.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 3 {
        return flat_local_path(dir, remote);
    }
    let year = segments[segments.len() - 3];
    let quarter = segments[segments.len() - 2];
    dir.join(year).join(quarter).join(local_name(remote))
}

/// Extracts the `YYYYMMDD` date embedded in an index file name such as
/// `form.20131014.idx` or `master.20131014.idx.gz`.
pub fn index_file_date(name: &str) -> Option<NaiveDate> {
    let mut parts = name.split('.');
    let _stem = parts.next()?;
    let date = parts.next()?;
    if date.len() != 8 {
        return None;
    }
    NaiveDate::parse_from_str(date, "%Y%m%d").ok()
}

fn has_stem(name: &str, stem: &str) -> bool {
    name.split('.').next() == Some(stem)
}

/// Finds the daily form index for an exact date in a quarter listing,
/// preferring the gzipped variant when both are present.
pub fn find_daily_index_file(date: NaiveDate, listing: &[String]) -> Option<String> {
    let plain = daily_index_name(date);
    let gz = format!("{plain}.gz");
    if listing.iter().any(|n| *n == gz) {
        return Some(gz);
    }
    listing.iter().find(|n| **n == plain).cloned()
}

/// Selects the daily form index with the greatest date ≤ `target` from a
/// quarter listing.
///
/// When the target date itself is listed, it is returned. Gzipped names win
/// over plain ones for the same date.
///
/// # Errors
///
/// `MirrorError::NotFound` when no listed index is dated at or before the
/// target.
pub fn nearest_index_file(target: NaiveDate, listing: &[String]) -> Result<(String, NaiveDate)> {
    let mut best: Option<(NaiveDate, &String)> = None;
    for name in listing {
        if !has_stem(name, "form") {
            continue;
        }
        let Some(date) = index_file_date(name) else {
            continue;
        };
        if date > target {
            continue;
        }
        match &best {
            Some((best_date, best_name)) => {
                let upgrade = date > *best_date
                    || (date == *best_date && name.ends_with(".gz") && !best_name.ends_with(".gz"));
                if upgrade {
                    best = Some((date, name));
                }
            }
            None => best = Some((date, name)),
        }
    }
    best.map(|(date, name)| (name.clone(), date))
        .ok_or(MirrorError::NotFound)
}
