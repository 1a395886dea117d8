//! Parsing of EDGAR index files into a download plan.
//!
//! An index file is a text catalog of filings, one record per line after a
//! header block that ends with a separator line of dashes. Two layouts exist
//! in the archive:
//! - **form** indices: fixed-column, ordered Form Type | Company Name | CIK |
//!   Date Filed | Filename;
//! - **master** indices: pipe-delimited, ordered CIK | Company Name | Form
//!   Type | Date Filed | Filename.
//!
//! [`IndexParser`] detects the layout, applies the caller's form-type
//! allow-list, then the optional CIK allow-list, and accumulates the result
//! into a [`FilingsPlan`]. The plan never lists the same filing twice, no
//! matter how many index files reference it, and an optional `max` cap
//! truncates the concatenated form-ordered output.

use std::collections::{HashMap, HashSet};
use std::io::BufRead;
use std::path::PathBuf;

use crate::error::Result;

/// Column widths of the fixed-layout form index: Form Type, Company Name,
/// CIK, Date Filed; the filename takes the remainder of the line.
const FORM_INDEX_WIDTHS: [usize; 4] = [12, 62, 12, 12];

/// A parsed index record.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Form type, case preserved, embedded `/` preserved (e.g. `10-K/A`).
    pub form_type: String,

    /// Company name as listed.
    pub company_name: String,

    /// CIK, zero-padded to 10 digits.
    pub cik: String,

    /// Date filed, as spelled in the index.
    pub date_filed: String,

    /// Rooted remote path of the filing document.
    pub path: String,
}

/// Index file layout.
#[derive(Debug, Clone, Copy, PartialEq)]
enum IndexLayout {
    Form,
    Master,
}

/// Download plan: form-type buckets in request order, each holding the
/// remote paths of the filings to mirror.
///
/// Buckets are created up front from the caller's form list (preserving its
/// order) or on first encounter when no form filter is in play. Paths are
/// globally de-duplicated.
#[derive(Debug, Default)]
pub struct FilingsPlan {
    buckets: Vec<(String, Vec<String>)>,
    positions: HashMap<String, usize>,
    seen: HashSet<String>,
}

impl FilingsPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeds buckets so output ordering follows the requested form list.
    pub fn with_forms<I, S>(forms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut plan = Self::default();
        for form in forms {
            plan.bucket_for(&form.into());
        }
        plan
    }

    fn bucket_for(&mut self, form: &str) -> usize {
        if let Some(&pos) = self.positions.get(form) {
            return pos;
        }
        let pos = self.buckets.len();
        self.buckets.push((form.to_string(), Vec::new()));
        self.positions.insert(form.to_string(), pos);
        pos
    }

    /// Records a filing under its form type. Returns false when the path was
    /// already planned.
    pub fn add(&mut self, form: &str, path: String) -> bool {
        if !self.seen.insert(path.clone()) {
            return false;
        }
        let pos = self.bucket_for(form);
        self.buckets[pos].1.push(path);
        true
    }

    /// Caps the concatenated output at `max` paths, respecting bucket order.
    pub fn truncate(&mut self, max: usize) {
        let mut remaining = max;
        for (_, paths) in &mut self.buckets {
            if paths.len() > remaining {
                paths.truncate(remaining);
            }
            remaining -= paths.len();
        }
    }

    /// Form types in output order.
    pub fn forms(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().map(|(form, _)| form.as_str())
    }

    /// Planned paths for one form type.
    pub fn paths_for(&self, form: &str) -> &[String] {
        self.positions
            .get(form)
            .map(|&pos| self.buckets[pos].1.as_slice())
            .unwrap_or(&[])
    }

    /// All `(form, path)` pairs in concatenated form order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.buckets
            .iter()
            .flat_map(|(form, paths)| paths.iter().map(move |p| (form.as_str(), p.as_str())))
    }

    /// Total number of planned filings.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|(_, paths)| paths.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parser over one or more local index files.
///
/// Filters are applied in order: form-type allow-list (exact match on the
/// trimmed form), then CIK allow-list, then the `max` cap after all files
/// have been read.
#[derive(Debug, Default)]
pub struct IndexParser {
    form_types: Option<Vec<String>>,
    ciks: Option<HashSet<String>>,
    max: Option<usize>,
}

impl IndexParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts output to the given form types; their order becomes the
    /// plan's bucket order.
    pub fn with_form_types<I, S>(mut self, forms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let forms: Vec<String> = forms.into_iter().map(Into::into).collect();
        self.form_types = if forms.is_empty() { None } else { Some(forms) };
        self
    }

    /// Restricts output to filings by the given CIKs (zero-padded 10-digit
    /// strings). Applied after the form filter.
    pub fn with_ciks<I, S>(mut self, ciks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ciks: HashSet<String> = ciks.into_iter().map(Into::into).collect();
        self.ciks = if ciks.is_empty() { None } else { Some(ciks) };
        self
    }

    /// Caps the plan at `max` filings.
    pub fn with_max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    /// Parses a set of local index files into one de-duplicated plan.
    pub fn parse_files(&self, files: &[PathBuf]) -> Result<FilingsPlan> {
        let mut plan = match &self.form_types {
            Some(forms) => FilingsPlan::with_forms(forms.iter().cloned()),
            None => FilingsPlan::new(),
        };
        for path in files {
            let reader = std::io::BufReader::new(std::fs::File::open(path)?);
            self.parse_into(reader, &mut plan)?;
        }
        if let Some(max) = self.max {
            plan.truncate(max);
        }
        Ok(plan)
    }

    /// Parses a single index file into an existing plan.
    pub fn parse_into<R: BufRead>(&self, reader: R, plan: &mut FilingsPlan) -> Result<()> {
        let mut layout = None;
        let mut in_header = true;

        for line in reader.lines() {
            let line = line?;
            if in_header {
                // The header block ends with a separator line of dashes.
                // Layout is betrayed by the pipe-delimited column header.
                if line.contains('|') || line.contains("Master Index") {
                    layout = Some(IndexLayout::Master);
                }
                if line.contains("---") {
                    in_header = false;
                }
                continue;
            }
            if line.trim().is_empty() || line.starts_with("---") {
                continue;
            }
            let layout = *layout.get_or_insert_with(|| {
                if line.contains('|') {
                    IndexLayout::Master
                } else {
                    IndexLayout::Form
                }
            });
            if let Some(entry) = parse_line(&line, layout) {
                self.accept(entry, plan);
            }
        }
        Ok(())
    }

    fn accept(&self, entry: IndexEntry, plan: &mut FilingsPlan) {
        if let Some(forms) = &self.form_types {
            if !forms.iter().any(|f| f == &entry.form_type) {
                return;
            }
        }
        if let Some(ciks) = &self.ciks {
            if !ciks.contains(&entry.cik) {
                return;
            }
        }
        plan.add(&entry.form_type, entry.path);
    }
}

/// Parses one record line. Returns None for rows that do not carry the five
/// expected fields or whose CIK is not numeric.
fn parse_line(line: &str, layout: IndexLayout) -> Option<IndexEntry> {
    let fields: Vec<String> = match layout {
        IndexLayout::Master => line.split('|').map(|s| s.trim().to_string()).collect(),
        IndexLayout::Form => split_fixed_width(line, &FORM_INDEX_WIDTHS),
    };
    if fields.len() < 5 {
        return None;
    }

    let (form_type, company_name, cik_raw, date_filed, filename) = match layout {
        IndexLayout::Form => (&fields[0], &fields[1], &fields[2], &fields[3], &fields[4]),
        IndexLayout::Master => (&fields[2], &fields[1], &fields[0], &fields[3], &fields[4]),
    };

    let cik_digits: u64 = match cik_raw.parse() {
        Ok(n) => n,
        Err(_) => {
            tracing::warn!("skipping index row with bad CIK {cik_raw:?}");
            return None;
        }
    };

    let path = if filename.starts_with('/') {
        filename.clone()
    } else {
        format!("/Archives/{filename}")
    };

    Some(IndexEntry {
        form_type: form_type.clone(),
        company_name: company_name.clone(),
        cik: format!("{cik_digits:010}"),
        date_filed: date_filed.clone(),
        path,
    })
}

/// Splits a fixed-width line into trimmed fields; any remainder past the
/// configured widths becomes the final field.
fn split_fixed_width(line: &str, widths: &[usize]) -> Vec<String> {
    let mut result = Vec::new();
    let mut start = 0;

    for &width in widths {
        if start >= line.len() {
            break;
        }
        let end = (start + width).min(line.len());
        result.push(line[start..end].trim().to_string());
        start += width;
    }

    if start < line.len() {
        result.push(line[start..].trim().to_string());
    }

    result
}
