//! Ticker→CIK translation cache.
//!
//! The archive publishes a manifest mapping stock tickers to Central Index
//! Keys at a well-known path. [`TickerCache`] downloads that manifest once,
//! persists it as a tabular text file, and answers lookups for the rest of
//! the run. Lookups never fail: unknown tickers resolve to the
//! [`NO_CIK_FOUND`] sentinel so filtering code can treat resolution as
//! infallible.
//!
//! The cache is written once during single-threaded startup and read-only
//! afterwards. Duplicate tickers in the manifest resolve last-writer-wins,
//! in manifest key order.

use serde::Deserialize;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use super::client::HttpsClient;
use super::error::Result;

/// Sentinel returned for tickers the cache cannot resolve.
pub const NO_CIK_FOUND: &str = "**no_CIK_found**";

/// Remote path of the ticker manifest.
pub const TICKER_MANIFEST_PATH: &str = "/files/company_tickers.json";

/// One manifest record. The upstream spells the CIK as a bare number under
/// the `cik_str` key.
#[derive(Debug, Deserialize)]
struct ManifestRecord {
    #[serde(rename = "cik_str")]
    cik: u64,
    ticker: String,
    title: String,
}

/// In-memory ticker→CIK map with tabular-file persistence.
#[derive(Debug, Default)]
pub struct TickerCache {
    map: HashMap<String, String>,
}

impl TickerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct tickers known.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Fetches the upstream manifest, ingests it, and writes the tabular
    /// cache to `local_file`. Returns the number of manifest records
    /// ingested, which the caller can log against the loaded count.
    pub async fn download(&mut self, client: &HttpsClient, local_file: &Path) -> Result<usize> {
        let body = client.retrieve_text(TICKER_MANIFEST_PATH).await?;
        let records: HashMap<String, ManifestRecord> = serde_json::from_str(&body)?;

        // Manifest keys are numeric strings; replay them in numeric order so
        // duplicate-ticker collisions resolve deterministically.
        let mut ordered: Vec<(u64, ManifestRecord)> = records
            .into_iter()
            .filter_map(|(key, record)| key.parse::<u64>().ok().map(|n| (n, record)))
            .collect();
        ordered.sort_by_key(|(n, _)| *n);

        let count = ordered.len();
        if let Some(parent) = local_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = std::fs::File::create(local_file)?;
        for (_, record) in ordered {
            let ticker = record.ticker.to_uppercase();
            let cik = format!("{:010}", record.cik);
            writeln!(out, "{ticker}\t{cik}\t{}", record.title)?;
            self.map.insert(ticker, cik);
        }
        out.flush()?;

        tracing::info!(
            "ingested {} ticker records ({} distinct tickers)",
            count,
            self.map.len()
        );
        Ok(count)
    }

    /// Loads a previously saved cache file, replacing current contents.
    /// Returns the number of distinct tickers loaded; collisions within the
    /// file resolve last-writer-wins, so this may be less than its line
    /// count.
    pub fn load(&mut self, path: &Path) -> Result<usize> {
        self.map.clear();
        let reader = BufReader::new(std::fs::File::open(path)?);
        for line in reader.lines() {
            let line = line?;
            let mut cols = line.split('\t');
            let (Some(ticker), Some(cik)) = (cols.next(), cols.next()) else {
                continue;
            };
            if ticker.is_empty() || cik.is_empty() {
                continue;
            }
            self.map.insert(ticker.to_uppercase(), cik.to_string());
        }
        Ok(self.map.len())
    }

    /// Writes the cache as tabular text, sorted by ticker.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut entries: Vec<(&String, &String)> = self.map.iter().collect();
        entries.sort();
        let mut out = std::fs::File::create(path)?;
        for (ticker, cik) in entries {
            writeln!(out, "{ticker}\t{cik}")?;
        }
        out.flush()?;
        Ok(())
    }

    /// Resolves a ticker to its 10-digit CIK, or the sentinel for unknown
    /// tickers. Input case does not matter. Never fails.
    pub fn cik_for(&self, ticker: &str) -> String {
        self.map
            .get(&ticker.to_uppercase())
            .cloned()
            .unwrap_or_else(|| NO_CIK_FOUND.to_string())
    }

    /// Bulk resolution from a file of tickers, one per line, taking column
    /// `col_idx` of each whitespace-separated row. Returns the CIKs that
    /// resolved; the resolution count is the returned length.
    pub fn resolve_ticker_file(&self, path: &Path, col_idx: usize) -> Result<Vec<String>> {
        let reader = BufReader::new(std::fs::File::open(path)?);
        let mut resolved = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let Some(ticker) = line.split_whitespace().nth(col_idx) else {
                continue;
            };
            let cik = self.cik_for(ticker);
            if cik == NO_CIK_FOUND {
                tracing::warn!("no CIK found for ticker {ticker}");
            } else {
                resolved.push(cik);
            }
        }
        Ok(resolved)
    }

    /// Inserts a single mapping, last-writer-wins.
    pub fn insert(&mut self, ticker: &str, cik: &str) {
        self.map.insert(ticker.to_uppercase(), cik.to_string());
    }
}
