//! # edgarmirror - mirror subsets of the SEC EDGAR archive
//!
//! edgarmirror downloads slices of the SEC's EDGAR public filings archive
//! into a deterministic local directory tree. Given a date range and a mode
//! it plans exactly which remote artifacts are needed, fetches them politely
//! in parallel, and lays them out so the local tree mirrors the remote one.
//!
//! ## Features
//!
//! - **Polite HTTPS client** - rate limiting, retries with backoff, atomic
//!   temp-file writes, transparent gzip decompression
//! - **Index retrieval** - daily and quarterly index files, mirrored flat or
//!   hierarchically, idempotent re-runs
//! - **Filing retrieval** - parses index files into a de-duplicated plan
//!   filtered by form type and ticker, mirrors filings per form type
//! - **Ticker resolution** - persistent ticker→CIK cache seeded from the
//!   archive's manifest
//! - **FinNotes bundles** - quarterly/monthly financial-statements-and-notes
//!   zips across the publisher's cut-over, downloaded and expanded
//!
//! ## Basic Usage
//!
//! ```no_run
//! use edgarmirror::{
//!     DateRange, DailyIndexRetriever, HttpsClient, IndexParser, IndexRetriever, FilingRetriever,
//! };
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpsClient::for_host("www.sec.gov", 443)?;
//!     let range = DateRange::new(
//!         chrono::NaiveDate::from_ymd_opt(2013, 10, 14).unwrap(),
//!         chrono::NaiveDate::from_ymd_opt(2013, 10, 17).unwrap(),
//!     )?;
//!
//!     let retriever = DailyIndexRetriever::new(client.clone());
//!     let remotes = retriever.remote_paths_for_range(&range).await?;
//!     let indexes = retriever
//!         .copy_index_files_concurrent(&remotes, Path::new("index-files"), 4, false)
//!         .await?;
//!
//!     let plan = IndexParser::new()
//!         .with_form_types(["10-K", "10-Q"])
//!         .parse_files(&indexes)?;
//!     FilingRetriever::new(client)
//!         .retrieve_concurrent(&plan, Path::new("form-files"), 4, false)
//!         .await?;
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod dates;
mod error;
mod filings;
mod indexes;
mod notes;
pub mod parsing;
pub mod paths;
mod pool;
mod tickers;

// Re-export core types for a clean API
pub use client::HttpsClient;
pub use config::MirrorConfig;
pub use dates::{DateRange, Quarter, parse_date};
pub use error::{MirrorError, Result};
pub use filings::FilingRetriever;
pub use indexes::{DailyIndexRetriever, IndexRetriever, QuarterlyIndexRetriever};
pub use notes::{NotesBundle, NotesPeriods, NotesRetriever, monthly_cutover};
pub use parsing::index::{FilingsPlan, IndexEntry, IndexParser};
pub use pool::WorkerPool;
pub use tickers::{NO_CIK_FOUND, TICKER_MANIFEST_PATH, TickerCache};

// Version information
/// Current crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
