//! Command-line mirror driver.
//!
//! Picks a mode, resolves the date range and ticker filters, then runs the
//! two-stage pipeline: mirror index files, parse them into a plan, mirror
//! the planned filings. Exits 0 on success and 1 on any fatal error, with
//! the diagnostic written through the configured log sink.

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

use edgarmirror::{
    DailyIndexRetriever, DateRange, FilingRetriever, HttpsClient, IndexParser, IndexRetriever,
    MirrorConfig, NO_CIK_FOUND, NotesRetriever, QuarterlyIndexRetriever, TickerCache, parse_date,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Mirror daily index files (and their filings).
    Daily,
    /// Mirror quarterly index files (and their filings).
    Quarterly,
    /// Refresh the ticker cache and resolve tickers to CIKs.
    TickerOnly,
    /// Mirror financial-statements-and-notes bundles.
    Notes,
}

#[derive(Debug, Parser)]
#[command(
    name = "edgarmirror",
    version,
    about = "Mirror subsets of the SEC EDGAR archive to a local directory tree"
)]
struct Cli {
    /// What to mirror.
    #[arg(long, value_enum, default_value_t = Mode::Daily)]
    mode: Mode,

    /// Upstream archive host.
    #[arg(long, default_value = "www.sec.gov")]
    host: String,

    /// Upstream archive port.
    #[arg(long, default_value_t = 443)]
    port: u16,

    /// Start of the date range (YYYY-MM-DD). A single date means begin = end.
    #[arg(long)]
    begin_date: Option<String>,

    /// End of the date range (YYYY-MM-DD).
    #[arg(long)]
    end_date: Option<String>,

    /// Destination root for index files.
    #[arg(long, default_value = "index-files")]
    index_dir: PathBuf,

    /// Destination root for filings.
    #[arg(long, default_value = "form-files")]
    form_dir: PathBuf,

    /// Destination root for notes bundles.
    #[arg(long, default_value = "notes-files")]
    notes_directory: PathBuf,

    /// Mirror index files only; skip the filing-download stage.
    #[arg(long)]
    index_only: bool,

    /// Re-download index files that already exist locally.
    #[arg(long)]
    replace_index_files: bool,

    /// Re-download filings (and notes bundles) that already exist locally.
    #[arg(long)]
    replace_form_files: bool,

    /// Form types to keep, comma separated (e.g. 10-K,10-Q,4).
    #[arg(long, value_delimiter = ',')]
    form: Vec<String>,

    /// Tickers to filter by, comma separated.
    #[arg(long, value_delimiter = ',')]
    ticker: Vec<String>,

    /// File of tickers to filter by, one per row.
    #[arg(long)]
    ticker_file: Option<PathBuf>,

    /// Column of the ticker file holding the ticker symbol.
    #[arg(long, default_value_t = 0)]
    ticker_file_column: usize,

    /// Path of the persistent ticker→CIK cache.
    #[arg(long)]
    ticker_cache: Option<PathBuf>,

    /// Cap on the number of filings to download.
    #[arg(long)]
    max: Option<usize>,

    /// Maximum parallel downloads.
    #[arg(long, default_value_t = 4)]
    max_workers: usize,

    /// User-Agent header; the SEC expects contact information here.
    #[arg(long)]
    user_agent: Option<String>,

    /// Log filter (e.g. info, debug, edgarmirror=trace).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Append diagnostics to this file instead of stderr.
    #[arg(long)]
    log_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = init_logging(&cli.log_level, cli.log_path.as_deref()) {
        eprintln!("failed to initialize logging: {err:#}");
        std::process::exit(1);
    }
    if let Err(err) = run(cli).await {
        tracing::error!("run failed: {err:#}");
        std::process::exit(1);
    }
}

fn init_logging(level: &str, log_path: Option<&Path>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match log_path {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_target(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .init();
        }
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let range = resolve_range(&cli)?;
    let mut config = MirrorConfig::for_host(&cli.host, cli.port);
    if let Some(user_agent) = &cli.user_agent {
        config = config.with_user_agent(user_agent.clone());
    }
    let client = HttpsClient::new(config)?;

    match cli.mode {
        Mode::Daily => {
            let retriever = DailyIndexRetriever::new(client.clone());
            mirror_indexes(&cli, &client, &retriever, range).await
        }
        Mode::Quarterly => {
            let retriever = QuarterlyIndexRetriever::new(client.clone());
            mirror_indexes(&cli, &client, &retriever, range).await
        }
        Mode::TickerOnly => ticker_only(&cli, &client).await,
        Mode::Notes => {
            let mirrored = NotesRetriever::new(client)
                .retrieve(
                    &range,
                    &cli.notes_directory,
                    cli.max_workers,
                    cli.replace_form_files,
                )
                .await?;
            tracing::info!("mirrored {} notes bundles", mirrored.len());
            Ok(())
        }
    }
}

fn resolve_range(cli: &Cli) -> Result<DateRange> {
    let begin = cli.begin_date.as_deref().map(parse_date).transpose()?;
    let end = cli.end_date.as_deref().map(parse_date).transpose()?;
    let today = chrono::Local::now().date_naive();
    let (begin, end) = match (begin, end) {
        (Some(b), Some(e)) => (b, e),
        (Some(b), None) => (b, b),
        (None, Some(e)) => (e, e),
        (None, None) => (today, today),
    };
    Ok(DateRange::new(begin, end)?)
}

async fn mirror_indexes<R: IndexRetriever>(
    cli: &Cli,
    client: &HttpsClient,
    retriever: &R,
    range: DateRange,
) -> Result<()> {
    let remotes = retriever.remote_paths_for_range(&range).await?;
    tracing::info!(
        "{} index files cover {}..{}",
        remotes.len(),
        range.begin(),
        range.end()
    );

    let indexes = retriever
        .copy_index_files_concurrent(
            &remotes,
            &cli.index_dir,
            cli.max_workers,
            cli.replace_index_files,
        )
        .await?;
    tracing::info!("mirrored {} index files into {}", indexes.len(), cli.index_dir.display());

    if cli.index_only {
        return Ok(());
    }

    let mut parser = IndexParser::new();
    if !cli.form.is_empty() {
        parser = parser.with_form_types(cli.form.iter().cloned());
    }
    if let Some(ciks) = cik_filter(cli, client).await? {
        parser = parser.with_ciks(ciks);
    }
    if let Some(max) = cli.max {
        parser = parser.with_max(max);
    }

    let plan = parser.parse_files(&indexes)?;
    tracing::info!(
        "planned {} filings across {} form types",
        plan.len(),
        plan.forms().count()
    );

    FilingRetriever::new(client.clone())
        .retrieve_concurrent(&plan, &cli.form_dir, cli.max_workers, cli.replace_form_files)
        .await?;
    Ok(())
}

/// Resolves the requested tickers into a CIK allow-list. `None` means no
/// ticker filtering was requested at all; an all-unresolvable request is an
/// error rather than a silently unfiltered run.
async fn cik_filter(cli: &Cli, client: &HttpsClient) -> Result<Option<Vec<String>>> {
    if cli.ticker.is_empty() && cli.ticker_file.is_none() {
        return Ok(None);
    }

    let cache = prepare_cache(cli, client, false).await?;
    let mut ciks = Vec::new();
    for ticker in &cli.ticker {
        let cik = cache.cik_for(ticker);
        if cik == NO_CIK_FOUND {
            tracing::warn!("no CIK found for ticker {ticker}");
        } else {
            ciks.push(cik);
        }
    }
    if let Some(path) = &cli.ticker_file {
        ciks.extend(cache.resolve_ticker_file(path, cli.ticker_file_column)?);
    }

    if ciks.is_empty() {
        bail!("none of the requested tickers resolved to a CIK");
    }
    Ok(Some(ciks))
}

/// Loads the ticker cache from disk, downloading the manifest when the
/// cache file is missing or a refresh is forced.
async fn prepare_cache(cli: &Cli, client: &HttpsClient, refresh: bool) -> Result<TickerCache> {
    let cache_path = cli
        .ticker_cache
        .clone()
        .unwrap_or_else(|| PathBuf::from("ticker_cache.txt"));

    let mut cache = TickerCache::new();
    if !refresh && cache_path.exists() {
        let count = cache.load(&cache_path)?;
        tracing::info!("loaded {count} tickers from {}", cache_path.display());
    } else {
        let count = cache.download(client, &cache_path).await?;
        tracing::info!("downloaded {count} ticker records to {}", cache_path.display());
    }
    Ok(cache)
}

async fn ticker_only(cli: &Cli, client: &HttpsClient) -> Result<()> {
    let cache = prepare_cache(cli, client, true).await?;

    for ticker in &cli.ticker {
        println!("{ticker}\t{}", cache.cik_for(ticker));
    }
    if let Some(path) = &cli.ticker_file {
        let resolved = cache.resolve_ticker_file(path, cli.ticker_file_column)?;
        tracing::info!(
            "resolved {} tickers from {}",
            resolved.len(),
            path.display()
        );
        for cik in resolved {
            println!("{cik}");
        }
    }
    Ok(())
}
