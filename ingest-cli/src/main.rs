//! ohlcv-ingest — fetch a ticker's price history, save it raw, clean it, save it again.
//!
//! Usage: `ohlcv-ingest SPY --start 2020-01-01 --end 2024-12-31 --interval 1d`
//!
//! Files land in `{data_dir}/raw` and `{data_dir}/processed`; `data_dir`
//! comes from `--data-dir`, then the `--config` file, then defaults to `./data`.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use ingest_core::data::{DEFAULT_INTERVAL, DEFAULT_START};
use ingest_core::{
    clean, fetch_prices, read_table, CsvStore, FetchRequest, IngestConfig, PriceTable,
    YahooProvider,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ohlcv-ingest", about = "Fetch and clean market data")]
struct Cli {
    /// Ticker symbol, e.g. SPY.
    ticker: String,

    /// Start date (YYYY-MM-DD). Defaults to 2020-01-01.
    #[arg(long, value_parser = parse_date, default_value_t = DEFAULT_START)]
    start: NaiveDate,

    /// End date (YYYY-MM-DD), exclusive. Defaults to today.
    #[arg(long, value_parser = parse_date)]
    end: Option<NaiveDate>,

    /// Data interval (e.g. 1d, 1h).
    #[arg(long, default_value = DEFAULT_INTERVAL)]
    interval: String,

    /// TOML config file with data_dir and provider settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root directory for raw/ and processed/. Overrides the config file.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Clean an existing raw CSV instead of fetching. No raw file is written.
    #[arg(long)]
    from_raw: Option<PathBuf>,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let store = CsvStore::new(&config);

    let raw = match &cli.from_raw {
        Some(path) => read_table(path)
            .with_context(|| format!("failed to load raw data from {}", path.display()))?,
        None => run_fetch(&cli, &config, &store)?,
    };

    let cleaned = clean(&raw);
    let processed_path = store
        .save_processed(&cleaned, &cli.ticker)
        .context("failed to save processed data")?;

    print_summary(&cli.ticker, &raw, &cleaned, &processed_path);
    Ok(())
}

fn load_config(cli: &Cli) -> Result<IngestConfig> {
    let mut config = match &cli.config {
        Some(path) => IngestConfig::from_file(path)?,
        None => IngestConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

/// Fetch from Yahoo and persist the result untouched.
fn run_fetch(cli: &Cli, config: &IngestConfig, store: &CsvStore) -> Result<PriceTable> {
    let provider = YahooProvider::new(&config.provider)?;
    let request = FetchRequest {
        start: cli.start,
        end: cli.end,
        interval: cli.interval.clone(),
    };

    let table = fetch_prices(&provider, &cli.ticker, &request)
        .with_context(|| format!("failed to fetch data for {}", cli.ticker))?;
    store
        .save_raw(&table, &cli.ticker)
        .context("failed to save raw data")?;
    Ok(table)
}

fn print_summary(ticker: &str, raw: &PriceTable, cleaned: &PriceTable, path: &std::path::Path) {
    println!();
    println!("=== {ticker} ===");
    println!("Raw rows:       {}", raw.len());
    println!("Cleaned rows:   {}", cleaned.len());
    println!("Missing cells:  {} -> {}", raw.missing_count(), cleaned.missing_count());
    if let (Some(first), Some(last)) = (cleaned.rows().first(), cleaned.rows().last()) {
        println!("Range:          {} to {}", first.timestamp, last.timestamp);
    }
    println!("Output:         {}", path.display());
}
