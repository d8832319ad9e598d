//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over the market-data vendor so the fetcher
//! can be driven by a stub in tests.

use crate::table::PriceTable;
use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for data operations.
///
/// These are designed to be displayable straight from the CLI.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("provider refused the request (HTTP 403)")]
    Blocked,

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no price data for {symbol} in the requested range")]
    NoData { symbol: String },

    #[error("invalid ticker '{0}': must be non-empty and contain no path separators")]
    InvalidTicker(String),

    #[error("HTTP {status} for {symbol}")]
    Http { status: u16, symbol: String },

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("unexpected CSV header: {0}")]
    InvalidHeader(String),

    #[error("invalid number '{value}' in column {column}")]
    InvalidNumber { column: String, value: String },

    #[error("data error: {0}")]
    Other(String),
}

impl DataError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DataError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        DataError::Csv {
            path: path.into(),
            source,
        }
    }
}

/// Trait for market-data vendors.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch OHLCV rows for a ticker over `[start, end)` at the given interval.
    ///
    /// The interval string is vendor-specific and passed through unchecked.
    /// The returned table is exactly what the vendor sent, missing cells included.
    fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: &str,
    ) -> Result<PriceTable, DataError>;
}
