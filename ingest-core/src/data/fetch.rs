//! Fetcher — one vendor call, then drop any row with a missing cell.
//!
//! Rows are dropped here rather than filled: the raw file should only hold
//! values the vendor actually reported. Filling is the cleaner's job.

use super::provider::{DataError, DataProvider};
use crate::table::PriceTable;
use chrono::NaiveDate;
use tracing::info;

/// Default first day of the requested range.
pub const DEFAULT_START: NaiveDate = match NaiveDate::from_ymd_opt(2020, 1, 1) {
    Some(date) => date,
    None => panic!("invalid default start date"),
};

/// Default sampling interval (daily bars).
pub const DEFAULT_INTERVAL: &str = "1d";

/// What to fetch for a ticker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub start: NaiveDate,
    /// Exclusive end of the range. `None` means today.
    pub end: Option<NaiveDate>,
    /// Vendor-specific interval, e.g. `1d` or `1h`. Not validated here.
    pub interval: String,
}

impl Default for FetchRequest {
    fn default() -> Self {
        Self {
            start: DEFAULT_START,
            end: None,
            interval: DEFAULT_INTERVAL.to_string(),
        }
    }
}

impl FetchRequest {
    /// End of the range, falling back to today's local date.
    pub fn resolved_end(&self) -> NaiveDate {
        self.end.unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

/// Fetch a ticker's price table and drop incomplete rows.
///
/// Vendor errors propagate unchanged. If every row had a gap the result is an
/// empty table, not an error.
pub fn fetch_prices(
    provider: &dyn DataProvider,
    ticker: &str,
    request: &FetchRequest,
) -> Result<PriceTable, DataError> {
    let end = request.resolved_end();
    let fetched = provider.fetch(ticker, request.start, end, &request.interval)?;

    let complete = fetched.drop_incomplete();
    info!(
        ticker,
        provider = provider.name(),
        rows = complete.len(),
        dropped = fetched.len() - complete.len(),
        "fetched price data"
    );
    Ok(complete)
}
