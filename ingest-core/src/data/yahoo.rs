//! Yahoo Finance data provider.
//!
//! Fetches OHLCV rows from Yahoo's v8 chart API with a single request. There is
//! no retry: any transport, status, or parse failure is returned to the caller.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.
//! Timestamps come back as UTC epoch seconds. Each one is converted to the
//! exchange's wall-clock time in its own IANA zone, so bars on either side of a
//! daylight-saving change keep their local session times. The index carries no
//! timezone. When the response names no zone, the fixed `gmtoffset` is used.

use super::provider::{DataError, DataProvider};
use crate::config::ProviderConfig;
use crate::table::{PriceRow, PriceTable};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, warn};

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    gmtoffset: Option<i64>,
    exchange_timezone_name: Option<String>,
}

/// Converts vendor epoch seconds to exchange wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ExchangeClock {
    /// IANA zone; the offset is looked up per instant.
    Zone(Tz),
    /// Fixed offset in seconds east of UTC.
    Fixed(i64),
}

impl ExchangeClock {
    fn from_meta(meta: Option<&ChartMeta>) -> Self {
        let Some(meta) = meta else {
            return ExchangeClock::Fixed(0);
        };
        if let Some(name) = meta.exchange_timezone_name.as_deref() {
            match name.parse::<Tz>() {
                Ok(tz) => return ExchangeClock::Zone(tz),
                Err(_) => warn!(zone = name, "unknown exchange timezone, using gmtoffset"),
            }
        }
        ExchangeClock::Fixed(meta.gmtoffset.unwrap_or(0))
    }

    fn local(self, epoch_secs: i64) -> Option<NaiveDateTime> {
        match self {
            ExchangeClock::Zone(tz) => DateTime::from_timestamp(epoch_secs, 0)
                .map(|dt| dt.with_timezone(&tz).naive_local()),
            ExchangeClock::Fixed(offset) => epoch_secs
                .checked_add(offset)
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .map(|dt| dt.naive_utc()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Intervals whose bars are labelled by date only.
const DAILY_INTERVALS: [&str; 5] = ["1d", "5d", "1wk", "1mo", "3mo"];

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    base_url: Url,
}

impl YahooProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            DataError::Other(format!("invalid provider base URL '{}': {e}", config.base_url))
        })?;

        Ok(Self { client, base_url })
    }

    /// Build the chart API URL. `end` is exclusive: period2 is midnight UTC of that day.
    ///
    /// The symbol is a single percent-encoded path segment and every query
    /// value is form-encoded, so tickers like `BRK/B` or `^GSPC` stay intact.
    fn chart_url(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: &str,
    ) -> Result<Url, DataError> {
        let start_ts = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end.and_time(NaiveTime::MIN).and_utc().timestamp();

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                DataError::Other(format!("provider base URL '{}' cannot hold a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        url.query_pairs_mut()
            .append_pair("period1", &start_ts.to_string())
            .append_pair("period2", &end_ts.to_string())
            .append_pair("interval", interval)
            .append_pair("includeAdjustedClose", "true")
            .append_pair("events", "div,splits");
        Ok(url)
    }

    /// Parse the chart API response into a table, keeping missing cells.
    fn parse_response(
        symbol: &str,
        interval: &str,
        resp: ChartResponse,
    ) -> Result<PriceTable, DataError> {
        if let Some(err) = resp.chart.error {
            return Err(chart_error(symbol, err));
        }

        let data = resp
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        // Yahoo omits the timestamp array entirely when the range holds no bars.
        let timestamps = data.timestamp.unwrap_or_default();
        if timestamps.is_empty() {
            return Err(DataError::NoData {
                symbol: symbol.to_string(),
            });
        }

        let clock = ExchangeClock::from_meta(data.meta.as_ref());
        let date_only = DAILY_INTERVALS.contains(&interval);

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        // Intraday responses carry no adjclose series; adjusted close is the close.
        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose);

        let mut rows = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let local = clock
                .local(ts)
                .ok_or_else(|| DataError::InvalidTimestamp(ts.to_string()))?;
            let timestamp = if date_only {
                local.date().and_time(NaiveTime::MIN)
            } else {
                local
            };

            let close = cell(&quote.close, i);
            let adj_close = match &adj_closes {
                Some(series) => cell(series, i),
                None => close,
            };

            rows.push(PriceRow {
                timestamp,
                open: cell(&quote.open, i),
                high: cell(&quote.high, i),
                low: cell(&quote.low, i),
                close,
                adj_close,
                volume: cell(&quote.volume, i),
            });
        }

        Ok(PriceTable::new(rows))
    }
}

fn cell(series: &[Option<f64>], i: usize) -> Option<f64> {
    series.get(i).copied().flatten()
}

fn chart_error(symbol: &str, err: ChartError) -> DataError {
    if err.code == "Not Found" {
        DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        }
    } else {
        DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: &str,
    ) -> Result<PriceTable, DataError> {
        let url = self.chart_url(symbol, start, end, interval)?;
        debug!(%url, "requesting chart data");

        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(DataError::AuthenticationRequired(
                "Yahoo Finance requires authentication".into(),
            ));
        }
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(DataError::Blocked);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(DataError::RateLimited {
                retry_after_secs: retry_after,
            });
        }
        if !status.is_success() {
            return Err(DataError::Http {
                status: status.as_u16(),
                symbol: symbol.to_string(),
            });
        }

        let chart: ChartResponse = resp.json().map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })?;

        Self::parse_response(symbol, interval, chart)
    }
}
