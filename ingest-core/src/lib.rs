//! Ingest Core — fetch, clean, and persist OHLCV price series.
//!
//! The pipeline runs in four sequential stages:
//! - fetch rows for one ticker from a vendor, dropping incomplete rows
//! - save the fetched table as a dated raw CSV
//! - clean: dedupe, sort by timestamp, forward-fill then backward-fill
//! - save the cleaned table as a dated processed CSV
//!
//! Every stage takes a table by reference and returns a new value; nothing is
//! modified in place.

pub mod clean;
pub mod config;
pub mod data;
pub mod store;
pub mod table;

pub use clean::clean;
pub use config::{ConfigError, IngestConfig, ProviderConfig};
pub use data::{fetch_prices, DataError, DataProvider, FetchRequest, YahooProvider};
pub use store::{read_table, write_table, CsvStore};
pub use table::{Column, PriceRow, PriceTable};
