//! Vendor access: provider trait, Yahoo client, and the fetcher.

pub mod fetch;
pub mod provider;
pub mod yahoo;

pub use fetch::{fetch_prices, FetchRequest, DEFAULT_INTERVAL, DEFAULT_START};
pub use provider::{DataError, DataProvider};
pub use yahoo::YahooProvider;
