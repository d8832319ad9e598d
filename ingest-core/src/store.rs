//! CSV persistence for price tables.
//!
//! Layout:
//! - raw:       `{raw_dir}/{TICKER}_{YYYY-MM-DD}.csv`
//! - processed: `{processed_dir}/{TICKER}_{YYYY-MM-DD}_cleaned.csv`
//!
//! The date is the day the file was written, so a rerun on the same day
//! overwrites the earlier file. Writes are not atomic.
//!
//! File format: header row, timestamp index first (`Date` for date-only
//! indexes, `Datetime` otherwise), then the six value columns. Missing cells
//! are written as empty fields.

use crate::config::IngestConfig;
use crate::data::provider::DataError;
use crate::table::{Column, PriceRow, PriceTable};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Writes raw and cleaned tables into their configured directories.
#[derive(Debug, Clone)]
pub struct CsvStore {
    raw_dir: PathBuf,
    processed_dir: PathBuf,
}

impl CsvStore {
    pub fn new(config: &IngestConfig) -> Self {
        Self::with_dirs(config.raw_dir(), config.processed_dir())
    }

    pub fn with_dirs(raw_dir: impl Into<PathBuf>, processed_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            processed_dir: processed_dir.into(),
        }
    }

    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    pub fn processed_dir(&self) -> &Path {
        &self.processed_dir
    }

    /// `{raw_dir}/{ticker}_{date}.csv`
    pub fn raw_path(&self, ticker: &str, date: NaiveDate) -> PathBuf {
        self.raw_dir.join(format!("{ticker}_{}.csv", date.format(DATE_FORMAT)))
    }

    /// `{processed_dir}/{ticker}_{date}_cleaned.csv`
    pub fn processed_path(&self, ticker: &str, date: NaiveDate) -> PathBuf {
        self.processed_dir
            .join(format!("{ticker}_{}_cleaned.csv", date.format(DATE_FORMAT)))
    }

    /// Save a table as fetched, dated today.
    pub fn save_raw(&self, table: &PriceTable, ticker: &str) -> Result<PathBuf, DataError> {
        self.save_raw_on(table, ticker, today())
    }

    pub fn save_raw_on(
        &self,
        table: &PriceTable,
        ticker: &str,
        date: NaiveDate,
    ) -> Result<PathBuf, DataError> {
        check_ticker(ticker)?;
        let path = self.raw_path(ticker, date);
        write_into(&self.raw_dir, &path, table)?;
        info!("[Data Ingest] Saved raw data to {}", path.display());
        Ok(path)
    }

    /// Save a cleaned table, dated today.
    pub fn save_processed(&self, table: &PriceTable, ticker: &str) -> Result<PathBuf, DataError> {
        self.save_processed_on(table, ticker, today())
    }

    pub fn save_processed_on(
        &self,
        table: &PriceTable,
        ticker: &str,
        date: NaiveDate,
    ) -> Result<PathBuf, DataError> {
        check_ticker(ticker)?;
        let path = self.processed_path(ticker, date);
        write_into(&self.processed_dir, &path, table)?;
        info!("[Data Ingest] Saved processed data to {}", path.display());
        Ok(path)
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// The ticker becomes part of a file name, so it must not be able to leave
/// the target directory.
fn check_ticker(ticker: &str) -> Result<(), DataError> {
    let unsafe_char = |c: char| c == '/' || c == '\\' || c == '\0';
    if ticker.is_empty() || ticker == "." || ticker == ".." || ticker.contains(unsafe_char) {
        return Err(DataError::InvalidTicker(ticker.to_string()));
    }
    Ok(())
}

fn write_into(dir: &Path, path: &Path, table: &PriceTable) -> Result<(), DataError> {
    fs::create_dir_all(dir).map_err(|e| DataError::io(dir, e))?;
    write_table(path, table)
}

/// Write a table to `path`, replacing any existing file.
pub fn write_table(path: &Path, table: &PriceTable) -> Result<(), DataError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| DataError::csv(path, e))?;

    let daily = table.is_daily();
    let index_label = if daily { "Date" } else { "Datetime" };
    let mut header = vec![index_label];
    header.extend(Column::ALL.iter().map(|c| c.label()));
    wtr.write_record(&header).map_err(|e| DataError::csv(path, e))?;

    for row in table.rows() {
        let stamp = if daily {
            row.timestamp.format(DATE_FORMAT).to_string()
        } else {
            row.timestamp.format(DATETIME_FORMAT).to_string()
        };
        let mut record = Vec::with_capacity(Column::ALL.len() + 1);
        record.push(stamp);
        record.extend(
            Column::ALL
                .iter()
                .map(|&c| row.get(c).map(|v| v.to_string()).unwrap_or_default()),
        );
        wtr.write_record(&record).map_err(|e| DataError::csv(path, e))?;
    }

    wtr.flush().map_err(|e| DataError::io(path, e))?;
    Ok(())
}

/// Load a table written by [`write_table`].
pub fn read_table(path: &Path) -> Result<PriceTable, DataError> {
    let mut rdr = csv::Reader::from_path(path).map_err(|e| DataError::csv(path, e))?;

    let headers = rdr.headers().map_err(|e| DataError::csv(path, e))?.clone();
    let value_labels: Vec<&str> = headers.iter().skip(1).collect();
    let expected: Vec<&str> = Column::ALL.iter().map(|c| c.label()).collect();
    if value_labels != expected {
        return Err(DataError::InvalidHeader(
            headers.iter().collect::<Vec<_>>().join(","),
        ));
    }

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| DataError::csv(path, e))?;
        let mut fields = record.iter();
        let stamp = fields.next().unwrap_or_default();
        let mut row = PriceRow::empty(parse_timestamp(stamp)?);
        for (&column, raw) in Column::ALL.iter().zip(fields) {
            row.set(column, parse_cell(column, raw)?);
        }
        rows.push(row);
    }

    Ok(PriceTable::new(rows))
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, DataError> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT)
        .or_else(|_| {
            NaiveDate::parse_from_str(raw, DATE_FORMAT).map(|d| d.and_time(NaiveTime::MIN))
        })
        .map_err(|_| DataError::InvalidTimestamp(raw.to_string()))
}

fn parse_cell(column: Column, raw: &str) -> Result<Option<f64>, DataError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| DataError::InvalidNumber {
            column: column.label().to_string(),
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn sample_table() -> PriceTable {
        let mut gappy = PriceRow::empty(day("2024-01-03").and_time(NaiveTime::MIN));
        gappy.close = Some(101.25);
        PriceTable::new(vec![
            PriceRow::empty(day("2024-01-02").and_time(NaiveTime::MIN))
                .with(Column::Open, 100.0)
                .with(Column::High, 102.5)
                .with(Column::Low, 99.0)
                .with(Column::Close, 101.0)
                .with(Column::AdjClose, 98.731)
                .with(Column::Volume, 1_234_567.0),
            gappy,
        ])
    }

    #[test]
    fn file_names_follow_ticker_and_date() {
        let store = CsvStore::with_dirs("r", "p");
        assert_eq!(
            store.raw_path("SPY", day("2024-03-05")),
            PathBuf::from("r").join("SPY_2024-03-05.csv")
        );
        assert_eq!(
            store.processed_path("SPY", day("2024-03-05")),
            PathBuf::from("p").join("SPY_2024-03-05_cleaned.csv")
        );
    }

    #[test]
    fn tickers_that_escape_the_directory_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CsvStore::with_dirs(tmp.path().join("raw"), tmp.path().join("processed"));
        let table = sample_table();

        for ticker in ["../x", "a/b", "a\\b", "", ".."] {
            let err = store
                .save_processed_on(&table, ticker, day("2024-01-03"))
                .unwrap_err();
            assert!(matches!(err, DataError::InvalidTicker(ref t) if t == ticker));
            assert!(store.save_raw_on(&table, ticker, day("2024-01-03")).is_err());
        }
        assert!(!tmp.path().join("x_2024-01-03_cleaned.csv").exists());
        assert!(!store.processed_dir().exists());
    }

    #[test]
    fn punctuated_tickers_are_accepted() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CsvStore::with_dirs(tmp.path().join("raw"), tmp.path().join("processed"));
        let path = store
            .save_raw_on(&sample_table(), "^GSPC", day("2024-01-03"))
            .unwrap();
        assert_eq!(path, tmp.path().join("raw").join("^GSPC_2024-01-03.csv"));
        assert!(path.exists());
    }

    #[test]
    fn daily_table_writes_date_index_and_empty_missing_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        write_table(&path, &sample_table()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Date,Open,High,Low,Close,Adj Close,Volume");
        assert_eq!(lines[1], "2024-01-02,100,102.5,99,101,98.731,1234567");
        assert_eq!(lines[2], "2024-01-03,,,,101.25,,");
    }

    #[test]
    fn intraday_table_writes_datetime_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let stamp = day("2024-01-02").and_hms_opt(9, 30, 0).unwrap();
        let table = PriceTable::new(vec![PriceRow::empty(stamp).with(Column::Close, 1.5)]);
        write_table(&path, &table).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Datetime,"));
        assert!(text.contains("2024-01-02 09:30:00,,,,1.5,,"));
        assert_eq!(read_table(&path).unwrap(), table);
    }

    #[test]
    fn written_table_reads_back_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let table = sample_table();
        write_table(&path, &table).unwrap();
        assert_eq!(read_table(&path).unwrap(), table);
    }

    #[test]
    fn save_creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::with_dirs(
            dir.path().join("data/raw"),
            dir.path().join("data/processed"),
        );
        let raw = store
            .save_raw_on(&sample_table(), "SPY", day("2024-01-04"))
            .unwrap();
        let processed = store
            .save_processed_on(&sample_table(), "SPY", day("2024-01-04"))
            .unwrap();
        assert!(raw.exists());
        assert!(processed.exists());
        assert!(processed.ends_with("SPY_2024-01-04_cleaned.csv"));
    }

    #[test]
    fn unexpected_header_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "Date,Price\n2024-01-02,1\n").unwrap();
        assert!(matches!(read_table(&path), Err(DataError::InvalidHeader(_))));
    }

    #[test]
    fn garbage_cells_are_reported_with_their_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(
            &path,
            "Date,Open,High,Low,Close,Adj Close,Volume\n2024-01-02,1,2,0.5,abc,1,10\n",
        )
        .unwrap();
        let err = read_table(&path).unwrap_err();
        assert!(
            matches!(err, DataError::InvalidNumber { ref column, .. } if column == "Close"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn bad_timestamp_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(
            &path,
            "Date,Open,High,Low,Close,Adj Close,Volume\n01/02/2024,1,2,0.5,1,1,10\n",
        )
        .unwrap();
        assert!(matches!(read_table(&path), Err(DataError::InvalidTimestamp(_))));
    }
}
