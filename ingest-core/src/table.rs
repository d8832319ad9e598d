//! Price series table — time-indexed OHLCV rows.
//!
//! Every value cell is an `Option<f64>`; `None` marks a missing cell. Tables are
//! treated as immutable values: every transformation returns a new table.

use chrono::{NaiveDateTime, NaiveTime};

/// One of the six value columns, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Open,
    High,
    Low,
    Close,
    AdjClose,
    Volume,
}

impl Column {
    pub const ALL: [Column; 6] = [
        Column::Open,
        Column::High,
        Column::Low,
        Column::Close,
        Column::AdjClose,
        Column::Volume,
    ];

    /// Header label used in CSV files.
    pub fn label(self) -> &'static str {
        match self {
            Column::Open => "Open",
            Column::High => "High",
            Column::Low => "Low",
            Column::Close => "Close",
            Column::AdjClose => "Adj Close",
            Column::Volume => "Volume",
        }
    }
}

/// A single OHLCV row keyed by a timezone-naive timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub timestamp: NaiveDateTime,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub adj_close: Option<f64>,
    pub volume: Option<f64>,
}

impl PriceRow {
    /// Row with every value cell missing.
    pub fn empty(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            open: None,
            high: None,
            low: None,
            close: None,
            adj_close: None,
            volume: None,
        }
    }

    pub fn get(&self, column: Column) -> Option<f64> {
        match column {
            Column::Open => self.open,
            Column::High => self.high,
            Column::Low => self.low,
            Column::Close => self.close,
            Column::AdjClose => self.adj_close,
            Column::Volume => self.volume,
        }
    }

    /// Set a cell. NaN is stored as missing.
    pub fn set(&mut self, column: Column, value: Option<f64>) {
        let value = value.filter(|v| !v.is_nan());
        match column {
            Column::Open => self.open = value,
            Column::High => self.high = value,
            Column::Low => self.low = value,
            Column::Close => self.close = value,
            Column::AdjClose => self.adj_close = value,
            Column::Volume => self.volume = value,
        }
    }

    /// Builder-style setter, handy when assembling rows by hand.
    pub fn with(mut self, column: Column, value: f64) -> Self {
        self.set(column, Some(value));
        self
    }

    /// True if any value cell is missing.
    pub fn has_missing(&self) -> bool {
        Column::ALL.iter().any(|&c| self.get(c).is_none())
    }

    /// Identity key for exact-duplicate detection (timestamp plus all cells).
    pub(crate) fn key(&self) -> (NaiveDateTime, [Option<u64>; 6]) {
        let mut cells = [None; 6];
        for (slot, &column) in cells.iter_mut().zip(Column::ALL.iter()) {
            // +0.0 and -0.0 compare equal as values, so fold them together
            *slot = self.get(column).map(|v| (v + 0.0).to_bits());
        }
        (self.timestamp, cells)
    }

    fn normalized(mut self) -> Self {
        for column in Column::ALL {
            let value = self.get(column);
            self.set(column, value);
        }
        self
    }
}

/// Time-indexed table of OHLCV rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    rows: Vec<PriceRow>,
}

impl PriceTable {
    /// Build a table from rows, keeping their order. NaN cells become missing.
    pub fn new(rows: Vec<PriceRow>) -> Self {
        Self {
            rows: rows.into_iter().map(PriceRow::normalized).collect(),
        }
    }

    pub fn rows(&self) -> &[PriceRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<PriceRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.rows.iter().map(|r| r.timestamp).collect()
    }

    /// All cells of one column, top to bottom.
    pub fn column(&self, column: Column) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.get(column)).collect()
    }

    /// Total number of missing cells across the table.
    pub fn missing_count(&self) -> usize {
        self.rows
            .iter()
            .map(|r| Column::ALL.iter().filter(|&&c| r.get(c).is_none()).count())
            .sum()
    }

    /// True when every timestamp sits at midnight, i.e. the index is a plain date.
    pub fn is_daily(&self) -> bool {
        self.rows.iter().all(|r| r.timestamp.time() == NaiveTime::MIN)
    }

    /// New table without the rows that have any missing cell.
    pub fn drop_incomplete(&self) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .filter(|r| !r.has_missing())
                .cloned()
                .collect(),
        }
    }
}

impl FromIterator<PriceRow> for PriceTable {
    fn from_iter<I: IntoIterator<Item = PriceRow>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
