//! Table cleaning: dedupe, chronological sort, forward/backward fill.
//!
//! Order matters. Sorting happens before filling so values propagate along the
//! timeline rather than along input order.

use crate::table::{Column, PriceRow, PriceTable};
use std::collections::HashSet;
use tracing::warn;

/// Clean a table and return the result as a new table.
///
/// 1. Drop exact-duplicate rows (timestamp and every cell), keeping the first.
/// 2. Stable sort by timestamp, ascending.
/// 3. Forward-fill each column.
/// 4. Backward-fill each column (covers gaps at the start of the series).
///
/// Filling can turn two rows into exact copies of each other, so those are
/// dropped afterwards. That keeps `clean(clean(t)) == clean(t)`.
pub fn clean(table: &PriceTable) -> PriceTable {
    let deduped = dedup_rows(table);
    let sorted = sort_by_timestamp(&deduped);
    let filled = backward_fill(&forward_fill(&sorted));
    let cleaned = dedup_rows(&filled);

    let collisions = duplicate_timestamps(&cleaned);
    if collisions > 0 {
        warn!(
            collisions = collisions,
            "cleaned table still has rows sharing a timestamp with different values"
        );
    }

    cleaned
}

/// Remove rows that exactly match an earlier row, including the timestamp.
pub fn dedup_rows(table: &PriceTable) -> PriceTable {
    let mut seen = HashSet::with_capacity(table.len());
    table
        .rows()
        .iter()
        .filter(|row| seen.insert(row.key()))
        .cloned()
        .collect()
}

/// Stable sort by timestamp; rows with equal timestamps keep their relative order.
pub fn sort_by_timestamp(table: &PriceTable) -> PriceTable {
    let mut rows = table.rows().to_vec();
    rows.sort_by_key(|r| r.timestamp);
    PriceTable::new(rows)
}

/// Replace each missing cell with the last non-missing value above it.
pub fn forward_fill(table: &PriceTable) -> PriceTable {
    let mut rows = table.rows().to_vec();
    for column in Column::ALL {
        fill_column(rows.iter_mut(), column);
    }
    PriceTable::new(rows)
}

/// Replace each missing cell with the next non-missing value below it.
pub fn backward_fill(table: &PriceTable) -> PriceTable {
    let mut rows = table.rows().to_vec();
    for column in Column::ALL {
        fill_column(rows.iter_mut().rev(), column);
    }
    PriceTable::new(rows)
}

/// Carry the last seen value of `column` over missing cells, in iteration order.
fn fill_column<'a>(rows: impl Iterator<Item = &'a mut PriceRow>, column: Column) {
    let mut last = None;
    for row in rows {
        match row.get(column) {
            Some(v) => last = Some(v),
            None => row.set(column, last),
        }
    }
}

/// Number of rows whose timestamp equals the previous row's. Expects sorted input.
fn duplicate_timestamps(table: &PriceTable) -> usize {
    table
        .rows()
        .windows(2)
        .filter(|w| w[0].timestamp == w[1].timestamp)
        .count()
}
