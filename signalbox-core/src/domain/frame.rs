//! Frame — the time-indexed column table seeded into strategy scripts.
//!
//! A frame owns a timestamp index plus named columns of equal length.
//! Scripts receive a scope-local copy under the `df` binding and may add
//! derived columns to that copy; the caller's frame is never touched.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use thiserror::Error;

use super::bar::Bar;
use super::series::Series;

/// Columns every input frame must carry.
pub const REQUIRED_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("column '{column}' has {found} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("missing required column '{name}'")]
    MissingColumn { name: &'static str },
}

/// Time-indexed column table.
///
/// Columns are kept in a `BTreeMap` so iteration order is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    index: Vec<NaiveDateTime>,
    columns: BTreeMap<String, Series>,
}

impl Frame {
    /// Build a frame from an index and named columns, checking that every
    /// column matches the index length and all required columns are present.
    pub fn new(
        index: Vec<NaiveDateTime>,
        columns: BTreeMap<String, Series>,
    ) -> Result<Self, FrameError> {
        let expected = index.len();
        for (name, series) in &columns {
            if series.len() != expected {
                return Err(FrameError::LengthMismatch {
                    column: name.clone(),
                    expected,
                    found: series.len(),
                });
            }
        }
        for name in REQUIRED_COLUMNS {
            if !columns.contains_key(name) {
                return Err(FrameError::MissingColumn { name });
            }
        }
        Ok(Self { index, columns })
    }

    /// Build a frame from OHLCV bars.
    pub fn from_bars(bars: &[Bar]) -> Self {
        let index = bars.iter().map(|b| b.timestamp).collect();
        let mut columns = BTreeMap::new();
        columns.insert(
            "open".to_string(),
            Series::new(bars.iter().map(|b| b.open).collect()),
        );
        columns.insert(
            "high".to_string(),
            Series::new(bars.iter().map(|b| b.high).collect()),
        );
        columns.insert(
            "low".to_string(),
            Series::new(bars.iter().map(|b| b.low).collect()),
        );
        columns.insert(
            "close".to_string(),
            Series::new(bars.iter().map(|b| b.close).collect()),
        );
        columns.insert(
            "volume".to_string(),
            Series::new(bars.iter().map(|b| b.volume).collect()),
        );
        Self { index, columns }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn column(&self, name: &str) -> Option<&Series> {
        self.columns.get(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Insert or replace a column. The series must match the row count.
    pub fn set_column(&mut self, name: &str, series: Series) -> Result<(), FrameError> {
        if series.len() != self.index.len() {
            return Err(FrameError::LengthMismatch {
                column: name.to_string(),
                expected: self.index.len(),
                found: series.len(),
            });
        }
        self.columns.insert(name.to_string(), series);
        Ok(())
    }
}
