//! CSV-backed market data catalog.
//!
//! One file holds every instrument: each row carries a timestamp, a
//! token (instrument name), a timeframe label, and OHLCV fields. The
//! store groups rows by (token, timeframe) at load time and hands out
//! sorted [`Frame`]s on demand.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{Bar, Frame, FrameError};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read data file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse data file: {0}")]
    Csv(#[from] csv::Error),

    #[error("unparseable timestamp '{raw}' at row {row}")]
    BadTimestamp { row: usize, raw: String },

    #[error("no data for token '{token}' at timeframe '{timeframe}'")]
    UnknownSeries { token: String, timeframe: String },

    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// One CSV row. Column names follow the source file.
#[derive(Debug, Deserialize)]
struct RawRow {
    dt: String,
    token: String,
    time_frame: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Dates without a time component load as midnight.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(ts);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// In-memory catalog keyed by (token, timeframe).
#[derive(Debug, Default)]
pub struct MarketData {
    series: BTreeMap<(String, String), Vec<Bar>>,
}

impl MarketData {
    pub fn load_csv(path: &Path) -> Result<Self, DataError> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut series: BTreeMap<(String, String), Vec<Bar>> = BTreeMap::new();
        for (i, row) in reader.deserialize().enumerate() {
            let row: RawRow = row?;
            let timestamp =
                parse_timestamp(&row.dt).ok_or_else(|| DataError::BadTimestamp {
                    row: i + 1,
                    raw: row.dt.clone(),
                })?;
            series
                .entry((row.token, row.time_frame))
                .or_default()
                .push(Bar {
                    timestamp,
                    open: row.open,
                    high: row.high,
                    low: row.low,
                    close: row.close,
                    volume: row.volume,
                });
        }
        // Source files are not guaranteed to be ordered.
        for bars in series.values_mut() {
            bars.sort_by_key(|bar| bar.timestamp);
        }
        Ok(Self { series })
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Distinct tokens, sorted.
    pub fn tokens(&self) -> Vec<String> {
        let mut out: Vec<String> = self.series.keys().map(|(t, _)| t.clone()).collect();
        out.dedup();
        out
    }

    /// Timeframes available for one token, sorted.
    pub fn timeframes(&self, token: &str) -> Vec<String> {
        self.series
            .keys()
            .filter(|(t, _)| t == token)
            .map(|(_, tf)| tf.clone())
            .collect()
    }

    /// Build the frame for one (token, timeframe) pair.
    pub fn frame(&self, token: &str, timeframe: &str) -> Result<Frame, DataError> {
        let key = (token.to_string(), timeframe.to_string());
        let bars = self
            .series
            .get(&key)
            .ok_or_else(|| DataError::UnknownSeries {
                token: token.to_string(),
                timeframe: timeframe.to_string(),
            })?;
        Ok(Frame::from_bars(bars))
    }
}
