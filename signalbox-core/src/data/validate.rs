//! Frame quality checks.
//!
//! The frame type guarantees the required columns exist with equal
//! lengths; this pass looks at the values. Issues are collected rather
//! than failing on the first one, so a report covers the whole file.

use crate::domain::Frame;

#[derive(Debug, Clone, PartialEq)]
pub enum Issue {
    /// High below low, or open/close outside the high-low band.
    BadOhlc { row: usize },
    /// Negative traded volume.
    NegativeVolume { row: usize },
    /// NaN in any price or volume field.
    MissingValue { row: usize, column: String },
    /// Timestamp not strictly after its predecessor.
    NonMonotonicIndex { row: usize },
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub rows: usize,
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

pub fn validate_frame(frame: &Frame) -> ValidationReport {
    let mut report = ValidationReport {
        rows: frame.len(),
        ..Default::default()
    };

    for (row, window) in frame.index().windows(2).enumerate() {
        if window[1] <= window[0] {
            report.issues.push(Issue::NonMonotonicIndex { row: row + 1 });
        }
    }

    // Required columns always exist on a constructed frame.
    let fields: Vec<(&str, &[f64])> = ["open", "high", "low", "close", "volume"]
        .iter()
        .filter_map(|&name| frame.column(name).map(|s| (name, s.values())))
        .collect();
    for row in 0..frame.len() {
        for (name, values) in &fields {
            if values[row].is_nan() {
                report.issues.push(Issue::MissingValue {
                    row,
                    column: (*name).to_string(),
                });
            }
        }
    }

    let get = |name: &str| frame.column(name).map(|s| s.values());
    if let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = (
        get("open"),
        get("high"),
        get("low"),
        get("close"),
        get("volume"),
    ) {
        for row in 0..frame.len() {
            let (o, h, l, c, v) = (open[row], high[row], low[row], close[row], volume[row]);
            if [o, h, l, c, v].iter().any(|x| x.is_nan()) {
                continue; // already reported as MissingValue
            }
            if h < l || o > h || o < l || c > h || c < l {
                report.issues.push(Issue::BadOhlc { row });
            }
            if v < 0.0 {
                report.issues.push(Issue::NegativeVolume { row });
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use chrono::NaiveDate;

    fn bar(day: u32, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Bar {
        Bar {
            timestamp: NaiveDate::from_ymd_opt(2023, 1, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            open,
            high,
            low,
            close,
            volume,
        }
    }

    #[test]
    fn clean_frame_passes() {
        let frame = Frame::from_bars(&[
            bar(1, 100.0, 102.0, 99.0, 101.0, 1000.0),
            bar(2, 101.0, 103.0, 100.0, 102.0, 1100.0),
        ]);
        let report = validate_frame(&frame);
        assert!(report.is_clean());
        assert_eq!(report.rows, 2);
    }

    #[test]
    fn inverted_high_low_is_flagged() {
        let frame = Frame::from_bars(&[bar(1, 100.0, 99.0, 102.0, 100.0, 1000.0)]);
        let report = validate_frame(&frame);
        assert!(report.issues.contains(&Issue::BadOhlc { row: 0 }));
    }

    #[test]
    fn negative_volume_is_flagged() {
        let frame = Frame::from_bars(&[bar(1, 100.0, 102.0, 99.0, 101.0, -5.0)]);
        let report = validate_frame(&frame);
        assert!(report.issues.contains(&Issue::NegativeVolume { row: 0 }));
    }

    #[test]
    fn nan_close_is_flagged_once_per_field() {
        let frame = Frame::from_bars(&[bar(1, 100.0, 102.0, 99.0, f64::NAN, 1000.0)]);
        let report = validate_frame(&frame);
        assert_eq!(
            report.issues,
            vec![Issue::MissingValue {
                row: 0,
                column: "close".to_string()
            }]
        );
    }

    #[test]
    fn duplicate_timestamp_is_flagged() {
        let frame = Frame::from_bars(&[
            bar(1, 100.0, 102.0, 99.0, 101.0, 1000.0),
            bar(1, 100.0, 102.0, 99.0, 101.0, 1000.0),
        ]);
        let report = validate_frame(&frame);
        assert!(report
            .issues
            .contains(&Issue::NonMonotonicIndex { row: 1 }));
    }
}
