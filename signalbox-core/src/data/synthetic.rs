//! Seeded synthetic price series.
//!
//! A geometric random walk with intrabar ranges, good enough to
//! exercise strategies and benches without shipping fixture files. The
//! same seed always yields the same frame.

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::{Bar, Frame};

/// Daily bars starting 2023-01-01, prices strictly positive.
pub fn random_walk(seed: u64, rows: usize, start_price: f64) -> Frame {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = NaiveDate::from_ymd_opt(2023, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();

    let mut close = start_price;
    let mut bars = Vec::with_capacity(rows);
    for i in 0..rows {
        let open = close;
        let drift: f64 = rng.gen_range(-0.02..0.02);
        close = (open * (1.0 + drift)).max(0.01);
        let span = open.max(close) * rng.gen_range(0.0..0.01);
        let high = open.max(close) + span;
        let low = (open.min(close) - span).max(0.01);
        let volume = rng.gen_range(500.0..5000.0_f64).round();
        bars.push(Bar {
            timestamp: start + Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume,
        });
    }
    Frame::from_bars(&bars)
}
