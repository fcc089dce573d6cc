//! Series — an ordered sequence of per-row f64 values.
//!
//! NaN marks an undefined value (e.g. rolling-window warmup rows).
//! Rolling helpers follow the indicator convention: the first valid
//! value appears at index `window - 1`, and a NaN anywhere in the
//! window poisons that window's output.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    values: Vec<f64>,
}

impl Series {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// A series of `len` copies of `value`.
    pub fn constant(len: usize, value: f64) -> Self {
        Self {
            values: vec![value; len],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    pub(crate) fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Elementwise map.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Series {
        Series::new(self.values.iter().map(|&v| f(v)).collect())
    }

    /// Shift values forward (`n > 0`) or backward (`n < 0`), filling the
    /// vacated rows with NaN.
    pub fn shift(&self, n: i64) -> Series {
        let len = self.values.len();
        let mut out = vec![f64::NAN; len];
        for (i, slot) in out.iter_mut().enumerate() {
            let src = i as i64 - n;
            if src >= 0 && (src as usize) < len {
                *slot = self.values[src as usize];
            }
        }
        Series::new(out)
    }

    pub fn rolling_sum(&self, window: usize) -> Series {
        self.rolling(window, |w| w.iter().sum())
    }

    pub fn rolling_mean(&self, window: usize) -> Series {
        self.rolling(window, |w| w.iter().sum::<f64>() / w.len() as f64)
    }

    pub fn rolling_min(&self, window: usize) -> Series {
        self.rolling(window, |w| w.iter().copied().fold(f64::INFINITY, f64::min))
    }

    pub fn rolling_max(&self, window: usize) -> Series {
        self.rolling(window, |w| {
            w.iter().copied().fold(f64::NEG_INFINITY, f64::max)
        })
    }

    fn rolling(&self, window: usize, f: impl Fn(&[f64]) -> f64) -> Series {
        let n = self.values.len();
        let mut out = vec![f64::NAN; n];
        if window == 0 || window > n {
            return Series::new(out);
        }
        for i in (window - 1)..n {
            let w = &self.values[(i + 1 - window)..=i];
            if w.iter().any(|v| v.is_nan()) {
                continue;
            }
            out[i] = f(w);
        }
        Series::new(out)
    }

    /// Mean of the defined values; NaN on an all-NaN or empty series.
    pub fn mean(&self) -> f64 {
        let mut sum = 0.0;
        let mut count = 0usize;
        for &v in &self.values {
            if !v.is_nan() {
                sum += v;
                count += 1;
            }
        }
        if count == 0 {
            f64::NAN
        } else {
            sum / count as f64
        }
    }

    /// Sum of the defined values; 0.0 on an empty series.
    pub fn sum(&self) -> f64 {
        self.values.iter().filter(|v| !v.is_nan()).sum()
    }

    /// Minimum of the defined values; NaN when none are defined.
    pub fn min(&self) -> f64 {
        self.values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(f64::NAN, |acc, v| if acc.is_nan() { v } else { acc.min(v) })
    }

    /// Maximum of the defined values; NaN when none are defined.
    pub fn max(&self) -> f64 {
        self.values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(f64::NAN, |acc, v| if acc.is_nan() { v } else { acc.max(v) })
    }
}
