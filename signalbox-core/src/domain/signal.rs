//! SignalSeries — the contractually required strategy output.
//!
//! One value per input row, aligned to the input frame's timestamps,
//! with domain {-1, 0, 1} (sell / hold / buy).

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSeries {
    timestamps: Vec<NaiveDateTime>,
    values: Vec<i8>,
}

impl SignalSeries {
    /// Construction invariant: one value per timestamp.
    pub fn new(timestamps: Vec<NaiveDateTime>, values: Vec<i8>) -> Self {
        assert_eq!(
            timestamps.len(),
            values.len(),
            "signal series must have one value per timestamp"
        );
        Self { timestamps, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn values(&self) -> &[i8] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, i8)> + '_ {
        self.timestamps
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }

    /// (buys, holds, sells) counts.
    pub fn counts(&self) -> (usize, usize, usize) {
        let buys = self.values.iter().filter(|&&v| v == 1).count();
        let sells = self.values.iter().filter(|&&v| v == -1).count();
        let holds = self.values.len() - buys - sells;
        (buys, holds, sells)
    }
}
