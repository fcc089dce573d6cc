//! Deterministic identity for scripts and datasets.
//!
//! - `ScriptHash`: content hash of a strategy script, whitespace-normalized
//!   so formatting churn does not produce a new identity.
//! - `DatasetHash`: content hash of a frame's index and columns.
//! - `StrategyId`: script + dataset, the unit the strategy store keys on.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::Frame;

/// BLAKE3 hex digest of a normalized script.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScriptHash(pub String);

impl ScriptHash {
    /// Hash the script with trailing whitespace and blank lines stripped,
    /// so two sources that differ only in formatting share an identity.
    pub fn from_source(source: &str) -> Self {
        let normalized: Vec<&str> = source
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .collect();
        let digest = blake3::hash(normalized.join("\n").as_bytes());
        Self(digest.to_hex().to_string())
    }
}

impl fmt::Display for ScriptHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// BLAKE3 hex digest of a frame's contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

impl DatasetHash {
    /// Streams the index and every column (names sorted by the frame's
    /// own ordering) through one hasher. Byte-level f64 encoding keeps
    /// the digest exact; NaN rows hash like any other value.
    pub fn from_frame(frame: &Frame) -> Self {
        let mut hasher = blake3::Hasher::new();
        for ts in frame.index() {
            hasher.update(ts.and_utc().timestamp().to_le_bytes().as_ref());
        }
        for name in frame.column_names() {
            hasher.update(name.as_bytes());
            if let Some(series) = frame.column(name) {
                for &v in series.values() {
                    hasher.update(&v.to_le_bytes());
                }
            }
        }
        Self(hasher.finalize().to_hex().to_string())
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the strategy store keys on: one script evaluated against one
/// dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StrategyId {
    pub script_hash: ScriptHash,
    pub dataset_hash: DatasetHash,
}

impl StrategyId {
    pub fn new(script_hash: ScriptHash, dataset_hash: DatasetHash) -> Self {
        Self {
            script_hash,
            dataset_hash,
        }
    }

    /// Combined digest, canonical JSON in, BLAKE3 hex out.
    pub fn hash(&self) -> String {
        use serde_json::json;

        let canonical = json!({
            "dataset_hash": &self.dataset_hash.0,
            "script_hash": &self.script_hash.0,
        });
        blake3::hash(canonical.to_string().as_bytes())
            .to_hex()
            .to_string()
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.script_hash, self.dataset_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use chrono::NaiveDate;

    fn frame(closes: &[f64]) -> Frame {
        let bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                timestamp: NaiveDate::from_ymd_opt(2023, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
                    + chrono::Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000.0,
            })
            .collect();
        Frame::from_bars(&bars)
    }

    #[test]
    fn script_hash_ignores_formatting_noise() {
        let a = ScriptHash::from_source("x = 1\ny = 2");
        let b = ScriptHash::from_source("x = 1   \n\n\ny = 2\n");
        assert_eq!(a, b);
    }

    #[test]
    fn script_hash_sees_real_changes() {
        let a = ScriptHash::from_source("x = 1");
        let b = ScriptHash::from_source("x = 2");
        assert_ne!(a, b);
    }

    #[test]
    fn dataset_hash_is_deterministic() {
        let f = frame(&[100.0, 101.0]);
        assert_eq!(DatasetHash::from_frame(&f), DatasetHash::from_frame(&f));
    }

    #[test]
    fn dataset_hash_sees_value_changes() {
        let a = DatasetHash::from_frame(&frame(&[100.0, 101.0]));
        let b = DatasetHash::from_frame(&frame(&[100.0, 102.0]));
        assert_ne!(a, b);
    }

    #[test]
    fn strategy_id_combines_both_halves() {
        let f = frame(&[100.0]);
        let id1 = StrategyId::new(
            ScriptHash::from_source("signals = series(0, df)"),
            DatasetHash::from_frame(&f),
        );
        let id2 = StrategyId::new(
            ScriptHash::from_source("signals = series(1, df)"),
            DatasetHash::from_frame(&f),
        );
        assert_ne!(id1.hash(), id2.hash());
        assert_eq!(id1.hash(), id1.hash());
    }

    #[test]
    fn strategy_id_serialization_roundtrip() {
        let id = StrategyId::new(
            ScriptHash::from_source("x = 1"),
            DatasetHash::from_frame(&frame(&[100.0])),
        );
        let json = serde_json::to_string(&id).unwrap();
        let back: StrategyId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
