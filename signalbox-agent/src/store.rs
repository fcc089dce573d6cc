//! Strategy persistence — accepted scripts as JSON files on disk.
//!
//! Files are named by strategy id hash, so saving the same script
//! against the same dataset twice is a cheap overwrite, not a
//! duplicate.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use signalbox_core::fingerprint::StrategyId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode strategy record: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no strategy with id {id}")]
    NotFound { id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyRecord {
    pub id: StrategyId,
    pub name: String,
    pub description: String,
    pub code: String,
    pub created_at: NaiveDateTime,
    /// (buys, holds, sells) from the accepting run.
    pub signal_counts: (usize, usize, usize),
}

/// Directory-backed store, one JSON file per strategy.
#[derive(Debug)]
pub struct StrategyStore {
    root: PathBuf,
}

impl StrategyStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, id: &StrategyId) -> PathBuf {
        self.root.join(format!("{}.json", id.hash()))
    }

    pub fn save(&self, record: &StrategyRecord) -> Result<PathBuf, StoreError> {
        let path = self.path_for(&record.id);
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&path, json)?;
        debug!(path = %path.display(), "saved strategy");
        Ok(path)
    }

    pub fn load(&self, id: &StrategyId) -> Result<StrategyRecord, StoreError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(StoreError::NotFound { id: id.hash() });
        }
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }

    /// Every record in the store, newest first. Unreadable files are
    /// skipped rather than failing the whole listing.
    pub fn list(&self) -> Result<Vec<StrategyRecord>, StoreError> {
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            match fs::read_to_string(&path)
                .map_err(StoreError::from)
                .and_then(|raw| Ok(serde_json::from_str(&raw)?))
            {
                Ok(record) => records.push(record),
                Err(e) => debug!(path = %path.display(), error = %e, "skipping bad record"),
            }
        }
        records.sort_by(|a: &StrategyRecord, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
