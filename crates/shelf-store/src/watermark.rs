//! The sync watermark.
//!
//! A single persisted timestamp marking the last fully successful
//! projection run. Read before a run to scope incremental fetches and
//! deletion detection; advanced only after every entity type completed
//! without a fatal error, so a partial failure replays the same window.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use shelf_core::ShelfResult;

use crate::write_atomic;

#[derive(Debug, Serialize, Deserialize)]
struct WatermarkFile {
    last_success_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct WatermarkStore {
    path: PathBuf,
}

impl WatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The last successful run's timestamp. `None` on the first-ever run:
    /// downstream stages treat every record as new and skip deletion sync.
    pub fn load(&self) -> ShelfResult<Option<DateTime<Utc>>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file: WatermarkFile = serde_json::from_str(&text)?;
        Ok(Some(file.last_success_at))
    }

    /// Record a fully successful run.
    pub fn advance(&self, timestamp: DateTime<Utc>) -> ShelfResult<()> {
        let file = WatermarkFile { last_success_at: timestamp };
        write_atomic(&self.path, &serde_json::to_vec_pretty(&file)?)?;
        info!(%timestamp, "watermark advanced");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
