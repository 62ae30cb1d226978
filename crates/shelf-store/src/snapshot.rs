//! Durable per-entity-type snapshots.
//!
//! One JSON array file per entity type. A snapshot is read whole at the
//! start of a sync and rewritten whole (atomically) at the end; it is
//! never partially persisted.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use shelf_core::{Record, ShelfResult};

use crate::write_atomic;

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, entity: &str) -> PathBuf {
        self.dir.join(format!("{entity}.json"))
    }

    /// Load the stored snapshot for an entity type. `None` means no
    /// snapshot exists yet — the caller treats every source record as new.
    pub fn load(&self, entity: &str) -> ShelfResult<Option<Vec<Record>>> {
        let path = self.path(entity);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(entity, "no stored snapshot");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let records: Vec<Record> = serde_json::from_str(&text)?;
        info!(entity, count = records.len(), "loaded stored snapshot");
        Ok(Some(records))
    }

    /// Atomically replace the snapshot for an entity type.
    pub fn save(&self, entity: &str, records: &[Record]) -> ShelfResult<()> {
        let path = self.path(entity);
        let contents = serde_json::to_vec_pretty(records)?;
        write_atomic(&path, &contents)?;
        info!(entity, count = records.len(), "snapshot written");
        Ok(())
    }

    /// Number of records in the stored snapshot, if any.
    pub fn count(&self, entity: &str) -> ShelfResult<Option<usize>> {
        Ok(self.load(entity)?.map(|records| records.len()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
