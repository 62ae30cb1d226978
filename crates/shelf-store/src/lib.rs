//! # Shelf Store
//!
//! The durable edges of Shelfsync: fetching rows from the external
//! tabular source, reading and atomically rewriting per-entity snapshot
//! files, mirroring snapshots into document collections, and the sync
//! watermark. Each store is an explicit handle passed into callers —
//! there is no shared global connection.

pub mod documents;
pub mod snapshot;
pub mod source;
pub mod watermark;

pub use documents::{DocumentStore, FetchOptions, MirrorCounts};
pub use snapshot::SnapshotStore;
pub use source::{FetchedRows, HttpSource, JsonDirSource, RecordSource};
pub use watermark::WatermarkStore;

use std::fs;
use std::io::Write;
use std::path::Path;

use shelf_core::ShelfResult;

/// Write a file atomically: write to a sibling temp file, then rename
/// over the target. A crash mid-write leaves the previous content
/// untouched.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> ShelfResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
