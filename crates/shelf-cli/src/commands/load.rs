//! `shelf load` - mirror snapshots into the document collections.

use anyhow::Result;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use shelf_store::{DocumentStore, MirrorCounts, SnapshotStore};

use crate::config::ShelfConfig;

pub async fn execute(config: &ShelfConfig) -> Result<Vec<(String, MirrorCounts)>> {
    let snapshots = SnapshotStore::new(config.snapshots_dir());
    let documents = DocumentStore::new(config.documents_dir());
    let now = Utc::now();

    let mut tasks = stream::iter(config.entities.iter().map(|entity| {
        let snapshots = snapshots.clone();
        let documents = documents.clone();
        async move {
            let Some(records) = snapshots.load(&entity.name)? else {
                warn!(entity = %entity.name, "no snapshot yet, collection not mirrored");
                return Ok::<_, anyhow::Error>(None);
            };
            let counts = documents.sync_collection(&entity.name, &records, now)?;
            Ok(Some((entity.name.clone(), counts)))
        }
    }))
    .buffer_unordered(config.parallelism);

    let mut mirrored = Vec::new();
    while let Some(result) = tasks.next().await {
        if let Some(entry) = result? {
            mirrored.push(entry);
        }
    }
    drop(tasks);

    mirrored.sort_by_key(|(name, _)| {
        config.entities.iter().position(|e| &e.name == name)
    });
    info!(collections = mirrored.len(), "document collections mirrored");
    Ok(mirrored)
}
