//! `shelf sync` - reconcile source rows into the local snapshots.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use futures::stream::{self, StreamExt};
use tracing::info;

use shelf_core::{diff_and_merge, EntityReport, RunReport};
use shelf_store::{RecordSource, SnapshotStore};

use crate::config::{EntityConfig, ShelfConfig};

#[derive(Args, Default)]
pub struct SyncArgs {
    /// Sync a single entity type instead of all of them
    #[arg(long)]
    pub entity: Option<String>,
}

pub async fn execute(config: &ShelfConfig, args: &SyncArgs) -> Result<RunReport> {
    let source = config.source.connect();
    let snapshots = SnapshotStore::new(config.snapshots_dir());

    let entities: Vec<&EntityConfig> = match &args.entity {
        Some(name) => vec![config.entity(name)?],
        None => config.entities.iter().collect(),
    };

    // Entity types touch disjoint snapshot files, so they fan out into a
    // bounded pool.
    let mut tasks = stream::iter(entities.iter().map(|entity| {
        let source = Arc::clone(&source);
        let snapshots = snapshots.clone();
        async move { sync_entity(source.as_ref(), &snapshots, entity).await }
    }))
    .buffer_unordered(config.parallelism);

    let mut report = RunReport::default();
    while let Some(entity_report) = tasks.next().await {
        report.push(entity_report?);
    }
    drop(tasks);

    // Completion order is arbitrary; reports read better in config order.
    report
        .entities
        .sort_by_key(|e| entities.iter().position(|c| c.name == e.entity));
    Ok(report)
}

async fn sync_entity(
    source: &dyn RecordSource,
    snapshots: &SnapshotStore,
    entity: &EntityConfig,
) -> Result<EntityReport> {
    let fetched = source.fetch(&entity.name).await?;
    let old = snapshots.load(&entity.name)?.unwrap_or_default();

    let outcome = diff_and_merge(old, fetched.records, &entity.key_fields);
    snapshots.save(&entity.name, &outcome.snapshot)?;

    info!(
        entity = %entity.name,
        added = outcome.diff.added.len(),
        removed = outcome.diff.removed.len(),
        updated = outcome.diff.updated.len(),
        "snapshot synced"
    );

    let mut report = EntityReport::new(&entity.name);
    report.record_diff(&outcome.diff);
    report.skipped = fetched.skipped;
    Ok(report)
}
