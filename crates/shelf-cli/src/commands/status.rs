//! `shelf status` - show watermark, store, and graph counts.

use anyhow::Result;
use colored::Colorize;
use tracing::warn;

use shelf_graph::GraphClient;
use shelf_store::{DocumentStore, SnapshotStore, WatermarkStore};

use crate::config::ShelfConfig;

pub async fn execute(config: &ShelfConfig) -> Result<()> {
    let snapshots = SnapshotStore::new(config.snapshots_dir());
    let documents = DocumentStore::new(config.documents_dir());
    let watermark = WatermarkStore::new(config.watermark_path());

    match watermark.load()? {
        Some(last) => println!("{}: {}", "Last successful projection".bold(), last.to_rfc3339()),
        None => println!("{}: {}", "Last successful projection".bold(), "never".dimmed()),
    }
    println!();

    println!("{:<20} {:>10} {:>10}", "Entity".bold(), "Snapshot".bold(), "Documents".bold());
    println!("{}", "-".repeat(42));
    for entity in &config.entities {
        let snapshot_count = match snapshots.count(&entity.name)? {
            Some(count) => count.to_string(),
            None => "-".to_string(),
        };
        let document_count = documents.load(&entity.name)?.len();
        println!("{:<20} {:>10} {:>10}", entity.name, snapshot_count, document_count);
    }
    println!();

    match GraphClient::connect(&config.graph).await {
        Ok(client) => {
            let counts = client.counts().await?;
            println!(
                "{}: {} nodes, {} relationships",
                "Graph".bold(),
                counts.nodes.to_string().cyan(),
                counts.relationships.to_string().cyan()
            );
        }
        Err(e) => {
            warn!(error = %e, "graph store unreachable");
            println!("{}: {}", "Graph".bold(), "unreachable".red());
        }
    }

    Ok(())
}
