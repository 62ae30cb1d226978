//! `shelf project` - project document collections into the graph.
//!
//! Stage order matters: constraints, then deletion handling, then every
//! label's node upserts, then relationship derivation (endpoints must
//! already exist), then denormalized-property cleanup. The watermark
//! advances only when the whole run succeeded.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use tracing::info;

use shelf_core::SkippedRecord;
use shelf_graph::{cleanup, deletions, schema, upsert, GraphBackend, GraphClient};
use shelf_store::{DocumentStore, FetchOptions, WatermarkStore};

use crate::config::ShelfConfig;

#[derive(Args, Default)]
pub struct ProjectArgs {
    /// Clear the graph and rebuild from scratch instead of syncing
    /// incrementally
    #[arg(long)]
    pub full: bool,
}

/// Per-label outcome of the projection stage.
#[derive(Debug, Default)]
pub struct LabelSummary {
    pub label: String,
    pub upserted: usize,
    pub deleted: usize,
    pub skipped: Vec<SkippedRecord>,
}

#[derive(Debug, Default)]
pub struct ProjectionSummary {
    pub full_rebuild: bool,
    pub labels: Vec<LabelSummary>,
    /// Rule description and relationships created, in declared order.
    pub relationships: Vec<(String, i64)>,
    pub properties_removed: usize,
}

pub async fn execute(config: &ShelfConfig, args: &ProjectArgs) -> Result<ProjectionSummary> {
    let client = GraphClient::connect(&config.graph)
        .await
        .context("cannot reach the graph store")?;
    run_pipeline(config, &client, args).await
}

/// The pipeline proper, generic over the backend so it runs unchanged
/// against the real client or a scripted test double.
pub(crate) async fn run_pipeline<B: GraphBackend>(
    config: &ShelfConfig,
    graph: &B,
    args: &ProjectArgs,
) -> Result<ProjectionSummary> {
    let run_started = Utc::now();
    let documents = DocumentStore::new(config.documents_dir());
    let watermark = WatermarkStore::new(config.watermark_path());

    // A full rebuild ignores the watermark; incremental runs scope
    // fetches and deletion detection to it.
    let since = if args.full { None } else { watermark.load()? };

    let constraints: Vec<(String, String)> = config
        .projected()
        .map(|(_, p)| (p.label.clone(), p.key_prop.clone()))
        .collect();
    schema::ensure_constraints(graph, &constraints).await?;

    let mut summary = ProjectionSummary { full_rebuild: args.full, ..Default::default() };

    if args.full {
        deletions::clear_all_nodes(graph).await?;
    }

    for (entity, projection) in config.projected() {
        let mut label_summary = LabelSummary { label: projection.label.clone(), ..Default::default() };

        // On the first-ever run there is nothing to diff against, so
        // deletion sync is skipped entirely.
        if !args.full && since.is_some() {
            let live_ids = documents.ids(&entity.name)?;
            label_summary.deleted =
                deletions::sync_deletions(graph, &projection.label, &projection.key_prop, &live_ids)
                    .await?;
        }

        let options = FetchOptions {
            exclude_fields: projection.exclude_fields.clone(),
            field_map: projection.field_map.clone(),
            since,
        };
        let (rows, skipped) = documents.fetch_flattened(&entity.name, &options)?;
        let outcome =
            upsert::upsert_nodes(graph, &projection.label, &projection.key_prop, rows).await?;

        label_summary.upserted = outcome.upserted;
        label_summary.skipped = skipped;
        label_summary.skipped.extend(outcome.skipped);
        summary.labels.push(label_summary);
    }

    // All endpoint nodes exist by now; derive relationships in declared
    // order.
    for rule in &config.relationships {
        let rows = match rule.collection() {
            Some(collection) => documents.fetch_flattened(collection, &FetchOptions::default())?.0,
            None => Vec::new(),
        };
        let created = rule.derive(graph, &rows).await?;
        summary.relationships.push((rule.describe(), created));
    }

    for cleanup_config in &config.cleanup {
        summary.properties_removed += cleanup::remove_denormalized_props(
            graph,
            &cleanup_config.label,
            &cleanup_config.props,
            config.cleanup_batch_size,
        )
        .await?;
    }

    watermark.advance(run_started)?;
    info!(started = %run_started, full = args.full, "projection run completed");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use anyhow::bail;
    use async_trait::async_trait;
    use chrono::Duration;
    use neo4rs::BoltMap;
    use serde_json::json;

    use shelf_core::Record;

    use crate::config::{EntityConfig, ProjectionConfig, SourceConfig};

    /// Records every statement and fails the first one containing the
    /// configured marker.
    struct ScriptedBackend {
        fail_on: Option<&'static str>,
        statements: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new() -> Self {
            Self { fail_on: None, statements: Mutex::new(Vec::new()) }
        }

        fn failing_on(marker: &'static str) -> Self {
            Self { fail_on: Some(marker), statements: Mutex::new(Vec::new()) }
        }

        fn record(&self, cypher: &str) -> Result<()> {
            self.statements.lock().unwrap().push(cypher.to_string());
            if let Some(marker) = self.fail_on {
                if cypher.contains(marker) {
                    bail!("scripted statement failure");
                }
            }
            Ok(())
        }

        fn recorded(&self) -> Vec<String> {
            self.statements.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GraphBackend for ScriptedBackend {
        async fn execute(&self, cypher: &str, _params: BoltMap) -> Result<()> {
            self.record(cypher)
        }

        async fn execute_count(&self, cypher: &str, _params: BoltMap, _field: &str) -> Result<i64> {
            self.record(cypher)?;
            Ok(0)
        }

        async fn fetch_strings(
            &self,
            cypher: &str,
            _params: BoltMap,
            _field: &str,
        ) -> Result<Vec<String>> {
            self.record(cypher)?;
            Ok(Vec::new())
        }
    }

    fn test_config(data_dir: &std::path::Path) -> ShelfConfig {
        ShelfConfig {
            data_dir: data_dir.to_path_buf(),
            source: SourceConfig::JsonDir { path: data_dir.join("exports") },
            graph: Default::default(),
            parallelism: 1,
            cleanup_batch_size: 100,
            entities: vec![EntityConfig {
                name: "books".to_string(),
                key_fields: vec!["title".to_string()],
                projection: Some(ProjectionConfig {
                    label: "Book".to_string(),
                    key_prop: "_id".to_string(),
                    exclude_fields: vec![],
                    field_map: vec![],
                }),
            }],
            relationships: vec![],
            cleanup: vec![],
        }
    }

    fn seed_books(config: &ShelfConfig) {
        let documents = DocumentStore::new(config.documents_dir());
        documents
            .sync_collection(
                "books",
                &[Record::from_value(json!({"_id": "b1", "title": "Dune"})).unwrap()],
                Utc::now(),
            )
            .unwrap();
    }

    #[tokio::test]
    async fn failed_stage_leaves_the_watermark_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        seed_books(&config);

        let watermark = WatermarkStore::new(config.watermark_path());
        let previous = Utc::now() - Duration::hours(6);
        watermark.advance(previous).unwrap();

        let graph = ScriptedBackend::failing_on("MERGE (n:Book");
        let result = run_pipeline(&config, &graph, &ProjectArgs::default()).await;

        assert!(result.is_err());
        assert_eq!(watermark.load().unwrap(), Some(previous));
    }

    #[tokio::test]
    async fn successful_run_advances_the_watermark_to_run_start() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        seed_books(&config);
        let watermark = WatermarkStore::new(config.watermark_path());
        assert_eq!(watermark.load().unwrap(), None);

        let before = Utc::now();
        let graph = ScriptedBackend::new();
        let summary = run_pipeline(&config, &graph, &ProjectArgs::default()).await.unwrap();
        let after = Utc::now();

        assert_eq!(summary.labels.len(), 1);
        assert_eq!(summary.labels[0].upserted, 1);

        let advanced = watermark.load().unwrap().unwrap();
        assert!(advanced >= before && advanced <= after);

        let recorded = graph.recorded();
        assert!(recorded.iter().any(|s| s.contains("CREATE CONSTRAINT")));
        // No watermark before the run, so no deletion sync statements.
        assert!(!recorded.iter().any(|s| s.contains("DETACH DELETE")));
    }
}
