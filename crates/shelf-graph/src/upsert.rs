//! Idempotent node upserts.

use anyhow::Result;
use serde_json::{Map, Value};
use tracing::{info, warn};

use shelf_core::{SkipReason, SkippedRecord};

use crate::bolt::{rows_to_bolt, single_param};
use crate::client::GraphBackend;
use crate::cypher::ident;

/// Result of one label's upsert batch.
#[derive(Debug, Default)]
pub struct UpsertOutcome {
    pub upserted: usize,
    pub skipped: Vec<SkippedRecord>,
}

/// Merge-create nodes keyed by `(label, key_prop)` and overwrite all
/// other properties from the rows. Re-running with identical rows is a
/// no-op in effect. Rows missing the key property are set aside with a
/// reason, never dropped silently.
pub async fn upsert_nodes<B: GraphBackend>(
    graph: &B,
    label: &str,
    key_prop: &str,
    rows: Vec<Map<String, Value>>,
) -> Result<UpsertOutcome> {
    let label = ident(label)?;
    let key_prop = ident(key_prop)?;

    let mut outcome = UpsertOutcome::default();
    let mut keyed_rows = Vec::with_capacity(rows.len());
    for (idx, row) in rows.into_iter().enumerate() {
        if row.get(key_prop).map_or(true, Value::is_null) {
            warn!(label, row = idx, key_prop, "row missing key property, not upserted");
            outcome
                .skipped
                .push(SkippedRecord::new(format!("{label}[{idx}]"), SkipReason::MalformedField(key_prop.to_string())));
            continue;
        }
        keyed_rows.push(row);
    }

    if keyed_rows.is_empty() {
        info!(label, "no rows to upsert");
        return Ok(outcome);
    }

    let statement = format!(
        "UNWIND $rows AS row \
         MERGE (n:{label} {{{key_prop}: row.{key_prop}}}) \
         SET n += row"
    );
    let params = single_param("rows", rows_to_bolt(&keyed_rows));
    graph.execute(&statement, params).await?;

    outcome.upserted = keyed_rows.len();
    info!(label, count = outcome.upserted, "nodes upserted");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::test_support::MockBackend;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn upserts_rows_in_one_batch() {
        let graph = MockBackend::default();
        let rows = vec![
            row(json!({"_id": "b1", "title": "Dune"})),
            row(json!({"_id": "b2", "title": "It"})),
        ];

        let outcome = upsert_nodes(&graph, "Book", "_id", rows).await.unwrap();

        assert_eq!(outcome.upserted, 2);
        assert!(outcome.skipped.is_empty());
        let recorded = graph.recorded();
        assert_eq!(recorded.len(), 1);
        assert!(recorded[0].contains("MERGE (n:Book {_id: row._id})"));
        assert!(recorded[0].contains("SET n += row"));
    }

    #[tokio::test]
    async fn rows_without_the_key_are_skipped_with_reason() {
        let graph = MockBackend::default();
        let rows = vec![
            row(json!({"name": "Horror"})),
            row(json!({"title": "keyless"})),
        ];

        let outcome = upsert_nodes(&graph, "Genre", "name", rows).await.unwrap();

        assert_eq!(outcome.upserted, 1);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(
            outcome.skipped[0].reason,
            SkipReason::MalformedField("name".to_string())
        );
    }

    #[tokio::test]
    async fn empty_batch_issues_no_statement() {
        let graph = MockBackend::default();
        let outcome = upsert_nodes(&graph, "Book", "_id", Vec::new()).await.unwrap();
        assert_eq!(outcome.upserted, 0);
        assert!(graph.recorded().is_empty());
    }
}
