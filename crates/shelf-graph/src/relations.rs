//! Relationship derivation.
//!
//! Relationships are never authored directly: they are regenerated from
//! the current graph state and document collections via MERGE, which
//! makes derivation idempotent without delete-then-recreate passes.
//! Missing endpoints are skipped silently — partial projections are
//! expected while collections roll out in phases.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::bolt::{rows_to_bolt, single_param};
use crate::client::GraphBackend;
use crate::cypher::ident;

/// A declarative relationship derivation rule.
///
/// Each variant carries its own typed configuration and is resolved by a
/// `match`, not a runtime lookup table of functions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationshipRule {
    /// For every source node whose array property is non-null, link each
    /// array value to the target node matched on `target_prop`.
    ArrayRef {
        rel_type: String,
        source_label: String,
        source_prop: String,
        target_label: String,
        target_prop: String,
    },
    /// For every document row, pick the relationship verb from a
    /// status-field lookup and link the two endpoint nodes by id,
    /// copying the named row fields onto the relationship.
    StatusMapped {
        collection: String,
        status_field: String,
        /// status value → relationship type.
        verbs: BTreeMap<String, String>,
        source_label: String,
        source_key: String,
        source_field: String,
        target_label: String,
        target_key: String,
        target_field: String,
        #[serde(default)]
        property_fields: Vec<String>,
    },
}

impl RelationshipRule {
    /// The document collection this rule reads rows from, if any.
    pub fn collection(&self) -> Option<&str> {
        match self {
            Self::ArrayRef { .. } => None,
            Self::StatusMapped { collection, .. } => Some(collection),
        }
    }

    /// Short description for logs and reports.
    pub fn describe(&self) -> String {
        match self {
            Self::ArrayRef { rel_type, source_label, target_label, .. } => {
                format!("({source_label})-[:{rel_type}]->({target_label})")
            }
            Self::StatusMapped { source_label, target_label, status_field, .. } => {
                format!("({source_label})-[by {status_field}]->({target_label})")
            }
        }
    }

    /// Derive this rule's relationships, returning how many were
    /// created or matched. `rows` is consulted only by row-driven
    /// variants; see [`RelationshipRule::collection`].
    pub async fn derive<B: GraphBackend>(
        &self,
        graph: &B,
        rows: &[Map<String, Value>],
    ) -> Result<i64> {
        match self {
            Self::ArrayRef { rel_type, source_label, source_prop, target_label, target_prop } => {
                derive_array_ref(graph, rel_type, source_label, source_prop, target_label, target_prop)
                    .await
            }
            Self::StatusMapped {
                status_field,
                verbs,
                source_label,
                source_key,
                source_field,
                target_label,
                target_key,
                target_field,
                property_fields,
                ..
            } => {
                derive_status_mapped(
                    graph,
                    rows,
                    status_field,
                    verbs,
                    (source_label, source_key, source_field),
                    (target_label, target_key, target_field),
                    property_fields,
                )
                .await
            }
        }
    }
}

async fn derive_array_ref<B: GraphBackend>(
    graph: &B,
    rel_type: &str,
    source_label: &str,
    source_prop: &str,
    target_label: &str,
    target_prop: &str,
) -> Result<i64> {
    let rel_type = ident(rel_type)?;
    let source_label = ident(source_label)?;
    let source_prop = ident(source_prop)?;
    let target_label = ident(target_label)?;
    let target_prop = ident(target_prop)?;

    let statement = format!(
        "MATCH (source:{source_label}) \
         WHERE source.{source_prop} IS NOT NULL \
         UNWIND source.{source_prop} AS value \
         MATCH (target:{target_label} {{{target_prop}: value}}) \
         MERGE (source)-[:{rel_type}]->(target) \
         RETURN count(*) AS created"
    );

    let created = graph
        .execute_count(&statement, Default::default(), "created")
        .await?;
    info!(rel_type, source_label, target_label, created, "relationships derived");
    Ok(created)
}

async fn derive_status_mapped<B: GraphBackend>(
    graph: &B,
    rows: &[Map<String, Value>],
    status_field: &str,
    verbs: &BTreeMap<String, String>,
    (source_label, source_key, source_field): (&str, &str, &str),
    (target_label, target_key, target_field): (&str, &str, &str),
    property_fields: &[String],
) -> Result<i64> {
    let source_label = ident(source_label)?;
    let source_key = ident(source_key)?;
    let target_label = ident(target_label)?;
    let target_key = ident(target_key)?;

    // Group rows by their mapped verb; rows with an unknown status or a
    // missing endpoint id are best-effort skipped.
    let mut grouped: BTreeMap<&str, Vec<Map<String, Value>>> = BTreeMap::new();
    for row in rows {
        let verb = row
            .get(status_field)
            .and_then(Value::as_str)
            .and_then(|status| verbs.get(status));
        let (Some(verb), Some(source_id), Some(target_id)) =
            (verb, row.get(source_field), row.get(target_field))
        else {
            debug!(status_field, "row without verb or endpoint ids skipped");
            continue;
        };
        if source_id.is_null() || target_id.is_null() {
            continue;
        }

        let mut props = Map::new();
        for field in property_fields {
            if let Some(value) = row.get(field) {
                props.insert(field.clone(), value.clone());
            }
        }

        let mut param_row = Map::new();
        param_row.insert("source_id".to_string(), source_id.clone());
        param_row.insert("target_id".to_string(), target_id.clone());
        param_row.insert("props".to_string(), Value::Object(props));
        grouped.entry(verb.as_str()).or_default().push(param_row);
    }

    let mut total = 0;
    for (verb, verb_rows) in grouped {
        let verb = ident(verb)?;
        let statement = format!(
            "UNWIND $rows AS row \
             MATCH (source:{source_label} {{{source_key}: row.source_id}}) \
             MATCH (target:{target_label} {{{target_key}: row.target_id}}) \
             MERGE (source)-[rel:{verb}]->(target) \
             SET rel += row.props \
             RETURN count(*) AS created"
        );
        let params = single_param("rows", rows_to_bolt(&verb_rows));
        total += graph.execute_count(&statement, params, "created").await?;
    }

    info!(source_label, target_label, created = total, "status-mapped relationships derived");
    Ok(total)
}
