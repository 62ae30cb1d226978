//! Neo4j schema initialization.
//!
//! One uniqueness constraint per projected label on its key property
//! (`_id`, or `name` for small enumerations without a stable id).
//! Safe to run every time — all statements use IF NOT EXISTS.

use anyhow::Result;
use neo4rs::BoltMap;
use tracing::info;

use crate::client::GraphBackend;
use crate::cypher::ident;

/// Ensure per-label uniqueness constraints.
pub async fn ensure_constraints<B: GraphBackend>(
    graph: &B,
    constraints: &[(String, String)],
) -> Result<()> {
    for (label, key_prop) in constraints {
        let label = ident(label)?;
        let key_prop = ident(key_prop)?;
        let statement = format!(
            "CREATE CONSTRAINT {}_{} IF NOT EXISTS \
             FOR (n:{label}) REQUIRE n.{key_prop} IS UNIQUE",
            label.to_lowercase(),
            key_prop.trim_start_matches('_'),
        );
        graph.execute(&statement, BoltMap::default()).await?;
    }

    info!(count = constraints.len(), "uniqueness constraints ensured");
    Ok(())
}
