//! Deletion propagation.
//!
//! The graph never learns about removals from upserts, so each run
//! compares the ids present under a label against the document store's
//! current id set and detach-deletes the difference. Only identifiers
//! travel; full records are never needed here.

use std::collections::HashSet;

use anyhow::Result;
use neo4rs::{BoltList, BoltString, BoltType};
use tracing::info;

use crate::bolt::single_param;
use crate::client::GraphBackend;
use crate::cypher::ident;

/// Detach-delete every node of `label` whose key is absent from
/// `live_ids`. Returns the number of nodes deleted.
pub async fn sync_deletions<B: GraphBackend>(
    graph: &B,
    label: &str,
    key_prop: &str,
    live_ids: &HashSet<String>,
) -> Result<usize> {
    let label = ident(label)?;
    let key_prop = ident(key_prop)?;

    let fetch = format!("MATCH (n:{label}) RETURN n.{key_prop} AS id");
    let graph_ids = graph.fetch_strings(&fetch, Default::default(), "id").await?;

    let stale: Vec<String> = graph_ids
        .into_iter()
        .filter(|id| !live_ids.contains(id))
        .collect();
    if stale.is_empty() {
        info!(label, "no stale nodes");
        return Ok(0);
    }

    let mut id_list = BoltList::default();
    for id in &stale {
        id_list.push(BoltType::String(BoltString::new(id)));
    }
    let statement = format!(
        "MATCH (n:{label}) \
         WHERE n.{key_prop} IN $stale \
         DETACH DELETE n \
         RETURN count(n) AS deleted"
    );
    let deleted = graph
        .execute_count(&statement, single_param("stale", BoltType::List(id_list)), "deleted")
        .await?;

    info!(label, deleted, "stale nodes detach-deleted");
    Ok(deleted as usize)
}

/// Wipe the whole graph for a from-scratch rebuild. Mutually exclusive
/// with incremental deletion sync within a single run.
pub async fn clear_all_nodes<B: GraphBackend>(graph: &B) -> Result<()> {
    graph.execute("MATCH (n) DETACH DELETE n", Default::default()).await?;
    info!("graph cleared");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockBackend;

    #[tokio::test]
    async fn deletes_exactly_the_vanished_ids() {
        let graph = MockBackend::default();
        graph.queue_column(vec!["u1".to_string(), "u2".to_string(), "u3".to_string()]);
        graph.queue_counts([1]);

        let live: HashSet<String> = ["u2", "u3"].iter().map(|s| s.to_string()).collect();
        let deleted = sync_deletions(&graph, "User", "_id", &live).await.unwrap();

        assert_eq!(deleted, 1);
        let recorded = graph.recorded();
        assert_eq!(recorded.len(), 2);
        assert!(recorded[0].contains("MATCH (n:User) RETURN n._id AS id"));
        assert!(recorded[1].contains("WHERE n._id IN $stale"));
        assert!(recorded[1].contains("DETACH DELETE n"));
    }

    #[tokio::test]
    async fn no_stale_ids_means_no_delete_statement() {
        let graph = MockBackend::default();
        graph.queue_column(vec!["b1".to_string()]);

        let live: HashSet<String> = ["b1".to_string()].into_iter().collect();
        let deleted = sync_deletions(&graph, "Book", "_id", &live).await.unwrap();

        assert_eq!(deleted, 0);
        assert_eq!(graph.recorded().len(), 1);
    }

    #[tokio::test]
    async fn clear_wipes_everything() {
        let graph = MockBackend::default();
        clear_all_nodes(&graph).await.unwrap();
        assert_eq!(graph.recorded(), vec!["MATCH (n) DETACH DELETE n".to_string()]);
    }
}
