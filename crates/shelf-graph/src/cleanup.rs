//! Denormalized property cleanup.
//!
//! Array properties exist on nodes only long enough to derive
//! relationships from them; afterwards they are removed in bounded
//! batches so no single transaction has to touch a whole label. The
//! loop is safe to interrupt and re-run: remaining nodes are picked up
//! by the next invocation.

use anyhow::Result;
use neo4rs::{BoltInteger, BoltType};
use tracing::{error, info};

use crate::bolt::single_param;
use crate::client::GraphBackend;
use crate::cypher::ident;

/// Remove each named property from all nodes of a label, at most
/// `batch_size` nodes per statement, looping per property until a batch
/// removes zero. A query error aborts that property's loop only; other
/// properties continue and already-removed batches stay removed.
pub async fn remove_denormalized_props<B: GraphBackend>(
    graph: &B,
    label: &str,
    props: &[String],
    batch_size: i64,
) -> Result<usize> {
    let label = ident(label)?;
    let mut total = 0usize;

    for prop in props {
        let prop = ident(prop)?;
        let statement = format!(
            "MATCH (n:{label}) \
             WHERE n.{prop} IS NOT NULL \
             WITH n LIMIT $batch_size \
             REMOVE n.{prop} \
             RETURN count(n) AS removed"
        );

        let mut prop_total = 0i64;
        loop {
            let params = single_param("batch_size", BoltType::Integer(BoltInteger::new(batch_size)));
            match graph.execute_count(&statement, params, "removed").await {
                Ok(0) => break,
                Ok(removed) => prop_total += removed,
                Err(e) => {
                    error!(label, prop, error = %e, "cleanup batch failed, property aborted");
                    break;
                }
            }
        }

        total += prop_total as usize;
        info!(label, prop, removed = prop_total, "denormalized property cleaned");
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockBackend;

    #[tokio::test]
    async fn terminates_in_ceil_n_over_k_batches() {
        // N = 5 nodes, batch_size k = 2: three removing batches then the
        // terminating empty one.
        let graph = MockBackend::with_counts([2, 2, 1, 0]);
        let props = vec!["author_id".to_string()];

        let removed = remove_denormalized_props(&graph, "Book", &props, 2).await.unwrap();

        assert_eq!(removed, 5);
        assert_eq!(graph.recorded().len(), 4);
        assert!(graph.recorded()[0].contains("WHERE n.author_id IS NOT NULL"));
        assert!(graph.recorded()[0].contains("REMOVE n.author_id"));
    }

    #[tokio::test]
    async fn already_clean_property_takes_one_batch() {
        let graph = MockBackend::with_counts([0]);
        let props = vec!["series_id".to_string()];

        let removed = remove_denormalized_props(&graph, "Book", &props, 100).await.unwrap();
        assert_eq!(removed, 0);
        assert_eq!(graph.recorded().len(), 1);
    }

    #[tokio::test]
    async fn failing_property_aborts_alone() {
        let graph = MockBackend::default();
        graph.queue_count_error("transaction timeout");
        graph.queue_counts([3, 0]);
        let props = vec!["club_ids".to_string(), "badge_timestamps".to_string()];

        let removed = remove_denormalized_props(&graph, "User", &props, 10).await.unwrap();

        // club_ids aborted, badge_timestamps still cleaned.
        assert_eq!(removed, 3);
        assert_eq!(graph.recorded().len(), 3);
        assert!(graph.recorded()[1].contains("REMOVE n.badge_timestamps"));
    }
}
