//! # Shelf Graph
//!
//! Neo4j projection of the Shelfsync document collections: idempotent
//! node upserts, relationship derivation from flattened arrays, bounded
//! batch cleanup of denormalized properties, and deletion propagation.
//!
//! Every operation is generic over [`GraphBackend`], so the projection
//! logic runs unchanged against the real neo4rs client or a scripted
//! test double.

pub mod bolt;
pub mod cleanup;
pub mod client;
mod cypher;
pub mod deletions;
pub mod relations;
pub mod schema;
pub mod upsert;

pub use client::{GraphBackend, GraphClient, GraphConfig, GraphCounts};
pub use relations::RelationshipRule;
pub use upsert::UpsertOutcome;
