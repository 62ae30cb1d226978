//! Neo4j connection client.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use neo4rs::{BoltMap, ConfigBuilder, Graph, Query};
use serde::Deserialize;

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    #[serde(default = "GraphConfig::default_db")]
    pub db: String,
}

impl GraphConfig {
    fn default_db() -> String {
        "neo4j".to_string()
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "shelfsync_dev".to_string(),
            db: Self::default_db(),
        }
    }
}

/// The statement-level surface the projector runs against.
///
/// Implemented by [`GraphClient`] for real runs and by a scripted mock in
/// tests; taking the backend as an explicit argument keeps the projection
/// logic free of shared global connection state.
#[async_trait]
pub trait GraphBackend: Send + Sync {
    /// Run a statement, discarding any result rows.
    async fn execute(&self, cypher: &str, params: BoltMap) -> Result<()>;

    /// Run a statement returning a single aggregate count under `field`.
    /// No rows is reported as zero.
    async fn execute_count(&self, cypher: &str, params: BoltMap, field: &str) -> Result<i64>;

    /// Run a statement and collect the non-null string values of `field`
    /// across all rows.
    async fn fetch_strings(&self, cypher: &str, params: BoltMap, field: &str) -> Result<Vec<String>>;
}

/// Client for the Neo4j projection target.
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Connect and ping.
    ///
    /// neo4rs uses a lazy pool — `Graph::connect` only builds the pool
    /// object without a real bolt handshake. A `RETURN 1` ping forces the
    /// handshake so an unreachable server fails fast instead of hanging
    /// until the first projection statement.
    pub async fn connect(config: &GraphConfig) -> Result<Self> {
        let neo4j_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .db(config.db.as_str())
            .max_connections(8)
            .build()
            .context("Failed to build Neo4j config")?;

        let graph = Graph::connect(neo4j_config)
            .await
            .context("Failed to create Neo4j connection pool")?;

        graph
            .run(Query::new("RETURN 1".to_string()))
            .await
            .context("Neo4j is not responding to queries")?;

        Ok(Self { graph })
    }

    fn build_query(cypher: &str, params: BoltMap) -> Query {
        let mut query = Query::new(cypher.to_string());
        for (key, value) in params.value {
            query = query.param(&key.value, value);
        }
        query
    }

    /// Node and relationship totals for status display.
    pub async fn counts(&self) -> Result<GraphCounts> {
        let nodes = self
            .execute_count("MATCH (n) RETURN count(n) AS count", BoltMap::default(), "count")
            .await?;
        let relationships = self
            .execute_count("MATCH ()-[r]->() RETURN count(r) AS count", BoltMap::default(), "count")
            .await?;
        Ok(GraphCounts { nodes: nodes as usize, relationships: relationships as usize })
    }
}

#[async_trait]
impl GraphBackend for GraphClient {
    async fn execute(&self, cypher: &str, params: BoltMap) -> Result<()> {
        self.graph
            .run(Self::build_query(cypher, params))
            .await
            .context("Neo4j statement failed")?;
        Ok(())
    }

    async fn execute_count(&self, cypher: &str, params: BoltMap, field: &str) -> Result<i64> {
        let mut result = self
            .graph
            .execute(Self::build_query(cypher, params))
            .await
            .context("Neo4j query failed")?;

        match result.next().await {
            Ok(Some(row)) => row
                .get::<i64>(field)
                .map_err(|e| anyhow!("missing count field '{field}': {e:?}")),
            Ok(None) => Ok(0),
            Err(e) => Err(anyhow!("Neo4j result stream failed: {e:?}")),
        }
    }

    async fn fetch_strings(&self, cypher: &str, params: BoltMap, field: &str) -> Result<Vec<String>> {
        let mut result = self
            .graph
            .execute(Self::build_query(cypher, params))
            .await
            .context("Neo4j query failed")?;

        let mut values = Vec::new();
        while let Ok(Some(row)) = result.next().await {
            if let Ok(Some(value)) = row.get::<Option<String>>(field) {
                values.push(value);
            }
        }
        Ok(values)
    }
}

/// Node and relationship counts.
#[derive(Debug, Clone, Copy)]
pub struct GraphCounts {
    pub nodes: usize,
    pub relationships: usize,
}
