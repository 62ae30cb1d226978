//! TOML configuration for the pipeline.
//!
//! The configuration is the declarative heart of a deployment: which
//! entity types exist, their business keys, how each is projected into
//! the graph, which relationships are derived, and which denormalized
//! properties get cleaned up afterwards. Arrays keep their declared
//! order — flatten mappings and relationship rules run in the order
//! they are written.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use shelf_core::FieldMapping;
use shelf_graph::{GraphConfig, RelationshipRule};
use shelf_store::{HttpSource, JsonDirSource, RecordSource};

#[derive(Debug, Clone, Deserialize)]
pub struct ShelfConfig {
    /// Root for snapshots, document collections, and the watermark.
    #[serde(default = "ShelfConfig::default_data_dir")]
    pub data_dir: PathBuf,

    pub source: SourceConfig,

    #[serde(default)]
    pub graph: GraphConfig,

    /// Bounded fan-out for per-entity stages.
    #[serde(default = "ShelfConfig::default_parallelism")]
    pub parallelism: usize,

    /// Nodes removed per cleanup batch.
    #[serde(default = "ShelfConfig::default_cleanup_batch_size")]
    pub cleanup_batch_size: i64,

    #[serde(rename = "entity", default)]
    pub entities: Vec<EntityConfig>,

    #[serde(rename = "relationship", default)]
    pub relationships: Vec<RelationshipRule>,

    #[serde(rename = "cleanup", default)]
    pub cleanup: Vec<CleanupConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// A directory of `<entity>.json` array files.
    JsonDir { path: PathBuf },
    /// An HTTP endpoint serving `GET {base_url}/{entity}`.
    Http { base_url: String },
}

impl SourceConfig {
    pub fn connect(&self) -> Arc<dyn RecordSource> {
        match self {
            Self::JsonDir { path } => Arc::new(JsonDirSource::new(path.clone())),
            Self::Http { base_url } => Arc::new(HttpSource::new(base_url.clone())),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntityConfig {
    pub name: String,

    /// Business-key fields for snapshot hashing; empty means
    /// whole-record hashing.
    #[serde(default)]
    pub key_fields: Vec<String>,

    /// Present only for entity types projected into the graph.
    pub projection: Option<ProjectionConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectionConfig {
    pub label: String,

    /// Node key property: `_id`, or `name` for small enumerations.
    #[serde(default = "ProjectionConfig::default_key_prop")]
    pub key_prop: String,

    /// Fields dropped before flattening (PII, bookkeeping).
    #[serde(default)]
    pub exclude_fields: Vec<String>,

    /// Declared-order flatten mappings.
    #[serde(rename = "flatten", default)]
    pub field_map: Vec<FieldMapping>,
}

impl ProjectionConfig {
    fn default_key_prop() -> String {
        "_id".to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CleanupConfig {
    pub label: String,
    pub props: Vec<String>,
}

impl ShelfConfig {
    fn default_data_dir() -> PathBuf {
        PathBuf::from(".shelfsync")
    }

    fn default_parallelism() -> usize {
        4
    }

    fn default_cleanup_batch_size() -> i64 {
        5000
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("invalid config in {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.entities.is_empty() {
            bail!("no [[entity]] blocks configured");
        }
        for (i, entity) in self.entities.iter().enumerate() {
            if self.entities[..i].iter().any(|e| e.name == entity.name) {
                bail!("duplicate entity '{}'", entity.name);
            }
        }
        if self.parallelism == 0 {
            bail!("parallelism must be at least 1");
        }
        if self.cleanup_batch_size <= 0 {
            bail!("cleanup_batch_size must be positive");
        }
        Ok(())
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.data_dir.join("snapshots")
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.data_dir.join("documents")
    }

    pub fn watermark_path(&self) -> PathBuf {
        self.data_dir.join("watermark.json")
    }

    pub fn entity(&self, name: &str) -> Result<&EntityConfig> {
        self.entities
            .iter()
            .find(|e| e.name == name)
            .with_context(|| format!("entity '{name}' is not configured"))
    }

    /// Entity types that project into the graph, in declared order.
    pub fn projected(&self) -> impl Iterator<Item = (&EntityConfig, &ProjectionConfig)> {
        self.entities
            .iter()
            .filter_map(|e| e.projection.as_ref().map(|p| (e, p)))
    }
}
