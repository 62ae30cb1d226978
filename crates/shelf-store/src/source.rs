//! External tabular sources.
//!
//! A source hands back an ordered list of row-like records per named
//! entity type. Two implementations: a directory of JSON array files
//! (exports dropped by the upstream sheet tooling) and an HTTP endpoint
//! serving the same shape per entity type.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use shelf_core::{Record, ShelfError, ShelfResult, SkipReason, SkippedRecord};

/// Rows fetched for one entity type, with malformed rows set aside.
#[derive(Debug, Default)]
pub struct FetchedRows {
    pub records: Vec<Record>,
    pub skipped: Vec<SkippedRecord>,
}

impl FetchedRows {
    /// Split a raw JSON payload into records and skipped rows. The
    /// payload must be an array; each non-object element is skipped with
    /// its position as context.
    fn from_payload(entity: &str, payload: Value) -> ShelfResult<Self> {
        let Value::Array(rows) = payload else {
            return Err(ShelfError::source(format!(
                "source payload for '{entity}' is not an array"
            )));
        };

        let mut fetched = Self::default();
        for (idx, row) in rows.into_iter().enumerate() {
            match Record::from_value(row) {
                Ok(record) => fetched.records.push(record),
                Err(reason) => {
                    warn!(entity, row = idx, %reason, "skipping malformed source row");
                    fetched.skipped.push(SkippedRecord::new(format!("{entity}[{idx}]"), reason));
                }
            }
        }
        Ok(fetched)
    }
}

/// A fetchable tabular source of truth.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch all rows for one entity type. An unreachable source is
    /// fatal to the run; individual malformed rows are not.
    async fn fetch(&self, entity: &str) -> ShelfResult<FetchedRows>;
}

/// A directory holding one `<entity>.json` array file per entity type.
#[derive(Debug, Clone)]
pub struct JsonDirSource {
    dir: PathBuf,
}

impl JsonDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl RecordSource for JsonDirSource {
    async fn fetch(&self, entity: &str) -> ShelfResult<FetchedRows> {
        let path = self.dir.join(format!("{entity}.json"));
        let text = std::fs::read_to_string(&path).map_err(|e| {
            ShelfError::source(format!("cannot read source file {}: {e}", path.display()))
        })?;
        let payload: Value = serde_json::from_str(&text)?;
        FetchedRows::from_payload(entity, payload)
    }
}

/// An HTTP endpoint serving `GET {base_url}/{entity}` as a JSON array.
#[derive(Debug, Clone)]
pub struct HttpSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl RecordSource for HttpSource {
    async fn fetch(&self, entity: &str) -> ShelfResult<FetchedRows> {
        let url = format!("{}/{entity}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ShelfError::source(format!("GET {url} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ShelfError::source(format!(
                "GET {url} returned {}",
                response.status()
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ShelfError::source(format!("GET {url}: invalid JSON body: {e}")))?;
        FetchedRows::from_payload(entity, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn json_dir_source_reads_rows_and_skips_malformed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("genres.json"),
            json!([{"name": "Horror"}, "not a row", {"name": "SciFi"}]).to_string(),
        )
        .unwrap();

        let source = JsonDirSource::new(dir.path());
        let fetched = source.fetch("genres").await.unwrap();

        assert_eq!(fetched.records.len(), 2);
        assert_eq!(fetched.skipped.len(), 1);
        assert_eq!(fetched.skipped[0].context, "genres[1]");
        assert_eq!(fetched.skipped[0].reason, SkipReason::NotAnObject);
    }

    #[tokio::test]
    async fn missing_entity_file_is_a_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonDirSource::new(dir.path());
        assert!(matches!(source.fetch("books").await, Err(ShelfError::Source(_))));
    }

    #[tokio::test]
    async fn non_array_payload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("books.json"), "{}").unwrap();
        let source = JsonDirSource::new(dir.path());
        assert!(matches!(source.fetch("books").await, Err(ShelfError::Source(_))));
    }
}
