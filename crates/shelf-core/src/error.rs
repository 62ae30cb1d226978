//! Centralized error types for Shelfsync.

use serde::Serialize;
use thiserror::Error;

/// Main error type for Shelfsync operations.
#[derive(Error, Debug)]
pub enum ShelfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Source error: {0}")]
    Source(String),

    #[error("Snapshot error for '{entity}': {message}")]
    Snapshot { entity: String, message: String },

    #[error("Entity type not configured: {0}")]
    UnknownEntity(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type for Shelfsync operations.
pub type ShelfResult<T> = Result<T, ShelfError>;

impl ShelfError {
    /// Create a source error.
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Why a single record was skipped instead of processed.
///
/// Per-record failures never abort a run: the record is dropped from the
/// batch, the reason is aggregated into the run report, and the rest of
/// the entity type proceeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The source row was not a JSON object.
    NotAnObject,
    /// The document carries no `_id` field.
    MissingId,
    /// A required field was absent or had an unusable value.
    MalformedField(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "row is not an object"),
            Self::MissingId => write!(f, "document has no _id"),
            Self::MalformedField(field) => write!(f, "malformed field '{field}'"),
        }
    }
}

/// A skipped record together with enough context to find it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    /// Identifying context: an `_id` when known, otherwise a positional hint.
    pub context: String,
    pub reason: SkipReason,
}

impl SkippedRecord {
    pub fn new(context: impl Into<String>, reason: SkipReason) -> Self {
        Self { context: context.into(), reason }
    }
}
