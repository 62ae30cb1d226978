//! Structured run summaries.

use serde::Serialize;

use crate::diff::DiffResult;
use crate::error::SkippedRecord;

/// Per-entity-type outcome of a full reconciliation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntityReport {
    pub entity: String,
    pub added: usize,
    pub removed: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: Vec<SkippedRecord>,
}

impl EntityReport {
    pub fn new(entity: impl Into<String>) -> Self {
        Self { entity: entity.into(), ..Default::default() }
    }

    pub fn record_diff(&mut self, diff: &DiffResult) {
        self.added = diff.added.len();
        self.removed = diff.removed.len();
        self.updated = diff.updated.len();
        self.unchanged = diff.unchanged.len();
    }
}

/// Aggregate over all entity types in one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub entities: Vec<EntityReport>,
}

impl RunReport {
    pub fn push(&mut self, report: EntityReport) {
        self.entities.push(report);
    }

    pub fn total_added(&self) -> usize {
        self.entities.iter().map(|e| e.added).sum()
    }

    pub fn total_removed(&self) -> usize {
        self.entities.iter().map(|e| e.removed).sum()
    }

    pub fn total_updated(&self) -> usize {
        self.entities.iter().map(|e| e.updated).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.entities.iter().map(|e| e.skipped.len()).sum()
    }

    pub fn is_noop(&self) -> bool {
        self.total_added() == 0 && self.total_removed() == 0 && self.total_updated() == 0
    }
}
