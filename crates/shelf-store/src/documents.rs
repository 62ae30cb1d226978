//! Document-store collections.
//!
//! Each collection is a JSON array of documents keyed by `_id`, mirrored
//! 1:1 from the merged snapshot. Added and changed documents receive a
//! fresh `updated_at` stamp so later incremental fetches can be scoped
//! to a watermark; unchanged documents keep their stamp.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{info, warn};

use shelf_core::{flatten, strip_nested, FieldMapping, Record, ShelfResult, SkipReason, SkippedRecord};

use crate::write_atomic;

/// Modification stamp maintained by the mirror, RFC3339.
pub const UPDATED_AT: &str = "updated_at";

/// Outcome of mirroring one snapshot into its collection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MirrorCounts {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

/// Options for fetching a collection for projection.
#[derive(Debug, Default, Clone)]
pub struct FetchOptions {
    /// Fields dropped before flattening (PII, bookkeeping).
    pub exclude_fields: Vec<String>,
    /// Declared-order flatten mappings.
    pub field_map: Vec<FieldMapping>,
    /// Only documents stamped at or after this instant. Documents with a
    /// missing or unparseable stamp are kept; re-projecting is idempotent
    /// and cheaper than silently missing one.
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{collection}.json"))
    }

    /// Load a collection. A missing file is an empty collection.
    pub fn load(&self, collection: &str) -> ShelfResult<Vec<Record>> {
        let path = self.path(collection);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, collection: &str, docs: &[Record]) -> ShelfResult<()> {
        let contents = serde_json::to_vec_pretty(docs)?;
        write_atomic(&self.path(collection), &contents)
    }

    /// Mirror a merged snapshot into its collection.
    ///
    /// Documents absent from the snapshot are dropped; new documents are
    /// inserted and changed documents overwritten, both stamped with
    /// `now`. Returns per-collection counts.
    pub fn sync_collection(
        &self,
        collection: &str,
        snapshot: &[Record],
        now: DateTime<Utc>,
    ) -> ShelfResult<MirrorCounts> {
        let existing = self.load(collection)?;
        let by_id: HashMap<String, &Record> = existing
            .iter()
            .filter_map(|doc| doc.id().map(|id| (id.to_string(), doc)))
            .collect();

        let mut counts = MirrorCounts::default();
        let mut docs = Vec::with_capacity(snapshot.len());
        let stamp = Value::String(now.to_rfc3339());

        for record in snapshot {
            let Some(id) = record.id() else {
                warn!(collection, "snapshot record without _id not mirrored");
                continue;
            };

            match by_id.get(id) {
                Some(current) if unstamped(current) == *record.fields() => {
                    docs.push((*current).clone());
                }
                Some(_) => {
                    let mut doc = record.clone();
                    doc.insert(UPDATED_AT, stamp.clone());
                    docs.push(doc);
                    counts.updated += 1;
                }
                None => {
                    let mut doc = record.clone();
                    doc.insert(UPDATED_AT, stamp.clone());
                    docs.push(doc);
                    counts.added += 1;
                }
            }
        }

        let kept: HashSet<&str> = docs.iter().filter_map(Record::id).collect();
        counts.removed = by_id.keys().filter(|id| !kept.contains(id.as_str())).count();

        self.save(collection, &docs)?;
        info!(
            collection,
            added = counts.added,
            updated = counts.updated,
            removed = counts.removed,
            "collection mirrored"
        );
        Ok(counts)
    }

    /// Fetch a collection as flattened scalar rows ready for node upsert.
    pub fn fetch_flattened(
        &self,
        collection: &str,
        options: &FetchOptions,
    ) -> ShelfResult<(Vec<Map<String, Value>>, Vec<SkippedRecord>)> {
        let docs = self.load(collection)?;
        let mut rows = Vec::with_capacity(docs.len());
        let mut skipped = Vec::new();

        for (idx, doc) in docs.into_iter().enumerate() {
            if !modified_since(&doc, options.since) {
                continue;
            }
            if doc.id().is_none() {
                warn!(collection, row = idx, "document has no _id, not projected");
                skipped.push(SkippedRecord::new(format!("{collection}[{idx}]"), SkipReason::MissingId));
                continue;
            }

            let mut fields = doc.fields().clone();
            for field in &options.exclude_fields {
                fields.remove(field);
            }
            let flat = flatten(&fields, &options.field_map);
            rows.push(strip_nested(&flat));
        }

        info!(collection, count = rows.len(), "fetched documents for projection");
        Ok((rows, skipped))
    }

    /// The full identifier set of a collection; deletion sync compares
    /// graph ids against this.
    pub fn ids(&self, collection: &str) -> ShelfResult<HashSet<String>> {
        Ok(self
            .load(collection)?
            .iter()
            .filter_map(|doc| doc.id().map(str::to_string))
            .collect())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// A document's fields minus the mirror's own stamp, for change detection.
fn unstamped(doc: &Record) -> Map<String, Value> {
    let mut fields = doc.fields().clone();
    fields.remove(UPDATED_AT);
    fields
}

fn modified_since(doc: &Record, since: Option<DateTime<Utc>>) -> bool {
    let Some(since) = since else { return true };
    match doc.get(UPDATED_AT).and_then(Value::as_str) {
        Some(text) => match DateTime::parse_from_rfc3339(text) {
            Ok(stamp) => stamp.with_timezone(&Utc) >= since,
            Err(_) => true,
        },
        None => true,
    }
}
