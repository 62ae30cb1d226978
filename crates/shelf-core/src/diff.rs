//! Snapshot differencing and merge.
//!
//! Given the last persisted snapshot and a freshly fetched source set,
//! classify every record as added, removed, updated, or unchanged, and
//! produce the merged snapshot with identifiers preserved. Everything
//! here is in-memory: the caller decides whether the merged snapshot is
//! persisted, so a failed sync never leaves a half-written snapshot.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::hash::content_hash;
use crate::identity::ensure_id;
use crate::record::{Record, HASH_FIELD, ID_FIELD};

/// A single field's old and new value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub from: Value,
    pub to: Value,
}

/// One updated record: its identity, business-key hash, and the field
/// deltas that were merged into it.
#[derive(Debug, Clone, Serialize)]
pub struct RecordChange {
    pub id: String,
    pub hash: String,
    pub before: Map<String, Value>,
    pub after: Map<String, Value>,
    pub changes: BTreeMap<String, FieldChange>,
}

/// Classification of a full source set against the previous snapshot.
///
/// `added`, `updated`, and `unchanged` partition the new source set by
/// identifier; `removed` is exactly the prior-snapshot records whose
/// business-key hash no longer appears in the source.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiffResult {
    pub added: Vec<Record>,
    pub removed: Vec<Record>,
    pub updated: Vec<RecordChange>,
    pub unchanged: Vec<Record>,
}

impl DiffResult {
    /// True when a re-run against an unchanged source produced no work.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

/// The merged snapshot together with its diff.
#[derive(Debug, Clone)]
pub struct DiffOutcome {
    /// The new snapshot: survivors (updated in place) plus added records,
    /// every one carrying a stable identifier.
    pub snapshot: Vec<Record>,
    pub diff: DiffResult,
}

/// Diff a fresh source set against the previous snapshot and merge.
///
/// `key_fields` is the entity type's declared business key; an empty list
/// degrades to whole-body hashing, under which any field change shows up
/// as an add/remove pair rather than an update. A new record on which no
/// declared key field resolves hashes to nothing and is always classified
/// as added, never silently dropped.
pub fn diff_and_merge(old: Vec<Record>, new: Vec<Record>, key_fields: &[String]) -> DiffOutcome {
    // Index the source set by hash. On duplicate hashes the last
    // occurrence wins, matching the source-of-truth convention that later
    // rows shadow earlier ones.
    let new_hashes: Vec<Option<String>> =
        new.iter().map(|r| content_hash(r, key_fields)).collect();
    let mut new_by_hash: HashMap<&str, usize> = HashMap::new();
    for (idx, hash) in new_hashes.iter().enumerate() {
        if let Some(h) = hash {
            new_by_hash.insert(h.as_str(), idx);
        }
    }

    let mut diff = DiffResult::default();
    let mut snapshot = Vec::with_capacity(new.len());
    let mut old_hashes: Vec<Option<String>> = Vec::with_capacity(old.len());

    for mut old_record in old {
        let hash = content_hash(&old_record, key_fields);
        old_hashes.push(hash.clone());
        let new_idx = hash.as_deref().and_then(|h| new_by_hash.get(h)).copied();

        let Some(idx) = new_idx else {
            debug!(id = old_record.id().unwrap_or("?"), "record removed from source");
            diff.removed.push(old_record);
            continue;
        };

        ensure_id(&mut old_record);
        let changes = merge_fields(&mut old_record, &new[idx]);

        if changes.is_empty() {
            diff.unchanged.push(old_record.clone());
        } else {
            diff.updated.push(RecordChange {
                id: old_record.id().unwrap_or_default().to_string(),
                hash: hash.unwrap_or_default(),
                before: changes.iter().map(|(k, c)| (k.clone(), c.from.clone())).collect(),
                after: changes.iter().map(|(k, c)| (k.clone(), c.to.clone())).collect(),
                changes,
            });
        }
        snapshot.push(old_record);
    }

    // Anything whose hash was absent from the old snapshot is new, as is
    // any record with no resolvable key.
    let old_hash_set: std::collections::HashSet<&str> =
        old_hashes.iter().flatten().map(String::as_str).collect();
    for (idx, mut record) in new.into_iter().enumerate() {
        let known = new_hashes[idx]
            .as_deref()
            .is_some_and(|h| old_hash_set.contains(h));
        if known {
            continue;
        }
        record.remove(HASH_FIELD);
        ensure_id(&mut record);
        diff.added.push(record.clone());
        snapshot.push(record);
    }

    DiffOutcome { snapshot, diff }
}

/// Merge the matched source record's fields into the surviving snapshot
/// record, returning the per-field deltas. The identifier is never
/// compared or overwritten; fields absent from the source row are left
/// in place.
fn merge_fields(old: &mut Record, new: &Record) -> BTreeMap<String, FieldChange> {
    let mut changes = BTreeMap::new();

    for (key, new_value) in new.iter() {
        if key == ID_FIELD || key == HASH_FIELD {
            continue;
        }
        if old.get(key) != Some(new_value) {
            changes.insert(
                key.clone(),
                FieldChange {
                    from: old.get(key).cloned().unwrap_or(Value::Null),
                    to: new_value.clone(),
                },
            );
            old.insert(key.clone(), new_value.clone());
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::from_value(value).unwrap()
    }

    fn keys(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|s| s.to_string()).collect()
    }

    fn ids(records: &[Record]) -> HashSet<String> {
        records.iter().map(|r| r.id().unwrap().to_string()).collect()
    }

    #[test]
    fn first_sync_classifies_everything_as_added() {
        let new = vec![
            record(json!({"title": "Dune", "genre": "SciFi"})),
            record(json!({"title": "It", "genre": "Horror"})),
        ];

        let outcome = diff_and_merge(vec![], new, &keys(&["title", "genre"]));
        assert_eq!(outcome.diff.added.len(), 2);
        assert!(outcome.diff.removed.is_empty());
        assert!(outcome.diff.updated.is_empty());
        assert!(outcome.snapshot.iter().all(|r| r.id().is_some()));
    }

    #[test]
    fn second_run_against_unchanged_source_is_a_noop() {
        let key_fields = keys(&["title"]);
        let source = vec![record(json!({"title": "Dune", "rating": 4}))];

        let first = diff_and_merge(vec![], source.clone(), &key_fields);
        let second = diff_and_merge(first.snapshot.clone(), source, &key_fields);

        assert!(second.diff.is_noop());
        assert_eq!(second.diff.unchanged.len(), 1);
        assert_eq!(second.snapshot, first.snapshot);
    }

    #[test]
    fn changed_field_is_an_update_preserving_identity() {
        let key_fields = keys(&["title"]);
        let first = diff_and_merge(
            vec![],
            vec![record(json!({"title": "Dune", "rating": 4}))],
            &key_fields,
        );
        let original_id = first.snapshot[0].id().unwrap().to_string();

        let second = diff_and_merge(
            first.snapshot,
            vec![record(json!({"title": "Dune", "rating": 5}))],
            &key_fields,
        );

        assert_eq!(second.diff.updated.len(), 1);
        let change = &second.diff.updated[0];
        assert_eq!(change.id, original_id);
        assert_eq!(change.changes["rating"].from, json!(4));
        assert_eq!(change.changes["rating"].to, json!(5));
        assert_eq!(change.before.get("rating"), Some(&json!(4)));
        assert_eq!(change.after.get("rating"), Some(&json!(5)));

        assert_eq!(second.snapshot[0].id(), Some(original_id.as_str()));
        assert_eq!(second.snapshot[0].get("rating"), Some(&json!(5)));
    }

    #[test]
    fn vanished_record_is_removed() {
        let key_fields = keys(&["handle"]);
        let first = diff_and_merge(
            vec![],
            vec![
                record(json!({"handle": "ana"})),
                record(json!({"handle": "bruno"})),
            ],
            &key_fields,
        );

        let second = diff_and_merge(
            first.snapshot,
            vec![record(json!({"handle": "ana"}))],
            &key_fields,
        );

        assert_eq!(second.diff.removed.len(), 1);
        assert_eq!(second.diff.removed[0].get("handle"), Some(&json!("bruno")));
        assert_eq!(second.snapshot.len(), 1);
    }

    #[test]
    fn partition_property_holds() {
        let key_fields = keys(&["title"]);
        let first = diff_and_merge(
            vec![],
            vec![
                record(json!({"title": "Dune", "rating": 4})),
                record(json!({"title": "It", "rating": 3})),
                record(json!({"title": "Solaris", "rating": 5})),
            ],
            &key_fields,
        );
        let old_ids = ids(&first.snapshot);

        // "It" removed, "Dune" updated, "Solaris" unchanged, "Ubik" added.
        let second = diff_and_merge(
            first.snapshot,
            vec![
                record(json!({"title": "Dune", "rating": 5})),
                record(json!({"title": "Solaris", "rating": 5})),
                record(json!({"title": "Ubik", "rating": 4})),
            ],
            &key_fields,
        );

        let added = ids(&second.diff.added);
        let updated: HashSet<String> =
            second.diff.updated.iter().map(|c| c.id.clone()).collect();
        let unchanged = ids(&second.diff.unchanged);

        assert!(added.is_disjoint(&updated));
        assert!(added.is_disjoint(&unchanged));
        assert!(updated.is_disjoint(&unchanged));

        let union: HashSet<String> =
            added.union(&updated).chain(&unchanged).cloned().collect();
        assert_eq!(union, ids(&second.snapshot));

        let removed = ids(&second.diff.removed);
        let surviving: HashSet<String> =
            old_ids.intersection(&union).cloned().collect();
        let expected_removed: HashSet<String> =
            old_ids.difference(&surviving).cloned().collect();
        assert_eq!(removed, expected_removed);
    }

    #[test]
    fn whole_body_hashing_turns_edits_into_add_remove_pairs() {
        let no_keys: Vec<String> = vec![];
        let first = diff_and_merge(
            vec![],
            vec![record(json!({"club_id": "c1", "user_id": "u1", "role": "member"}))],
            &no_keys,
        );

        let second = diff_and_merge(
            first.snapshot,
            vec![record(json!({"club_id": "c1", "user_id": "u1", "role": "moderator"}))],
            &no_keys,
        );

        assert_eq!(second.diff.added.len(), 1);
        assert_eq!(second.diff.removed.len(), 1);
        assert!(second.diff.updated.is_empty());
    }

    #[test]
    fn record_without_resolvable_keys_is_always_added() {
        let key_fields = keys(&["isbn_13"]);
        let outcome = diff_and_merge(
            vec![],
            vec![record(json!({"title": "no isbn here"}))],
            &key_fields,
        );
        assert_eq!(outcome.diff.added.len(), 1);
        assert_eq!(outcome.snapshot.len(), 1);
    }

    #[test]
    fn reappearing_record_gets_a_new_identity() {
        let key_fields = keys(&["name"]);
        let first = diff_and_merge(vec![], vec![record(json!({"name": "Hugo"}))], &key_fields);
        let original_id = first.snapshot[0].id().unwrap().to_string();

        let gone = diff_and_merge(first.snapshot, vec![], &key_fields);
        assert_eq!(gone.diff.removed.len(), 1);

        let back = diff_and_merge(gone.snapshot, vec![record(json!({"name": "Hugo"}))], &key_fields);
        assert_eq!(back.diff.added.len(), 1);
        assert_ne!(back.snapshot[0].id(), Some(original_id.as_str()));
    }

    #[test]
    fn source_fields_missing_from_row_are_left_in_place() {
        let key_fields = keys(&["title"]);
        let first = diff_and_merge(
            vec![],
            vec![record(json!({"title": "Dune", "note": "signed copy"}))],
            &key_fields,
        );

        let second = diff_and_merge(
            first.snapshot,
            vec![record(json!({"title": "Dune"}))],
            &key_fields,
        );

        assert!(second.diff.is_noop());
        assert_eq!(second.snapshot[0].get("note"), Some(&json!("signed copy")));
    }
}
