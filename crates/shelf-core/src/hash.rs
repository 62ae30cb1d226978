//! Canonical content hashing.
//!
//! A record's fingerprint is the SHA-256 of its key-sorted JSON
//! serialization — either the declared business-key subset or, when no
//! key is declared, the whole record body. The identifier and any
//! transient hash are stripped first so that identity assignment never
//! changes a fingerprint.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::record::Record;

/// Compute a record's content hash.
///
/// With a non-empty `key_fields` list, only those fields participate; a
/// record on which none of the declared keys resolve returns `None` and
/// is classified as always-new by the differ rather than dropped.
///
/// Deterministic across runs and independent of field insertion order
/// (the underlying map is key-sorted).
pub fn content_hash(record: &Record, key_fields: &[String]) -> Option<String> {
    let body = record.body();

    if key_fields.is_empty() {
        return Some(digest_fields(&body));
    }

    let mut subdoc = Map::new();
    for key in key_fields {
        if let Some(value) = body.get(key) {
            subdoc.insert(key.clone(), value.clone());
        }
    }

    if subdoc.is_empty() {
        return None;
    }
    Some(digest_fields(&subdoc))
}

fn digest_fields(fields: &Map<String, Value>) -> String {
    // Map keys are sorted, so this serialization is canonical.
    let canonical = Value::Object(fields.clone()).to_string();
    let digest = Sha256::digest(canonical.as_bytes());
    format!("{digest:x}")
}
