//! The source-of-truth record model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SkipReason;

/// Field carrying the stable synthetic identifier.
pub const ID_FIELD: &str = "_id";

/// Transient field used while diffing; never persisted.
pub const HASH_FIELD: &str = "hash";

/// One entity instance: an identifier plus a mapping of field name to
/// scalar or structured value.
///
/// Backed by a `serde_json::Map`, which keeps keys sorted, so every
/// serialization of a record is canonical regardless of the order fields
/// arrived in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Build a record from an arbitrary JSON value. Non-objects are
    /// rejected with a skip reason rather than an error: a malformed row
    /// drops out of the batch, it does not abort it.
    pub fn from_value(value: Value) -> Result<Self, SkipReason> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(SkipReason::NotAnObject),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    /// The stable identifier, if one has been assigned.
    pub fn id(&self) -> Option<&str> {
        self.fields.get(ID_FIELD).and_then(Value::as_str)
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.fields.insert(ID_FIELD.to_string(), Value::String(id.into()));
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// The record body: all fields except the identifier and the transient
    /// hash. This is what content hashing and field comparison operate on.
    pub fn body(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .filter(|(k, _)| k.as_str() != ID_FIELD && k.as_str() != HASH_FIELD)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_value_rejects_non_objects() {
        assert_eq!(Record::from_value(json!("a string")), Err(SkipReason::NotAnObject));
        assert_eq!(Record::from_value(json!([1, 2])), Err(SkipReason::NotAnObject));
        assert!(Record::from_value(json!({"title": "Dune"})).is_ok());
    }

    #[test]
    fn body_strips_id_and_hash() {
        let mut record = Record::from_value(json!({
            "_id": "abc",
            "hash": "deadbeef",
            "title": "Dune",
        }))
        .unwrap();
        record.set_id("abc");

        let body = record.body();
        assert_eq!(body.len(), 1);
        assert_eq!(body.get("title"), Some(&json!("Dune")));
    }

    #[test]
    fn serializes_transparently() {
        let record = Record::from_value(json!({"_id": "x", "name": "Horror"})).unwrap();
        let text = serde_json::to_string(&record).unwrap();
        assert_eq!(text, r#"{"_id":"x","name":"Horror"}"#);

        let back: Record = serde_json::from_str(&text).unwrap();
        assert_eq!(back, record);
    }
}
