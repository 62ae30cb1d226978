//! Document flattening for graph projection.
//!
//! Nested subdocuments are collapsed into parallel scalar arrays per a
//! declarative field map, so relationship derivation can walk plain
//! lists instead of nested structures.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ShelfError;

/// A `parent.child` path into a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldPath {
    pub parent: String,
    pub child: String,
}

impl std::str::FromStr for FieldPath {
    type Err = ShelfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((parent, child)) if !parent.is_empty() && !child.is_empty() => Ok(Self {
                parent: parent.to_string(),
                child: child.to_string(),
            }),
            _ => Err(ShelfError::Config(format!(
                "field path '{s}' must have the form 'parent.child'"
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One declared mapping: `output` collects the `source` path's values.
/// Mappings are processed in declaration order, never alphabetically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub output: String,
    #[serde(rename = "path")]
    pub source: FieldPath,
}

impl FieldMapping {
    pub fn new(output: impl Into<String>, parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            source: FieldPath { parent: parent.into(), child: child.into() },
        }
    }
}

/// Flatten a document per the declared field map.
///
/// An object parent yields a singleton list of its child value; an array
/// parent yields the child values across all of its object elements,
/// skipping elements where the child is absent. Mappings sharing an
/// output accumulate into the same list. Parents used purely as sources
/// (never an output field themselves) are removed afterwards so nested
/// structures do not leak into the projection target.
pub fn flatten(doc: &Map<String, Value>, mappings: &[FieldMapping]) -> Map<String, Value> {
    let mut result = doc.clone();
    let mut outputs: Vec<(String, Vec<Value>)> = Vec::new();

    for mapping in mappings {
        let values = resolve(doc, &mapping.source);
        match outputs.iter_mut().find(|(name, _)| *name == mapping.output) {
            Some((_, list)) => list.extend(values),
            None => outputs.push((mapping.output.clone(), values)),
        }
    }

    for (name, list) in outputs {
        result.insert(name, Value::Array(list));
    }

    for mapping in mappings {
        let parent = &mapping.source.parent;
        let is_output = mappings.iter().any(|m| &m.output == parent);
        if !is_output {
            result.remove(parent);
        }
    }

    result
}

fn resolve(doc: &Map<String, Value>, path: &FieldPath) -> Vec<Value> {
    match doc.get(&path.parent) {
        Some(Value::Object(obj)) => obj.get(&path.child).cloned().into_iter().collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_object().and_then(|obj| obj.get(&path.child)))
            .cloned()
            .collect(),
        _ => Vec::new(),
    }
}

/// Remove any remaining fields whose values are objects or arrays
/// containing objects. Graph node properties must be scalars or scalar
/// lists; anything the field map did not flatten is dropped here.
pub fn strip_nested(doc: &Map<String, Value>) -> Map<String, Value> {
    doc.iter()
        .filter(|(_, value)| match value {
            Value::Object(_) => false,
            Value::Array(items) => !items.iter().any(Value::is_object),
            _ => true,
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
