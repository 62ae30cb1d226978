//! JSON to Bolt value conversion.
//!
//! Flattened documents arrive as `serde_json` values and leave as query
//! parameters. Null-valued fields are dropped during map conversion:
//! `SET n += row` treats a null as a property removal, and the mirror
//! never uses null to mean "erase".

use neo4rs::{BoltBoolean, BoltFloat, BoltInteger, BoltList, BoltMap, BoltNull, BoltString, BoltType};
use serde_json::{Map, Value};

pub fn value_to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull {}),
        Value::Bool(b) => BoltType::Boolean(BoltBoolean::new(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => BoltType::Integer(BoltInteger::new(i)),
            None => BoltType::Float(BoltFloat::new(n.as_f64().unwrap_or_default())),
        },
        Value::String(s) => BoltType::String(BoltString::new(s)),
        Value::Array(items) => {
            let mut list = BoltList::default();
            for item in items {
                list.push(value_to_bolt(item));
            }
            BoltType::List(list)
        }
        Value::Object(map) => BoltType::Map(map_to_bolt(map)),
    }
}

/// Convert an object to a Bolt map, dropping null-valued fields.
pub fn map_to_bolt(map: &Map<String, Value>) -> BoltMap {
    let mut bolt = BoltMap::default();
    for (key, value) in map {
        if value.is_null() {
            continue;
        }
        bolt.put(BoltString::new(key), value_to_bolt(value));
    }
    bolt
}

/// Build the `$rows` parameter for an UNWIND batch.
pub fn rows_to_bolt(rows: &[Map<String, Value>]) -> BoltType {
    let mut list = BoltList::default();
    for row in rows {
        list.push(BoltType::Map(map_to_bolt(row)));
    }
    BoltType::List(list)
}

/// A parameter map with a single entry.
pub fn single_param(key: &str, value: BoltType) -> BoltMap {
    let mut params = BoltMap::default();
    params.put(BoltString::new(key), value);
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_convert_to_matching_bolt_types() {
        assert_eq!(value_to_bolt(&json!(true)), BoltType::Boolean(BoltBoolean::new(true)));
        assert_eq!(value_to_bolt(&json!(42)), BoltType::Integer(BoltInteger::new(42)));
        assert_eq!(value_to_bolt(&json!(2.5)), BoltType::Float(BoltFloat::new(2.5)));
        assert_eq!(value_to_bolt(&json!("x")), BoltType::String(BoltString::new("x")));
    }

    #[test]
    fn arrays_become_lists() {
        let bolt = value_to_bolt(&json!(["Horror", "SciFi"]));
        let BoltType::List(list) = bolt else { panic!("expected list") };
        assert_eq!(list.value.len(), 2);
    }

    #[test]
    fn null_fields_are_dropped_from_maps() {
        let map = json!({"title": "Dune", "series": null});
        let bolt = map_to_bolt(map.as_object().unwrap());
        assert_eq!(bolt.value.len(), 1);
        assert!(bolt.value.contains_key(&BoltString::new("title")));
    }

    #[test]
    fn rows_param_holds_one_map_per_row() {
        let rows = vec![
            json!({"_id": "a"}).as_object().unwrap().clone(),
            json!({"_id": "b"}).as_object().unwrap().clone(),
        ];
        let BoltType::List(list) = rows_to_bolt(&rows) else { panic!("expected list") };
        assert_eq!(list.value.len(), 2);
    }
}
