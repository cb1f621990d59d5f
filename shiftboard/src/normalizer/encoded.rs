//! Variant decoding of persisted values
//!
//! Historical snapshots store the same nested structure three ways: as a
//! materialized object, as a JSON document embedded in a string (sometimes
//! encoded twice and littered with escape artifacts), or as a bare id that
//! points into the report's own `employees` list. Everything in this module
//! is about telling those apart; nothing outside the normalizer sees them.

use crate::config::MAX_EMBEDDED_JSON_DEPTH;
use serde_json::{Map, Value};
use std::borrow::Cow;

/// A roster or reference entry, classified once
#[derive(Debug, Clone, PartialEq)]
pub enum Encoded<'a> {
    /// Already an object (or decoded from an embedded string)
    Record(Cow<'a, Map<String, Value>>),
    /// Bare id to resolve against the employee list
    Reference(String),
    /// `null`, `""` or anything carrying no data
    Empty,
}

impl<'a> Encoded<'a> {
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::Object(map) => Encoded::Record(Cow::Borrowed(map)),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Encoded::Empty;
                }
                match decode_embedded(trimmed) {
                    Some(Value::Object(map)) => Encoded::Record(Cow::Owned(map)),
                    Some(_) => Encoded::Empty,
                    None => match unquote_reference(trimmed) {
                        Some(id) => Encoded::Reference(id),
                        None => Encoded::Empty,
                    },
                }
            }
            Value::Number(n) => Encoded::Reference(n.to_string()),
            _ => Encoded::Empty,
        }
    }
}

/// View a value as a JSON container, decoding it first if it is a string.
pub fn materialize(value: &Value) -> Option<Cow<'_, Value>> {
    match value {
        Value::Object(_) | Value::Array(_) => Some(Cow::Borrowed(value)),
        Value::String(s) => decode_embedded(s).map(Cow::Owned),
        _ => None,
    }
}

/// Like [`materialize`] but only accepts objects
pub fn materialize_object(value: &Value) -> Option<Cow<'_, Map<String, Value>>> {
    match materialize(value)? {
        Cow::Borrowed(Value::Object(map)) => Some(Cow::Borrowed(map)),
        Cow::Owned(Value::Object(map)) => Some(Cow::Owned(map)),
        _ => None,
    }
}

/// Like [`materialize`] but only accepts arrays
pub fn materialize_array(value: &Value) -> Option<Cow<'_, [Value]>> {
    match materialize(value)? {
        Cow::Borrowed(Value::Array(items)) => Some(Cow::Borrowed(items.as_slice())),
        Cow::Owned(Value::Array(items)) => Some(Cow::Owned(items)),
        _ => None,
    }
}

/// Decode a JSON object or array embedded in a string.
///
/// Strings that decode to another string are unwrapped again (double
/// encoding), up to a fixed depth. When a layer fails to parse, stray
/// escape sequences are stripped and the parse is retried once.
pub fn decode_embedded(raw: &str) -> Option<Value> {
    let mut current = raw.trim().to_string();
    for _ in 0..MAX_EMBEDDED_JSON_DEPTH {
        if !looks_like_json(&current) {
            return None;
        }
        let parsed = serde_json::from_str::<Value>(&current)
            .or_else(|_| serde_json::from_str::<Value>(&strip_escape_artifacts(&current)))
            .ok()?;
        match parsed {
            Value::String(inner) => current = inner.trim().to_string(),
            Value::Object(_) | Value::Array(_) => return Some(parsed),
            _ => return None,
        }
    }
    None
}

/// Peel string-encoding layers off a bare id (`"\"5\""` is id `5`)
fn unquote_reference(raw: &str) -> Option<String> {
    let mut current = raw.trim().to_string();
    for _ in 0..MAX_EMBEDDED_JSON_DEPTH {
        if !current.starts_with('"') && !current.starts_with("\\\"") {
            break;
        }
        current = match serde_json::from_str::<Value>(&current) {
            Ok(Value::String(inner)) => inner.trim().to_string(),
            Ok(Value::Number(n)) => return Some(n.to_string()),
            Ok(_) => return None,
            Err(_) => strip_escape_artifacts(&current),
        };
    }
    if current.is_empty() || current.starts_with('"') {
        return None;
    }
    Some(current)
}

fn looks_like_json(s: &str) -> bool {
    matches!(s.chars().next(), Some('{') | Some('[') | Some('"'))
}

/// Remove escape debris left by repeated string encoding
pub fn strip_escape_artifacts(s: &str) -> String {
    let mut cleaned = s
        .trim()
        .replace("\\r\\n", "")
        .replace("\\n", "")
        .replace("\\r", "")
        .replace("\\t", "")
        .replace(['\r', '\n', '\t'], "")
        .replace("\\\"", "\"");

    if cleaned.len() >= 2 && cleaned.starts_with('"') && cleaned.ends_with('"') {
        cleaned = cleaned[1..cleaned.len() - 1].to_string();
    }
    cleaned
}

/// First present key among aliases
pub fn field<'m>(map: &'m Map<String, Value>, keys: &[&str]) -> Option<&'m Value> {
    keys.iter()
        .find_map(|key| map.get(*key).filter(|value| !value.is_null()))
}

/// Scalar as a trimmed string (numbers allowed)
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Scalar as a non-negative integer (numeric strings allowed)
pub fn scalar_usize(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_variants() {
        let object = json!({"employee_id": "1"});
        let embedded = json!("{\"EmployeeId\":\"2\"}");
        let id = json!("3");
        let number = json!(4);

        assert!(matches!(Encoded::classify(&object), Encoded::Record(Cow::Borrowed(_))));
        match Encoded::classify(&embedded) {
            Encoded::Record(map) => assert_eq!(map["EmployeeId"], "2"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(Encoded::classify(&id), Encoded::Reference("3".to_string()));
        assert_eq!(Encoded::classify(&number), Encoded::Reference("4".to_string()));
        assert_eq!(Encoded::classify(&json!(null)), Encoded::Empty);
        assert_eq!(Encoded::classify(&json!("  ")), Encoded::Empty);
    }

    #[test]
    fn test_string_encoded_ids_are_unwrapped() {
        let once = json!("\"5\"");
        let twice = json!(serde_json::to_string("\"6\"").unwrap());
        let escaped = json!("\\\"7\\\"");

        assert_eq!(Encoded::classify(&once), Encoded::Reference("5".to_string()));
        assert_eq!(Encoded::classify(&twice), Encoded::Reference("6".to_string()));
        assert_eq!(Encoded::classify(&escaped), Encoded::Reference("7".to_string()));
        assert_eq!(Encoded::classify(&json!("\"\"")), Encoded::Empty);
    }

    #[test]
    fn test_decode_double_encoded() {
        let inner = r#"{"Capacity":15}"#;
        let once = serde_json::to_string(inner).unwrap();
        let twice = serde_json::to_string(&once).unwrap();

        assert_eq!(decode_embedded(inner), Some(json!({"Capacity": 15})));
        assert_eq!(decode_embedded(&once), Some(json!({"Capacity": 15})));
        assert_eq!(decode_embedded(&twice), Some(json!({"Capacity": 15})));
    }

    #[test]
    fn test_decode_strips_artifacts() {
        let raw = "{\\r\\n  \\\"Capacity\\\": 12,\\n  \\\"AssignedEmployeeIds\\\": [\\\"1\\\"]\\r\\n}";
        assert_eq!(
            decode_embedded(raw),
            Some(json!({"Capacity": 12, "AssignedEmployeeIds": ["1"]}))
        );
    }

    #[test]
    fn test_decode_rejects_scalars_and_garbage() {
        assert_eq!(decode_embedded("42"), None);
        assert_eq!(decode_embedded("hello"), None);
        assert_eq!(decode_embedded("{broken"), None);
    }

    #[test]
    fn test_field_aliases_skip_null() {
        let map = json!({"Capacity": null, "capacity": 9});
        let map = map.as_object().unwrap();
        assert_eq!(field(map, &["Capacity", "capacity"]), Some(&json!(9)));
        assert_eq!(scalar_usize(&json!("12")), Some(12));
    }
}
