//! Hashing System - SHA-256 Schema Fingerprints
//!
//! Two template versions with the same fields in the same order share a
//! fingerprint, whatever ids and order numbers they were assigned.

use sha2::{Sha256, Digest};
use serde::Serialize;
use serde_json::{Value, to_string};

use crate::fields::FieldSchema;

/// Attributes that identify a field's placement rather than its schema.
const IDENTITY_KEYS: [&str; 3] = ["id", "templateId", "orderNo"];

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    let sorted = sort_value(&v);
    to_string(&sorted)
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let sorted_map: serde_json::Map<String, Value> = sorted
                .into_iter()
                .map(|(k, v)| (k.clone(), sort_value(v)))
                .collect();
            Value::Object(sorted_map)
        }
        Value::Array(arr) => {
            Value::Array(arr.iter().map(sort_value).collect())
        }
        _ => v.clone()
    }
}

/// Fingerprint an ordered field list, ignoring field identity and numbering.
pub fn schema_fingerprint(fields: &[FieldSchema]) -> Result<String, serde_json::Error> {
    let mut stripped = Vec::with_capacity(fields.len());
    for field in fields {
        let mut value = serde_json::to_value(field)?;
        if let Value::Object(map) = &mut value {
            for key in IDENTITY_KEYS {
                map.remove(key);
            }
        }
        stripped.push(value);
    }
    let canonical = canonical_json(&stripped)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldType;
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorted() {
        let obj = json!({"z": 1, "a": 2, "m": {"b": 1, "a": 2}});
        let canonical = canonical_json(&obj).unwrap();
        assert_eq!(canonical, r#"{"a":2,"m":{"a":2,"b":1},"z":1}"#);
    }

    #[test]
    fn test_hash_deterministic() {
        let data = b"test data";
        assert_eq!(sha256_hex(data), sha256_hex(data));
        assert_eq!(sha256_hex(data).len(), 64);
    }

    #[test]
    fn test_fingerprint_ignores_identity() {
        let field = FieldSchema::new("operator", "Operator", FieldType::Text);
        let a = vec![field.attach("f-1".into(), "t-1", 1)];
        let b = vec![field.attach("f-9".into(), "t-2", 10)];
        assert_eq!(schema_fingerprint(&a).unwrap(), schema_fingerprint(&b).unwrap());
    }

    #[test]
    fn test_fingerprint_tracks_schema() {
        let a = vec![FieldSchema::new("operator", "Operator", FieldType::Text)];
        let b = vec![FieldSchema {
            required: true,
            ..FieldSchema::new("operator", "Operator", FieldType::Text)
        }];
        assert_ne!(schema_fingerprint(&a).unwrap(), schema_fingerprint(&b).unwrap());
    }
}
