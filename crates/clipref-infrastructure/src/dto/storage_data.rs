//! Persisted envelope DTOs.
//!
//! The references key holds `{ version, references, lastUpdated }` as JSON.
//! Older installs stored a bare array of references (schema v0), and v1
//! envelopes may lack `truncatedPreview` on their entries.

use clipref_core::reference::CopyReference;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Schema version written by this build.
pub const CURRENT_STORAGE_VERSION: u32 = 2;

/// Envelope as written by the current schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageData {
    pub version: u32,
    pub references: Vec<CopyReference>,
    pub last_updated: i64,
}

impl StorageData {
    pub fn empty(version: u32) -> Self {
        Self {
            version,
            references: Vec::new(),
            last_updated: 0,
        }
    }
}

/// Envelope read leniently: entries stay raw so invalid ones can be dropped
/// one by one instead of failing the whole payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStorageData {
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub references: Vec<Value>,
    #[serde(default)]
    pub last_updated: Option<i64>,
}

impl RawStorageData {
    /// Reads any payload shape; a bare array is treated as the entry list.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(references) => Self {
                references,
                ..Self::default()
            },
            Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
            _ => Self::default(),
        }
    }

    /// Validates every entry, dropping malformed ones.
    pub fn into_references(self) -> (Vec<CopyReference>, usize) {
        let total = self.references.len();
        let valid: Vec<CopyReference> = self
            .references
            .into_iter()
            .filter_map(reference_from_value)
            .collect();
        let dropped = total - valid.len();
        (valid, dropped)
    }
}

/// Shape validator for a single persisted reference.
pub fn reference_from_value(value: Value) -> Option<CopyReference> {
    serde_json::from_value::<CopyReference>(value)
        .ok()
        .filter(CopyReference::is_valid)
}

/// Guesses the schema version of a payload that has no version marker.
pub fn infer_version(payload: &Value) -> u32 {
    match payload {
        Value::Array(_) => 0,
        Value::Object(map) => map
            .get("version")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(1),
        _ => 0,
    }
}

/// Coerces any payload into an envelope object stamped with `version`.
///
/// Accepts the current envelope, a bare legacy array, or garbage (which
/// becomes an empty envelope).
pub fn coerce_envelope(payload: Value, version: u32) -> Map<String, Value> {
    let (references, last_updated) = match payload {
        Value::Array(references) => {
            let newest = references
                .iter()
                .filter_map(|r| r.get("timestamp").and_then(Value::as_i64))
                .max()
                .unwrap_or(0);
            (references, newest)
        }
        Value::Object(mut map) => {
            let references = match map.remove("references") {
                Some(Value::Array(references)) => references,
                _ => Vec::new(),
            };
            let last_updated = map
                .get("lastUpdated")
                .and_then(Value::as_i64)
                .unwrap_or(0);
            (references, last_updated)
        }
        _ => (Vec::new(), 0),
    };

    let mut envelope = Map::new();
    envelope.insert("version".to_string(), Value::from(version));
    envelope.insert("references".to_string(), Value::Array(references));
    envelope.insert("lastUpdated".to_string(), Value::from(last_updated));
    envelope
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_reference(id: &str, ts: i64) -> Value {
        json!({
            "id": id,
            "sourceType": "agent-response",
            "content": "hello",
            "truncatedPreview": "hello",
            "timestamp": ts,
        })
    }

    #[test]
    fn test_infer_version() {
        assert_eq!(infer_version(&json!([])), 0);
        assert_eq!(infer_version(&json!({"references": []})), 1);
        assert_eq!(infer_version(&json!({"version": 2, "references": []})), 2);
        assert_eq!(infer_version(&json!("garbage")), 0);
    }

    #[test]
    fn test_coerce_envelope_shapes() {
        let from_array = coerce_envelope(json!([raw_reference("a", 5), raw_reference("b", 9)]), 1);
        assert_eq!(from_array["version"], 1);
        assert_eq!(from_array["references"].as_array().unwrap().len(), 2);
        assert_eq!(from_array["lastUpdated"], 9);

        let from_object = coerce_envelope(
            json!({"version": 1, "references": [raw_reference("a", 5)], "lastUpdated": 77}),
            2,
        );
        assert_eq!(from_object["version"], 2);
        assert_eq!(from_object["lastUpdated"], 77);

        let from_garbage = coerce_envelope(json!(42), 1);
        assert!(from_garbage["references"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_into_references_drops_invalid() {
        let raw = RawStorageData::from_value(json!({
            "version": 2,
            "references": [
                raw_reference("ok", 1),
                {"id": "missing-fields"},
                {
                    "id": "bad-source", "sourceType": "robot",
                    "content": "x", "truncatedPreview": "x", "timestamp": 1
                },
                {
                    "id": "", "sourceType": "code-block",
                    "content": "x", "truncatedPreview": "x", "timestamp": 1
                },
                {
                    "id": "neg-index", "sourceType": "code-block", "agentIndex": -1,
                    "content": "x", "truncatedPreview": "x", "timestamp": 1
                },
            ],
            "lastUpdated": 1,
        }));

        let (references, dropped) = raw.into_references();
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].id, "ok");
        assert_eq!(dropped, 4);
    }

    #[test]
    fn test_storage_data_wire_shape() {
        let data = StorageData::empty(CURRENT_STORAGE_VERSION);
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json, json!({"version": 2, "references": [], "lastUpdated": 0}));
    }
}
