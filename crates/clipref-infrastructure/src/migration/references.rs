//! Migrations for the persisted reference envelope.
//!
//! Every step accepts any JSON shape (current envelope, bare legacy array,
//! garbage) and yields a valid envelope for its target version.

use anyhow::Result;
use serde_json::Value;

use super::traits::{Migration, SchemaVersion, TypedMigration};
use crate::dto::storage_data::coerce_envelope;
use clipref_core::reference::truncate_preview;

/// Preview length used when backfilling pre-v2 entries.
const BACKFILL_PREVIEW_LENGTH: usize = 50;

/// v0 → v1: wraps the bare reference array in a versioned envelope.
#[derive(Debug, Default)]
pub struct LegacyArrayToEnvelopeMigration;

impl Migration for LegacyArrayToEnvelopeMigration {
    fn from_version(&self) -> SchemaVersion {
        0
    }

    fn to_version(&self) -> SchemaVersion {
        1
    }

    fn description(&self) -> &str {
        "Wrap bare reference array in a versioned envelope"
    }
}

impl TypedMigration<Value, Value> for LegacyArrayToEnvelopeMigration {
    fn migrate(&self, from: Value) -> Result<Value> {
        Ok(Value::Object(coerce_envelope(from, self.to_version())))
    }
}

/// v1 → v2: backfills `truncatedPreview` and drops `sessionId: null`.
#[derive(Debug, Default)]
pub struct PreviewBackfillMigration;

impl Migration for PreviewBackfillMigration {
    fn from_version(&self) -> SchemaVersion {
        1
    }

    fn to_version(&self) -> SchemaVersion {
        2
    }

    fn description(&self) -> &str {
        "Backfill truncatedPreview and normalise null sessionId"
    }
}

impl TypedMigration<Value, Value> for PreviewBackfillMigration {
    fn migrate(&self, from: Value) -> Result<Value> {
        let mut envelope = coerce_envelope(from, self.to_version());

        if let Some(Value::Array(references)) = envelope.get_mut("references") {
            for reference in references.iter_mut() {
                let Value::Object(entry) = reference else {
                    continue;
                };

                let has_preview = entry
                    .get("truncatedPreview")
                    .is_some_and(Value::is_string);
                if !has_preview {
                    if let Some(content) = entry.get("content").and_then(Value::as_str) {
                        let preview = truncate_preview(content, BACKFILL_PREVIEW_LENGTH);
                        entry.insert("truncatedPreview".to_string(), Value::String(preview));
                    }
                }

                if entry.get("sessionId").is_some_and(Value::is_null) {
                    entry.remove("sessionId");
                }
            }
        }

        Ok(Value::Object(envelope))
    }
}
