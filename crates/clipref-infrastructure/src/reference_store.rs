//! Persistent reference store over client-local key-value storage.
//!
//! Layout (two keys, names from `StoreConfig`):
//! - references key → JSON envelope `{version, references, lastUpdated}`
//! - version key → plain integer string, the last applied schema version
//!
//! Every operation degrades instead of failing: unavailable storage reads as
//! empty, quota failures trim and finally wipe, corrupt entries are dropped.

use clipref_core::clock::{Clock, SystemClock};
use clipref_core::config::StoreConfig;
use clipref_core::reference::{CopyReference, ReferenceStore, StorageStats};
use clipref_core::storage::{KeyValueStorage, StorageError};
use serde_json::Value;
use std::sync::Arc;

use crate::dto::storage_data::{
    CURRENT_STORAGE_VERSION, RawStorageData, StorageData, infer_version,
};
use crate::migration::{MigrationChain, MigrationRegistry, build_reference_registry};

/// Bytes reserved for the envelope fields around the reference array.
const ENVELOPE_OVERHEAD_BYTES: usize = 64;

pub struct LocalReferenceStore<S: KeyValueStorage> {
    storage: S,
    config: StoreConfig,
    migrations: MigrationRegistry<Value>,
    clock: Arc<dyn Clock>,
}

impl<S: KeyValueStorage> LocalReferenceStore<S> {
    pub fn new(storage: S, config: StoreConfig) -> Self {
        Self {
            storage,
            config,
            migrations: build_reference_registry(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the migration chain (used to exercise failure handling).
    pub fn with_migrations(mut self, migrations: MigrationRegistry<Value>) -> Self {
        self.migrations = migrations;
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn read_version_marker(&self) -> Option<u32> {
        match self.storage.get_item(&self.config.version_key) {
            Ok(Some(raw)) => raw.trim().parse().ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::debug!("Failed to read storage version marker: {}", e);
                None
            }
        }
    }

    /// Validates, orders newest-first and caps the input.
    fn prepare(&self, references: &[CopyReference]) -> Vec<CopyReference> {
        let mut prepared: Vec<CopyReference> = references
            .iter()
            .filter(|r| r.is_valid())
            .cloned()
            .collect();
        prepared.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        prepared.truncate(self.config.max_references);
        prepared
    }

    /// Drops the oldest entries until the envelope fits the soft size budget.
    fn fit_budget(&self, mut references: Vec<CopyReference>) -> Vec<CopyReference> {
        let budget = self
            .config
            .max_storage_bytes
            .saturating_sub(ENVELOPE_OVERHEAD_BYTES);
        let mut used = 0usize;
        let mut keep = 0usize;

        for reference in &references {
            let size = serde_json::to_string(reference).map(|s| s.len() + 1).unwrap_or(0);
            if used + size > budget {
                break;
            }
            used += size;
            keep += 1;
        }

        if keep < references.len() {
            tracing::warn!(
                "Reference payload exceeds {} bytes, keeping {} of {} references",
                self.config.max_storage_bytes,
                keep,
                references.len()
            );
            references.truncate(keep);
        }
        references
    }

    fn write(&self, references: &[CopyReference]) -> Result<(), StorageError> {
        let envelope = StorageData {
            version: CURRENT_STORAGE_VERSION,
            references: references.to_vec(),
            last_updated: self.clock.now_ms(),
        };
        let serialized = serde_json::to_string(&envelope)?;
        self.storage
            .set_item(&self.config.references_key, &serialized)?;
        self.storage.set_item(
            &self.config.version_key,
            &CURRENT_STORAGE_VERSION.to_string(),
        )?;
        Ok(())
    }

    /// Removes both keys, logging rather than returning failures.
    fn wipe(&self) {
        for key in [&self.config.references_key, &self.config.version_key] {
            if let Err(e) = self.storage.remove_item(key) {
                tracing::warn!("Failed to remove storage key '{}': {}", key, e);
            }
        }
    }

    /// Parses, migrates and validates the stored payload.
    fn read_references(&self) -> Vec<CopyReference> {
        let raw = match self.storage.get_item(&self.config.references_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!("Reference storage unavailable, starting empty: {}", e);
                return Vec::new();
            }
        };

        let payload: Value = match serde_json::from_str(&raw) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Stored references are not valid JSON, ignoring: {}", e);
                return Vec::new();
            }
        };

        let stored_version = if payload.is_array() {
            0
        } else {
            self.read_version_marker()
                .unwrap_or_else(|| infer_version(&payload))
        };

        let (payload, migrated) = if stored_version < CURRENT_STORAGE_VERSION {
            match self.migrations.migrate_to_latest(payload, stored_version) {
                Ok(migrated) => (migrated, true),
                Err(e) => {
                    tracing::error!(
                        "Reference migration from v{} failed, starting empty: {:#}",
                        stored_version,
                        e
                    );
                    return Vec::new();
                }
            }
        } else {
            if stored_version > CURRENT_STORAGE_VERSION {
                tracing::warn!(
                    "Stored references use newer schema v{} (current v{}), reading best effort",
                    stored_version,
                    CURRENT_STORAGE_VERSION
                );
            }
            (payload, false)
        };

        let (mut references, dropped) = RawStorageData::from_value(payload).into_references();
        if dropped > 0 {
            tracing::warn!("Dropped {} malformed stored references", dropped);
        }
        references.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        if migrated {
            tracing::info!(
                "Re-saving {} references after migration to v{}",
                references.len(),
                CURRENT_STORAGE_VERSION
            );
            self.save(&references);
        }

        references
    }
}

impl<S: KeyValueStorage> ReferenceStore for LocalReferenceStore<S> {
    fn load(&self) -> Vec<CopyReference> {
        let references = self.read_references();
        tracing::debug!("Loaded {} references from storage", references.len());
        references
    }

    fn save(&self, references: &[CopyReference]) {
        let prepared = self.fit_budget(self.prepare(references));

        match self.write(&prepared) {
            Ok(()) => {
                tracing::debug!("Saved {} references", prepared.len());
            }
            Err(e) if e.is_quota_exceeded() => {
                let keep = self.config.emergency_references.min(prepared.len());
                tracing::warn!(
                    "Storage quota exceeded saving {} references, retrying with {}: {}",
                    prepared.len(),
                    keep,
                    e
                );
                if let Err(e) = self.write(&prepared[..keep]) {
                    tracing::error!(
                        "Emergency save failed, clearing reference storage: {}",
                        e
                    );
                    self.wipe();
                }
            }
            Err(e) => {
                tracing::warn!("Failed to persist references: {}", e);
            }
        }
    }

    fn clear(&self) {
        self.wipe();
        tracing::debug!("Cleared reference storage");
    }

    fn stats(&self) -> StorageStats {
        let version = self.read_version_marker();
        let raw = match self.storage.get_item(&self.config.references_key) {
            Ok(Some(raw)) => raw,
            Ok(None) | Err(_) => {
                return StorageStats {
                    version: version.unwrap_or(0),
                    ..StorageStats::default()
                };
            }
        };

        let payload: Value = serde_json::from_str(&raw).unwrap_or(Value::Null);
        let version = version.unwrap_or_else(|| infer_version(&payload));
        let envelope = RawStorageData::from_value(payload);

        StorageStats {
            total_references: envelope.references.len(),
            estimated_size: raw.len(),
            last_updated: envelope.last_updated,
            version,
        }
    }
}
