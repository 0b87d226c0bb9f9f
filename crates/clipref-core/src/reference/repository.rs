//! Reference store trait.
//!
//! Defines the persistence contract for pinned references, decoupling the
//! tracking service from the concrete storage backend.

use serde::{Deserialize, Serialize};

use super::model::CopyReference;

/// Read-only snapshot of what the store currently holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub total_references: usize,
    /// Size of the serialized envelope in bytes.
    pub estimated_size: usize,
    pub last_updated: Option<i64>,
    /// Last applied schema version; 0 when nothing has been stored.
    pub version: u32,
}

/// Persistence for pinned references.
///
/// Client-local storage is unreliable (quota limits, disabled storage,
/// corrupted payloads), so none of these operations fail. Implementations
/// absorb and log problems and degrade to an empty store.
pub trait ReferenceStore: Send + Sync {
    /// Loads every persisted reference, newest first.
    fn load(&self) -> Vec<CopyReference>;

    /// Replaces the persisted set with `references`.
    fn save(&self, references: &[CopyReference]);

    /// Removes all persisted reference data.
    fn clear(&self);

    fn stats(&self) -> StorageStats;
}
