//! Schema migration framework for persisted references.
//!
//! Provides a linear, forward-only chain of migrations over the raw JSON
//! payload. The framework ensures that:
//!
//! - All migrations are executed in order (no skipping)
//! - A broken chain is caught at registration time
//! - Migration paths are transparent and debuggable
//!
//! ```text
//!   v0 (bare array) ──► v1 (envelope) ──► v2 (previews backfilled)
//!        LegacyArrayToEnvelope   PreviewBackfill
//! ```
//!
//! # Adding a New Version
//!
//! 1. Bump `CURRENT_STORAGE_VERSION` in `dto::storage_data`
//! 2. Implement `Migration` and `TypedMigration<Value, Value>` in `references.rs`,
//!    accepting any input shape
//! 3. Register it at the end of `build_reference_registry()`

mod references;
mod registry;
mod traits;

pub use references::{LegacyArrayToEnvelopeMigration, PreviewBackfillMigration};
pub use registry::MigrationRegistry;
pub use traits::{Migration, MigrationChain, SchemaVersion, TypedMigration};

use crate::dto::storage_data::CURRENT_STORAGE_VERSION;
use serde_json::Value;
use std::sync::Arc;

/// Builds the registry that upgrades any stored payload to the current schema.
pub fn build_reference_registry() -> MigrationRegistry<Value> {
    let mut registry = MigrationRegistry::new(CURRENT_STORAGE_VERSION);
    registry.register_all(vec![
        Arc::new(LegacyArrayToEnvelopeMigration),
        Arc::new(PreviewBackfillMigration),
    ]);
    registry
}
