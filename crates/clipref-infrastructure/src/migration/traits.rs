//! Core traits for the migration framework.
//!
//! Schema versions of the persisted envelope are plain integers, matching the
//! integer stored under the version key.

use anyhow::Result;

/// Integer schema version of persisted data.
pub type SchemaVersion = u32;

/// Base trait for all migrations.
///
/// Provides version information and metadata about a migration step.
pub trait Migration: Send + Sync {
    /// Returns the source version this migration starts from.
    fn from_version(&self) -> SchemaVersion;

    /// Returns the target version this migration produces.
    fn to_version(&self) -> SchemaVersion;

    /// Checks if this migration can be applied to the given version.
    fn can_migrate(&self, version: SchemaVersion) -> bool {
        version == self.from_version()
    }

    /// Returns a human-readable description of this migration.
    ///
    /// Used for logging and debugging purposes.
    fn description(&self) -> &str;
}

/// Typed migration that transforms data from one version to another.
pub trait TypedMigration<From, To>: Migration + std::fmt::Debug {
    /// Executes the migration, transforming data from the source to target format.
    ///
    /// # Errors
    ///
    /// Returns an error if the migration cannot be completed successfully.
    fn migrate(&self, from: From) -> Result<To>;
}

/// A chain of migrations that can automatically upgrade data to the latest version.
///
/// Implementations traverse all intermediate steps in order; no step is skipped.
pub trait MigrationChain<T> {
    /// Migrates data from `current_version` to the latest version.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No migration path exists from the current version to the latest
    /// - Any migration in the chain fails
    fn migrate_to_latest(&self, data: T, current_version: SchemaVersion) -> Result<T>;

    /// Returns the version sequence data at `from` would pass through.
    ///
    /// Linear chains have exactly one path; an empty result means no path.
    fn available_paths(&self, from: SchemaVersion) -> Vec<Vec<SchemaVersion>>;
}
