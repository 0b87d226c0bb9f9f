//! Migration registry for managing linear migration chains.
//!
//! Each version must migrate through all intermediate versions. This favours
//! safety and debuggability over performance; chains here are a handful of
//! steps at most.

use super::traits::{MigrationChain, SchemaVersion, TypedMigration};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Registry holding an ordered, continuous chain of migrations:
/// v0 → v1 → v2 → ...
///
/// `register()` validates that each new migration starts where the previous
/// one ended.
#[derive(Debug)]
pub struct MigrationRegistry<T> {
    /// Migrations in order, forming a linear chain.
    migrations: Vec<Arc<dyn TypedMigration<T, T>>>,
    /// The latest version this registry can migrate to.
    latest_version: SchemaVersion,
}

impl<T> MigrationRegistry<T> {
    /// Creates an empty registry targeting `latest_version`.
    pub fn new(latest_version: SchemaVersion) -> Self {
        Self {
            migrations: Vec::new(),
            latest_version,
        }
    }

    /// Registers a single migration, validating chain continuity.
    ///
    /// # Panics
    ///
    /// Panics if the migration doesn't connect to the existing chain or
    /// targets a version beyond `latest_version`. Both are programmer errors.
    pub fn register(&mut self, migration: Arc<dyn TypedMigration<T, T>>) {
        if let Some(last) = self.migrations.last() {
            assert_eq!(
                last.to_version(),
                migration.from_version(),
                "Migration chain broken: expected migration from v{} (previous to_version), \
                 but got migration from v{}. Description: '{}' (previous) -> '{}' (current)",
                last.to_version(),
                migration.from_version(),
                last.description(),
                migration.description()
            );
        }

        if migration.to_version() > self.latest_version {
            panic!(
                "Migration target version v{} exceeds registry's latest version v{}",
                migration.to_version(),
                self.latest_version
            );
        }

        self.migrations.push(migration);
    }

    /// Registers multiple migrations at once, in order.
    ///
    /// # Panics
    ///
    /// Panics if any migration breaks the chain continuity.
    pub fn register_all(&mut self, migrations: Vec<Arc<dyn TypedMigration<T, T>>>) {
        for migration in migrations {
            self.register(migration);
        }
    }

    pub fn latest_version(&self) -> SchemaVersion {
        self.latest_version
    }

    /// Returns the starting version of the first migration, if any.
    pub fn start_version(&self) -> Option<SchemaVersion> {
        self.migrations.first().map(|m| m.from_version())
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    fn find_start_index(&self, from_version: SchemaVersion) -> Option<usize> {
        self.migrations.iter().position(|m| m.can_migrate(from_version))
    }
}

impl<T> MigrationChain<T> for MigrationRegistry<T> {
    fn migrate_to_latest(&self, mut data: T, current_version: SchemaVersion) -> Result<T> {
        if current_version == self.latest_version {
            tracing::debug!(
                "Data is already at the latest version (v{}), no migration needed",
                current_version
            );
            return Ok(data);
        }

        if current_version > self.latest_version {
            anyhow::bail!(
                "Data version (v{}) is newer than the latest supported version (v{})",
                current_version,
                self.latest_version
            );
        }

        let start_idx = self.find_start_index(current_version).ok_or_else(|| {
            let available: Vec<String> = self
                .migrations
                .iter()
                .map(|m| format!("v{} -> v{}", m.from_version(), m.to_version()))
                .collect();
            anyhow::anyhow!(
                "No migration found starting from version v{}. Available migrations: [{}]",
                current_version,
                available.join(", ")
            )
        })?;

        let steps = self.migrations.len() - start_idx;
        tracing::info!(
            "Starting migration from v{} to v{} ({} steps)",
            current_version,
            self.latest_version,
            steps
        );

        for (i, migration) in self.migrations[start_idx..].iter().enumerate() {
            tracing::info!(
                "Migration step {}/{}: v{} -> v{} ({})",
                i + 1,
                steps,
                migration.from_version(),
                migration.to_version(),
                migration.description()
            );

            data = migration.migrate(data).with_context(|| {
                format!(
                    "Migration failed at step {}: v{} -> v{}",
                    i + 1,
                    migration.from_version(),
                    migration.to_version()
                )
            })?;
        }

        tracing::info!(
            "Migration completed successfully: v{} -> v{}",
            current_version,
            self.latest_version
        );

        Ok(data)
    }

    fn available_paths(&self, from: SchemaVersion) -> Vec<Vec<SchemaVersion>> {
        match self.find_start_index(from) {
            Some(start_idx) => {
                let mut path = vec![from];
                path.extend(self.migrations[start_idx..].iter().map(|m| m.to_version()));
                vec![path]
            }
            None => vec![],
        }
    }
}
