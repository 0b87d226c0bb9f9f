use anyhow::{Context, Result};
use clipref_application::CopyTrackingService;
use clipref_core::config::TrackingConfig;
use clipref_infrastructure::{CliprefPaths, FileStorage, LocalReferenceStore};
use std::path::{Path, PathBuf};

/// Resolved configuration and storage backend shared by every command.
pub struct CliContext {
    pub config: TrackingConfig,
    pub storage: FileStorage,
}

impl CliContext {
    pub fn resolve(data_dir: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<Self> {
        let config = match config_path {
            Some(path) => TrackingConfig::load(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => match CliprefPaths::config_file() {
                Ok(path) => TrackingConfig::load_or_default(&path),
                Err(e) => {
                    tracing::debug!("No config directory ({}), using defaults", e);
                    TrackingConfig::default()
                }
            },
        };

        let storage = match data_dir {
            Some(dir) => FileStorage::new(dir),
            None => FileStorage::default_location().context("Failed to resolve data directory")?,
        };

        Ok(Self { config, storage })
    }

    pub fn data_dir(&self) -> &Path {
        self.storage.dir()
    }

    pub fn store(&self) -> LocalReferenceStore<FileStorage> {
        LocalReferenceStore::new(self.storage.clone(), self.config.store.clone())
    }

    /// Service over the on-disk store, scoped to `session`.
    pub fn service(&self, session: Option<&str>) -> CopyTrackingService {
        let service = CopyTrackingService::builder()
            .with_config(self.config.clone())
            .with_store(self.store())
            .build();
        service.set_session(session);
        service
    }
}
