//! Unified path management for clipref files.
//!
//! ```text
//! ~/.config/clipref/           # Config directory
//! └── config.toml              # TrackingConfig overrides
//!
//! ~/.local/share/clipref/      # Data directory
//! └── storage/                 # FileStorage keys (one file per key)
//! ```

use std::path::PathBuf;
use thiserror::Error;

const APP_DIR: &str = "clipref";

/// Errors that can occur during path resolution.
#[derive(Debug, Error)]
pub enum PathError {
    /// The platform directory could not be determined.
    #[error("Cannot find {0} directory")]
    DirNotFound(&'static str),
}

pub struct CliprefPaths;

impl CliprefPaths {
    /// Returns the clipref configuration directory.
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::DirNotFound("config"))
    }

    /// Returns the clipref data directory.
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::DirNotFound("data"))
    }

    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Directory backing the default `FileStorage`.
    pub fn storage_dir() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("storage"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_namespaced() {
        if let Ok(file) = CliprefPaths::config_file() {
            assert!(file.ends_with("clipref/config.toml"));
        }
        if let Ok(dir) = CliprefPaths::storage_dir() {
            assert!(dir.ends_with("clipref/storage"));
        }
    }
}
