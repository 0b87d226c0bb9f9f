//! Directory-backed key-value storage with atomic writes.
//!
//! Each key maps to one file inside the storage directory. Provides:
//! - **Atomicity**: values are written to a tmp file, fsynced, then renamed
//! - **Isolation**: an exclusive lock file serialises writers across processes
//! - **Quota**: an optional byte budget across all keys, reported as
//!   `StorageError::QuotaExceeded` like browser storage would

use clipref_core::storage::{KeyValueStorage, StorageError};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write as IoWrite};
use std::path::{Path, PathBuf};

use crate::paths::CliprefPaths;

const VALUE_EXTENSION: &str = "value";
const LOCK_FILE_NAME: &str = ".storage.lock";

#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
    quota_bytes: Option<usize>,
}

impl FileStorage {
    /// Creates a handle for `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            quota_bytes: None,
        }
    }

    /// Uses the platform data directory (e.g. `~/.local/share/clipref/storage`).
    pub fn default_location() -> Result<Self, StorageError> {
        let dir = CliprefPaths::storage_dir()
            .map_err(|e| StorageError::unavailable(e.to_string()))?;
        Ok(Self::new(dir))
    }

    pub fn with_quota(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Maps a storage key onto a safe file name.
    fn path_for(&self, key: &str) -> PathBuf {
        let file_stem: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.{}", file_stem, VALUE_EXTENSION))
    }

    fn temp_path_for(&self, path: &Path) -> PathBuf {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.dir.join(format!(".{}.tmp", file_name))
    }

    /// Total bytes stored under keys other than `exclude`.
    fn used_bytes_excluding(&self, exclude: &Path) -> Result<usize, StorageError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut total = 0usize;
        for entry in entries {
            let path = entry?.path();
            let is_value = path
                .extension()
                .is_some_and(|ext| ext == VALUE_EXTENSION);
            if is_value && path != exclude {
                total += fs::metadata(&path)?.len() as usize;
            }
        }
        Ok(total)
    }

    fn ensure_dir(&self) -> Result<(), StorageError> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.ensure_dir()?;
        let _lock = FileLock::acquire(&self.dir.join(LOCK_FILE_NAME))?;
        let path = self.path_for(key);

        if let Some(quota) = self.quota_bytes {
            let available = quota.saturating_sub(self.used_bytes_excluding(&path)?);
            if value.len() > available {
                return Err(StorageError::QuotaExceeded {
                    needed: value.len(),
                    available,
                });
            }
        }

        let tmp_path = self.temp_path_for(&path);
        if let Err(e) = write_atomically(&tmp_path, &path, value.as_bytes()) {
            let _ = fs::remove_file(&tmp_path);
            return Err(StorageError::from_write(e, value.len()));
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Writes `bytes` to `tmp_path`, fsyncs, then renames over `path`.
fn write_atomically(tmp_path: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp_file = File::create(tmp_path)?;
    tmp_file.write_all(bytes)?;
    tmp_file.sync_all()?;
    drop(tmp_file);
    fs::rename(tmp_path, path)
}

/// A file lock guard that releases the lock when dropped.
struct FileLock {
    #[allow(dead_code)]
    file: File,
}

impl FileLock {
    fn acquire(lock_path: &Path) -> Result<Self, StorageError> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path)?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive()
                .map_err(|e| StorageError::Io(format!("Failed to acquire lock: {}", e)))?;
        }

        Ok(FileLock { file })
    }
}
