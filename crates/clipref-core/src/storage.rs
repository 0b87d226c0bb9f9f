//! Client-local key-value storage abstraction.
//!
//! Models the browser-style persistent storage the reference store writes to:
//! string keys, string values, and writes that may be refused for lack of
//! space. Implementations live in `clipref-infrastructure`.

use thiserror::Error;

/// Failures a key-value backend can report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Storage is absent, disabled, or refuses every operation.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A write would exceed the backend's capacity.
    #[error("Storage quota exceeded: {needed} bytes requested, {available} available")]
    QuotaExceeded { needed: usize, available: usize },

    /// Underlying I/O failure.
    #[error("Storage I/O error: {0}")]
    Io(String),

    /// A value could not be encoded for storage.
    #[error("Storage serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl StorageError {
    /// Maps a failed write of `needed` bytes.
    ///
    /// Out-of-space conditions become `QuotaExceeded` so callers can shed
    /// data and retry, the same way they would for a browser quota error.
    pub fn from_write(err: std::io::Error, needed: usize) -> Self {
        if is_out_of_space(err.kind()) {
            Self::QuotaExceeded {
                needed,
                available: 0,
            }
        } else {
            err.into()
        }
    }
}

fn is_out_of_space(kind: std::io::ErrorKind) -> bool {
    matches!(
        kind,
        std::io::ErrorKind::StorageFull | std::io::ErrorKind::QuotaExceeded
    )
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        if is_out_of_space(err.kind()) {
            return Self::QuotaExceeded {
                needed: 0,
                available: 0,
            };
        }
        Self::Io(format!("{} (kind: {:?})", err, err.kind()))
    }
}

/// String key-value storage with possible quota failures.
pub trait KeyValueStorage: Send + Sync {
    /// Reads a value. `Ok(None)` means the key is not present.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Writes a value, replacing any previous one.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes a key. Removing an absent key succeeds.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

impl<T: KeyValueStorage + ?Sized> KeyValueStorage for std::sync::Arc<T> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_disk_full_maps_to_quota_exceeded() {
        let err = StorageError::from_write(IoError::from(ErrorKind::StorageFull), 2048);
        assert_eq!(
            err,
            StorageError::QuotaExceeded {
                needed: 2048,
                available: 0
            }
        );

        let err = StorageError::from_write(IoError::from(ErrorKind::QuotaExceeded), 10);
        assert!(err.is_quota_exceeded());

        let err: StorageError = IoError::from(ErrorKind::StorageFull).into();
        assert!(err.is_quota_exceeded());
    }

    #[test]
    fn test_other_io_errors_stay_io() {
        let err = StorageError::from_write(IoError::from(ErrorKind::PermissionDenied), 10);
        assert!(matches!(err, StorageError::Io(_)));
        assert!(!err.is_quota_exceeded());
    }
}
