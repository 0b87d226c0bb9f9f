//! Data transfer objects for persisted state.

pub mod storage_data;

pub use storage_data::{CURRENT_STORAGE_VERSION, RawStorageData, StorageData};
