//! Pinned references and the copy metadata they are promoted from.

pub mod model;
pub mod repository;

pub use model::{CopyMetadata, CopyReference, SourceType, truncate_preview};
pub use repository::{ReferenceStore, StorageStats};
