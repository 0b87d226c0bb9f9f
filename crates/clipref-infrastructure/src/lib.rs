//! Infrastructure layer for clipref: storage backends, the persisted
//! reference store and its schema migrations.

pub mod dto;
pub mod migration;
pub mod paths;
pub mod reference_store;
pub mod storage;

pub use crate::paths::CliprefPaths;
pub use crate::reference_store::LocalReferenceStore;
pub use crate::storage::{FileStorage, MemoryStorage};
