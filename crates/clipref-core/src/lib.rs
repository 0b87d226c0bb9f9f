//! Domain layer for clipref: copy metadata, references, highlights,
//! copy source detection and the abstractions the services depend on.

pub mod clock;
pub mod config;
pub mod detection;
pub mod error;
pub mod hash;
pub mod highlight;
pub mod reference;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{HighlightConfig, StoreConfig, TrackingConfig};
pub use error::{CliprefError, Result};
pub use highlight::{HighlightInfo, HighlightType};
pub use reference::{CopyMetadata, CopyReference, ReferenceStore, SourceType, StorageStats};
pub use storage::{KeyValueStorage, StorageError};
