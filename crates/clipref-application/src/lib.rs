//! Application layer for clipref: the tracking service and everything it
//! composes (highlight lifecycle, copy event fan-out, timer scheduling).

pub mod copy_events;
pub mod driver;
pub mod highlight_manager;
pub mod logging;
pub mod scheduler;
pub mod tracking_service;

pub use copy_events::{CopyEvent, CopyEventHub, CopyListener, CopySubscription};
pub use driver::{DEFAULT_TICK_PERIOD, spawn_tick_driver};
pub use highlight_manager::{HighlightManager, HighlightTick};
pub use logging::init_tracing;
pub use scheduler::{TimerId, TimerQueue};
pub use tracking_service::{CopyTrackingService, CopyTrackingServiceBuilder, TickReport};
