//! Background tick driver.
//!
//! Timers are lazy: state is brought up to date whenever the service is read.
//! Hosts that render highlights without reading (or that want expired copies
//! dropped promptly) spawn this driver on their tokio runtime.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use crate::tracking_service::CopyTrackingService;

/// Default driver period; fine enough for the 3s/4s highlight transitions.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(250);

/// Spawns a task that calls [`CopyTrackingService::tick`] every `period`.
///
/// The task runs until the returned handle is aborted.
///
/// # Arguments
///
/// * `service` - Service whose timers should be driven
/// * `period` - Interval between ticks; must be non-zero
pub fn spawn_tick_driver(service: CopyTrackingService, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::debug!(target: "clipref_driver", "Tick driver started ({:?} period)", period);

        loop {
            ticker.tick().await;
            let report = service.tick();
            if !report.is_empty() {
                tracing::debug!(
                    target: "clipref_driver",
                    "Tick: {} copies expired, {} faded, {} removed, {} swept",
                    report.expired_copies,
                    report.highlights.faded,
                    report.highlights.removed,
                    report.highlights.swept
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipref_core::clock::ManualClock;
    use clipref_core::highlight::HighlightType;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_driver_fires_highlight_transitions() {
        let clock = Arc::new(ManualClock::new(0));
        let service = CopyTrackingService::builder()
            .with_clock(clock.clone())
            .build();
        let manager = service.highlight_manager().clone();
        service.add_highlight("text", HighlightType::Copy, None);

        let handle = spawn_tick_driver(service, Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(manager.pending_timers(), 3);

        // Move the domain clock past end_time and let the driver observe it
        // without any read going through the manager first.
        clock.advance(4_000);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(manager.pending_timers(), 1);

        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
    }
}
