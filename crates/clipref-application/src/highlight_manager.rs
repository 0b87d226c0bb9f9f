//! Highlight lifecycle manager.
//!
//! Tracks "recently copied" highlights through Active → Fading → removed.
//! Each highlight owns two timers (fade start and removal); a periodic sweep
//! drops anything that outlived its `end_time` by more than the grace period
//! in case a timer was lost. Due timers fire on `tick()` and before every
//! read, so accessors always reflect the current clock.

use clipref_core::clock::{Clock, SystemClock};
use clipref_core::config::HighlightConfig;
use clipref_core::hash::content_hash;
use clipref_core::highlight::{HighlightInfo, HighlightType};
use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::scheduler::{TimerId, TimerQueue};

static GLOBAL: Lazy<Arc<HighlightManager>> = Lazy::new(|| {
    Arc::new(HighlightManager::new(
        Arc::new(SystemClock),
        HighlightConfig::default(),
    ))
});

#[derive(Debug)]
enum HighlightTimer {
    Fade(String),
    Remove(String),
    Sweep,
}

#[derive(Debug)]
struct TrackedHighlight {
    info: HighlightInfo,
    fade_timer: TimerId,
    remove_timer: TimerId,
}

#[derive(Debug, Default)]
struct HighlightState {
    /// Insertion order.
    highlights: Vec<TrackedHighlight>,
    timers: TimerQueue<HighlightTimer>,
    sweep_timer: Option<TimerId>,
}

impl HighlightState {
    fn take_at(&mut self, index: usize) -> HighlightInfo {
        let tracked = self.highlights.remove(index);
        self.timers.cancel(tracked.fade_timer);
        self.timers.cancel(tracked.remove_timer);
        tracked.info
    }

    fn remove_where<F>(&mut self, pred: F) -> usize
    where
        F: Fn(&HighlightInfo) -> bool,
    {
        let mut removed = 0;
        let mut i = 0;
        while i < self.highlights.len() {
            if pred(&self.highlights[i].info) {
                self.take_at(i);
                removed += 1;
            } else {
                i += 1;
            }
        }
        removed
    }
}

/// What a `tick()` changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HighlightTick {
    pub faded: usize,
    pub removed: usize,
    pub swept: usize,
}

impl HighlightTick {
    pub fn is_empty(&self) -> bool {
        self.faded == 0 && self.removed == 0 && self.swept == 0
    }
}

pub struct HighlightManager {
    clock: Arc<dyn Clock>,
    config: HighlightConfig,
    state: Mutex<HighlightState>,
}

impl HighlightManager {
    pub fn new(clock: Arc<dyn Clock>, config: HighlightConfig) -> Self {
        let manager = Self {
            clock,
            config,
            state: Mutex::new(HighlightState::default()),
        };
        {
            let mut state = manager.lock();
            manager.ensure_sweep(&mut state);
        }
        manager
    }

    /// Process-wide instance on the system clock, created on first use.
    pub fn global() -> Arc<HighlightManager> {
        GLOBAL.clone()
    }

    pub fn config(&self) -> &HighlightConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, HighlightState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_sweep(&self, state: &mut HighlightState) {
        if state.sweep_timer.is_none() {
            let deadline = self.clock.now_ms() + self.config.sweep_interval_ms;
            state.sweep_timer = Some(state.timers.schedule(deadline, HighlightTimer::Sweep));
        }
    }

    /// Fires every timer due at the current time.
    fn advance(&self, state: &mut HighlightState) -> HighlightTick {
        let now = self.clock.now_ms();
        let mut tick = HighlightTick::default();

        for (_, timer) in state.timers.drain_due(now) {
            match timer {
                HighlightTimer::Fade(id) => {
                    if let Some(tracked) = state.highlights.iter_mut().find(|h| h.info.id == id) {
                        tracked.info.start_fading();
                        tick.faded += 1;
                    }
                }
                HighlightTimer::Remove(id) => {
                    if let Some(index) = state.highlights.iter().position(|h| h.info.id == id) {
                        state.take_at(index);
                        tick.removed += 1;
                    }
                }
                HighlightTimer::Sweep => {
                    let grace = self.config.sweep_grace_ms;
                    tick.swept += state.remove_where(|info| info.is_stale(now, grace));
                    if tick.swept > 0 {
                        tracing::debug!("Highlight sweep removed {} stale highlights", tick.swept);
                    }
                    state.sweep_timer = None;
                    self.ensure_sweep(state);
                }
            }
        }

        tick
    }

    /// Highlights `content`, replacing any highlight already shown for it.
    pub fn add_highlight(
        &self,
        content: &str,
        highlight_type: HighlightType,
        element_id: Option<String>,
    ) -> HighlightInfo {
        let mut state = self.lock();
        self.advance(&mut state);
        self.ensure_sweep(&mut state);

        let hash = content_hash(content);
        state.remove_where(|info| info.content_hash == hash);

        let info = HighlightInfo::new(
            content,
            highlight_type,
            element_id,
            self.clock.now_ms(),
            &self.config,
        );
        let fade_timer = state
            .timers
            .schedule(info.fade_start_time, HighlightTimer::Fade(info.id.clone()));
        let remove_timer = state
            .timers
            .schedule(info.end_time, HighlightTimer::Remove(info.id.clone()));

        tracing::debug!(
            "Added {:?} highlight {} (hash {})",
            highlight_type,
            info.id,
            info.content_hash
        );

        state.highlights.push(TrackedHighlight {
            info: info.clone(),
            fade_timer,
            remove_timer,
        });
        info
    }

    /// Removes a highlight and cancels its timers.
    pub fn remove_highlight(&self, id: &str) -> bool {
        let mut state = self.lock();
        self.advance(&mut state);
        match state.highlights.iter().position(|h| h.info.id == id) {
            Some(index) => {
                state.take_at(index);
                true
            }
            None => false,
        }
    }

    /// Removes every highlight whose content hash matches `content`.
    pub fn remove_highlight_by_content(&self, content: &str) -> bool {
        let mut state = self.lock();
        self.advance(&mut state);
        let hash = content_hash(content);
        state.remove_where(|info| info.content_hash == hash) > 0
    }

    pub fn get_all_highlights(&self) -> Vec<HighlightInfo> {
        let mut state = self.lock();
        self.advance(&mut state);
        state.highlights.iter().map(|h| h.info.clone()).collect()
    }

    pub fn get_highlights_by_type(&self, highlight_type: HighlightType) -> Vec<HighlightInfo> {
        let mut state = self.lock();
        self.advance(&mut state);
        state
            .highlights
            .iter()
            .filter(|h| h.info.highlight_type == highlight_type)
            .map(|h| h.info.clone())
            .collect()
    }

    pub fn get_highlights_for_content(&self, content: &str) -> Vec<HighlightInfo> {
        let mut state = self.lock();
        self.advance(&mut state);
        let hash = content_hash(content);
        state
            .highlights
            .iter()
            .filter(|h| h.info.content_hash == hash)
            .map(|h| h.info.clone())
            .collect()
    }

    pub fn is_content_highlighted(&self, content: &str) -> bool {
        !self.get_highlights_for_content(content).is_empty()
    }

    /// Drops every highlight and its timers. The sweep keeps running.
    pub fn clear_all_highlights(&self) {
        let mut state = self.lock();
        let cleared = state.remove_where(|_| true);
        if cleared > 0 {
            tracing::debug!("Cleared {} highlights", cleared);
        }
    }

    /// Cancels every outstanding timer, including the sweep.
    ///
    /// The manager stays usable; the next `add_highlight` re-arms the sweep.
    pub fn destroy(&self) {
        let mut state = self.lock();
        state.highlights.clear();
        state.timers.clear();
        state.sweep_timer = None;
    }

    /// Fires due timers without reading state.
    pub fn tick(&self) -> HighlightTick {
        let mut state = self.lock();
        self.advance(&mut state)
    }

    /// Number of pending timers, sweep included.
    pub fn pending_timers(&self) -> usize {
        self.lock().timers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipref_core::clock::ManualClock;

    fn manager() -> (Arc<ManualClock>, HighlightManager) {
        let clock = Arc::new(ManualClock::new(10_000));
        let manager = HighlightManager::new(clock.clone(), HighlightConfig::default());
        (clock, manager)
    }

    #[test]
    fn test_decay_timing() {
        let (clock, manager) = manager();
        let info = manager.add_highlight("copied text", HighlightType::Copy, None);

        clock.advance(1_000);
        let all = manager.get_all_highlights();
        assert_eq!(all.len(), 1);
        assert!(all[0].is_active);
        assert!(!all[0].is_fading);

        clock.advance(2_100);
        let all = manager.get_all_highlights();
        assert!(all[0].is_fading);
        assert_eq!(all[0].id, info.id);

        clock.advance(1_000);
        assert!(manager.get_all_highlights().is_empty());
        assert!(!manager.is_content_highlighted("copied text"));
    }

    #[test]
    fn test_single_highlight_per_content() {
        let (clock, manager) = manager();
        let first = manager.add_highlight("same", HighlightType::Copy, None);
        clock.advance(500);
        let second = manager.add_highlight("same", HighlightType::Paste, Some("el".into()));

        let matches = manager.get_highlights_for_content("same");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, second.id);
        assert_ne!(first.id, second.id);

        // The replaced highlight's timers must not touch the new one.
        clock.advance(2_600);
        let current = manager.get_highlights_for_content("same");
        assert_eq!(current.len(), 1);
        assert!(!current[0].is_fading);
    }

    #[test]
    fn test_remove_highlight_cancels_timers() {
        let (_clock, manager) = manager();
        let info = manager.add_highlight("text", HighlightType::Copy, None);
        assert_eq!(manager.pending_timers(), 3);

        assert!(manager.remove_highlight(&info.id));
        assert!(!manager.remove_highlight(&info.id));
        assert_eq!(manager.pending_timers(), 1);
    }

    #[test]
    fn test_remove_by_content_and_type_filters() {
        let (_clock, manager) = manager();
        manager.add_highlight("a", HighlightType::Copy, None);
        manager.add_highlight("b", HighlightType::Selection, None);

        assert_eq!(manager.get_highlights_by_type(HighlightType::Selection).len(), 1);
        assert!(manager.remove_highlight_by_content("a"));
        assert!(!manager.remove_highlight_by_content("a"));
        assert_eq!(manager.get_all_highlights().len(), 1);
    }

    #[test]
    fn test_sweep_removes_highlights_with_lost_timers() {
        let (clock, manager) = manager();
        let info = manager.add_highlight("orphan", HighlightType::Copy, None);
        {
            let mut state = manager.lock();
            let tracked = &state.highlights[0];
            let (fade, remove) = (tracked.fade_timer, tracked.remove_timer);
            state.timers.cancel(fade);
            state.timers.cancel(remove);
        }

        // end_time + grace has not passed at the first sweep (t0 + 5000).
        clock.advance(5_000);
        assert_eq!(manager.tick(), HighlightTick::default());
        assert_eq!(manager.get_all_highlights()[0].id, info.id);

        // Second sweep at t0 + 10000 drops it.
        clock.advance(5_000);
        let tick = manager.tick();
        assert_eq!(tick.swept, 1);
        assert!(manager.get_all_highlights().is_empty());
    }

    #[test]
    fn test_clear_all_keeps_sweep() {
        let (_clock, manager) = manager();
        manager.add_highlight("a", HighlightType::Copy, None);
        manager.add_highlight("b", HighlightType::Copy, None);
        manager.clear_all_highlights();

        assert!(manager.get_all_highlights().is_empty());
        assert_eq!(manager.pending_timers(), 1);
    }

    #[test]
    fn test_destroy_cancels_everything_and_rearms_on_use() {
        let (clock, manager) = manager();
        manager.add_highlight("a", HighlightType::Copy, None);
        manager.destroy();
        assert_eq!(manager.pending_timers(), 0);

        clock.advance(60_000);
        assert!(manager.tick().is_empty());

        manager.add_highlight("b", HighlightType::Copy, None);
        assert_eq!(manager.pending_timers(), 3);
    }

    #[test]
    fn test_tick_reports_transitions() {
        let (clock, manager) = manager();
        manager.add_highlight("a", HighlightType::Copy, None);

        clock.advance(3_000);
        assert_eq!(manager.tick().faded, 1);
        clock.advance(1_000);
        assert_eq!(manager.tick().removed, 1);
    }

    #[test]
    fn test_global_is_shared() {
        let a = HighlightManager::global();
        let b = HighlightManager::global();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
