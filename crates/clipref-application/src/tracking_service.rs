//! Copy/reference tracking service.
//!
//! Session-scoped façade over the recent-copy cache, the pinned reference
//! list, the reference store and the highlight manager. The service is a
//! cheap handle; clones share the same state.

use clipref_core::clock::{Clock, SystemClock};
use clipref_core::config::TrackingConfig;
use clipref_core::highlight::{HighlightInfo, HighlightType};
use clipref_core::reference::{CopyMetadata, CopyReference, ReferenceStore, StorageStats};
use clipref_infrastructure::{LocalReferenceStore, MemoryStorage};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::copy_events::{CopyEventHub, CopySubscription};
use crate::highlight_manager::{HighlightManager, HighlightTick};
use crate::scheduler::{TimerId, TimerQueue};

#[derive(Debug)]
struct RecentCopy {
    metadata: CopyMetadata,
    expiry: TimerId,
}

#[derive(Debug, Default)]
struct TrackingState {
    current_session: Option<String>,
    /// Every loaded reference across sessions, newest first.
    references: Vec<CopyReference>,
    /// Keyed by exact content.
    recent_copies: HashMap<String, RecentCopy>,
    expiry_timers: TimerQueue<String>,
}

impl TrackingState {
    fn take_recent(&mut self, content: &str) -> Option<CopyMetadata> {
        let entry = self.recent_copies.remove(content)?;
        self.expiry_timers.cancel(entry.expiry);
        Some(entry.metadata)
    }

    fn clear_recent(&mut self) {
        self.recent_copies.clear();
        self.expiry_timers.clear();
    }

    fn in_session(&self) -> impl Iterator<Item = &CopyReference> {
        let session = self.current_session.as_deref();
        self.references
            .iter()
            .filter(move |r| session.is_some() && r.session_id.as_deref() == session)
    }
}

fn most_recent<'a>(candidates: impl Iterator<Item = &'a CopyMetadata>) -> Option<CopyMetadata> {
    candidates.max_by_key(|metadata| metadata.timestamp).cloned()
}

/// What a `tick()` changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub expired_copies: usize,
    pub highlights: HighlightTick,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.expired_copies == 0 && self.highlights.is_empty()
    }
}

struct ServiceInner {
    config: TrackingConfig,
    clock: Arc<dyn Clock>,
    store: Box<dyn ReferenceStore>,
    highlights: Arc<HighlightManager>,
    state: Mutex<TrackingState>,
    subscription: Mutex<Option<CopySubscription>>,
}

#[derive(Clone)]
pub struct CopyTrackingService {
    inner: Arc<ServiceInner>,
}

impl CopyTrackingService {
    pub fn builder() -> CopyTrackingServiceBuilder {
        CopyTrackingServiceBuilder::default()
    }

    fn lock(&self) -> MutexGuard<'_, TrackingState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Locks state after expiring every recent copy that is due.
    fn lock_current(&self) -> (MutexGuard<'_, TrackingState>, usize) {
        let mut state = self.lock();
        let now = self.inner.clock.now_ms();
        let mut expired = 0;
        for (id, content) in state.expiry_timers.drain_due(now) {
            let matches = state
                .recent_copies
                .get(&content)
                .is_some_and(|entry| entry.expiry == id);
            if matches {
                state.recent_copies.remove(&content);
                expired += 1;
            }
        }
        if expired > 0 {
            tracing::debug!("Expired {} recent copies", expired);
        }
        (state, expired)
    }

    fn persist(&self, state: &TrackingState) {
        self.inner.store.save(&state.references);
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.inner.config
    }

    pub fn highlight_manager(&self) -> &Arc<HighlightManager> {
        &self.inner.highlights
    }

    // ============================================================================
    // Session scope
    // ============================================================================

    /// Switches the active session.
    ///
    /// A real change clears the recent-copy cache and every highlight.
    /// Persisted references of other sessions stay untouched.
    pub fn set_session(&self, session_id: Option<&str>) {
        let mut state = self.lock();
        if state.current_session.as_deref() == session_id {
            return;
        }

        tracing::debug!(
            "Switching session {:?} -> {:?}",
            state.current_session,
            session_id
        );
        state.current_session = session_id.map(str::to_string);
        state.clear_recent();
        self.inner.highlights.clear_all_highlights();
    }

    pub fn current_session(&self) -> Option<String> {
        self.lock().current_session.clone()
    }

    // ============================================================================
    // Recent copies
    // ============================================================================

    /// Records a copy, replacing any cached copy with identical content.
    ///
    /// The entry expires after `recent_copy_ttl_ms` unless promoted first.
    pub fn track_copy(&self, metadata: CopyMetadata) {
        let (mut state, _) = self.lock_current();
        self.insert_recent(&mut state, metadata);
    }

    fn insert_recent(&self, state: &mut TrackingState, metadata: CopyMetadata) {
        let content = metadata.content.clone();
        state.take_recent(&content);

        let deadline = self.inner.clock.now_ms() + self.inner.config.recent_copy_ttl_ms;
        let expiry = state.expiry_timers.schedule(deadline, content.clone());
        state
            .recent_copies
            .insert(content, RecentCopy { metadata, expiry });
    }

    /// Finds the cached copy matching `content`.
    ///
    /// Tried in order: exact content, exact content after trimming both
    /// sides, then containment in either direction where the length ratio
    /// `max(|a|/|b|, |b|/|a|)` exceeds the fuzzy threshold. Among several
    /// candidates of one pass the most recent copy wins.
    ///
    /// # Arguments
    ///
    /// * `content` - Pasted or otherwise observed text
    pub fn get_tracked_copy(&self, content: &str) -> Option<CopyMetadata> {
        let query = content.trim();
        if query.is_empty() {
            return None;
        }
        let (state, _) = self.lock_current();
        if let Some(entry) = state.recent_copies.get(content) {
            return Some(entry.metadata.clone());
        }

        let trimmed = state
            .recent_copies
            .values()
            .map(|entry| &entry.metadata)
            .filter(|metadata| metadata.content.trim() == query);
        if let Some(found) = most_recent(trimmed) {
            return Some(found);
        }

        let threshold = self.inner.config.fuzzy_match_threshold;
        let query_len = query.chars().count() as f64;
        let fuzzy = state
            .recent_copies
            .values()
            .map(|entry| &entry.metadata)
            .filter(|metadata| {
                let cached = metadata.content.trim();
                if cached.is_empty() || !(query.contains(cached) || cached.contains(query)) {
                    return false;
                }
                let cached_len = cached.chars().count() as f64;
                let similarity = (query_len / cached_len).max(cached_len / query_len);
                similarity > threshold
            });
        most_recent(fuzzy)
    }

    /// Drops a cached copy by metadata id.
    pub fn clear_tracked_copy(&self, id: &str) -> bool {
        let (mut state, _) = self.lock_current();
        let content = state
            .recent_copies
            .iter()
            .find(|(_, entry)| entry.metadata.id == id)
            .map(|(content, _)| content.clone());
        match content {
            Some(content) => state.take_recent(&content).is_some(),
            None => false,
        }
    }

    /// Cached copies, newest first.
    pub fn recent_copies(&self) -> Vec<CopyMetadata> {
        let (state, _) = self.lock_current();
        let mut copies: Vec<CopyMetadata> = state
            .recent_copies
            .values()
            .map(|entry| entry.metadata.clone())
            .collect();
        copies.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        copies
    }

    // ============================================================================
    // References
    // ============================================================================

    /// References of the current session, newest first.
    ///
    /// Empty while no session is active.
    pub fn references(&self) -> Vec<CopyReference> {
        self.lock().in_session().cloned().collect()
    }

    /// Pins `metadata` as a reference in the current session.
    ///
    /// A reference with the same content, agent and source type is refreshed
    /// and moved to the front instead of duplicated. The matching recent copy
    /// is evicted and the full list is persisted.
    pub fn add_reference(&self, metadata: &CopyMetadata) -> CopyReference {
        let (mut state, _) = self.lock_current();
        let now = self.inner.clock.now_ms();
        let candidate = CopyReference::from_metadata(
            metadata,
            state.current_session.clone(),
            now,
            self.inner.config.preview_length,
        );

        let duplicate = state
            .references
            .iter()
            .position(|existing| existing.is_duplicate_of(&candidate));
        let reference = match duplicate {
            Some(index) => {
                let mut existing = state.references.remove(index);
                existing.timestamp = now;
                tracing::debug!("Refreshed reference {}", existing.id);
                existing
            }
            None => {
                tracing::debug!(
                    "Added reference {} ({})",
                    candidate.id,
                    candidate.source_type
                );
                candidate
            }
        };

        state.references.insert(0, reference.clone());
        state.take_recent(&metadata.content);
        self.persist(&state);
        reference
    }

    pub fn remove_reference(&self, id: &str) -> bool {
        let mut state = self.lock();
        let before = state.references.len();
        state.references.retain(|r| r.id != id);
        let removed = state.references.len() != before;
        if removed {
            self.persist(&state);
        }
        removed
    }

    /// Clears the current session's references, or the whole store when no
    /// session is active.
    pub fn clear_all_references(&self) {
        let mut state = self.lock();
        match state.current_session.clone() {
            Some(session) => {
                state
                    .references
                    .retain(|r| r.session_id.as_deref() != Some(session.as_str()));
                self.persist(&state);
            }
            None => {
                state.references.clear();
                self.inner.store.clear();
                tracing::info!("Cleared all persisted references");
            }
        }
    }

    /// Removes references scoped to the current session only.
    ///
    /// With no session active this removes references that carry no
    /// session id.
    pub fn clear_session_references(&self) {
        let mut state = self.lock();
        let session = state.current_session.clone();
        let before = state.references.len();
        state.references.retain(|r| r.session_id != session);
        if state.references.len() != before {
            self.persist(&state);
        }
    }

    pub fn get_reference(&self, id: &str) -> Option<CopyReference> {
        self.lock().in_session().find(|r| r.id == id).cloned()
    }

    pub fn max_visible_references(&self) -> usize {
        self.inner.config.max_visible_references
    }

    /// The first `max_visible_references` of the session list.
    pub fn get_visible_references(&self) -> Vec<CopyReference> {
        self.lock()
            .in_session()
            .take(self.max_visible_references())
            .cloned()
            .collect()
    }

    /// How many session references are hidden behind the visible ones.
    pub fn get_overflow_count(&self) -> usize {
        self.lock()
            .in_session()
            .count()
            .saturating_sub(self.max_visible_references())
    }

    pub fn storage_stats(&self) -> StorageStats {
        self.inner.store.stats()
    }

    // ============================================================================
    // Highlights
    // ============================================================================

    pub fn highlights(&self) -> Vec<HighlightInfo> {
        self.inner.highlights.get_all_highlights()
    }

    pub fn add_highlight(
        &self,
        content: &str,
        highlight_type: HighlightType,
        element_id: Option<String>,
    ) -> HighlightInfo {
        self.inner
            .highlights
            .add_highlight(content, highlight_type, element_id)
    }

    pub fn remove_highlight(&self, id: &str) -> bool {
        self.inner.highlights.remove_highlight(id)
    }

    pub fn clear_all_highlights(&self) {
        self.inner.highlights.clear_all_highlights();
    }

    // ============================================================================
    // Events and lifecycle
    // ============================================================================

    /// Records a detected copy and highlights it.
    ///
    /// Both happen under the state lock, so a concurrent `set_session`
    /// sees either neither or both.
    pub fn on_copy(&self, metadata: &CopyMetadata) {
        let (mut state, _) = self.lock_current();
        self.insert_recent(&mut state, metadata.clone());
        self.inner
            .highlights
            .add_highlight(&metadata.content, HighlightType::Copy, None);
    }

    /// Promotes the recent copy matching pasted `text` to a reference.
    pub fn handle_paste(&self, text: &str) -> Option<CopyReference> {
        let metadata = self.get_tracked_copy(text)?;
        let reference = self.add_reference(&metadata);
        self.add_highlight(&metadata.content, HighlightType::Paste, None);
        Some(reference)
    }

    /// Fires every due timer.
    pub fn tick(&self) -> TickReport {
        let expired_copies = {
            let (_state, expired) = self.lock_current();
            expired
        };
        TickReport {
            expired_copies,
            highlights: self.inner.highlights.tick(),
        }
    }

    /// Detaches from copy events and drops pending recent copies.
    pub fn shutdown(&self) {
        let subscription = self
            .inner
            .subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
        self.lock().clear_recent();
        self.inner.highlights.clear_all_highlights();
        tracing::debug!("Copy tracking service shut down");
    }
}

/// Builder for [`CopyTrackingService`].
///
/// Unset parts default to the system clock, an in-memory store, a fresh
/// highlight manager and the stock configuration.
#[derive(Default)]
pub struct CopyTrackingServiceBuilder {
    config: TrackingConfig,
    clock: Option<Arc<dyn Clock>>,
    store: Option<Box<dyn ReferenceStore>>,
    highlights: Option<Arc<HighlightManager>>,
    copy_events: Option<CopyEventHub>,
    session: Option<String>,
}

impl CopyTrackingServiceBuilder {
    pub fn with_config(mut self, config: TrackingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_store<S: ReferenceStore + 'static>(mut self, store: S) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn with_highlight_manager(mut self, highlights: Arc<HighlightManager>) -> Self {
        self.highlights = Some(highlights);
        self
    }

    /// Subscribes the service to `hub` so every detected copy is tracked
    /// and highlighted.
    pub fn with_copy_events(mut self, hub: CopyEventHub) -> Self {
        self.copy_events = Some(hub);
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session = Some(session_id.into());
        self
    }

    pub fn build(self) -> CopyTrackingService {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let store = self.store.unwrap_or_else(|| {
            Box::new(
                LocalReferenceStore::new(MemoryStorage::new(), self.config.store.clone())
                    .with_clock(clock.clone()),
            )
        });
        let highlights = self.highlights.unwrap_or_else(|| {
            Arc::new(HighlightManager::new(
                clock.clone(),
                self.config.highlight.clone(),
            ))
        });

        let references = store.load();
        tracing::debug!("Loaded {} references", references.len());

        let state = TrackingState {
            current_session: self.session,
            references,
            ..TrackingState::default()
        };

        let service = CopyTrackingService {
            inner: Arc::new(ServiceInner {
                config: self.config,
                clock,
                store,
                highlights,
                state: Mutex::new(state),
                subscription: Mutex::new(None),
            }),
        };

        if let Some(hub) = self.copy_events {
            let weak = Arc::downgrade(&service.inner);
            let subscription = hub.setup_global_copy_detection(move |metadata| {
                if let Some(inner) = weak.upgrade() {
                    CopyTrackingService { inner }.on_copy(metadata);
                }
            });
            *service
                .inner
                .subscription
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(subscription);
        }

        service
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipref_core::clock::ManualClock;
    use clipref_core::reference::SourceType;

    const T0: i64 = 1_700_000_000_000;

    fn service_with_clock() -> (Arc<ManualClock>, CopyTrackingService) {
        let clock = Arc::new(ManualClock::new(T0));
        let service = CopyTrackingService::builder()
            .with_clock(clock.clone())
            .with_session("s1")
            .build();
        (clock, service)
    }

    fn copy(content: &str, ts: i64) -> CopyMetadata {
        CopyMetadata::new(content, SourceType::AgentResponse, ts).with_agent(
            Some(0),
            Some("SQL-Bot".into()),
            None,
        )
    }

    #[test]
    fn test_add_reference_deduplicates() {
        let (clock, service) = service_with_clock();
        let first = service.add_reference(&copy("SELECT 1", T0));
        service.add_reference(&copy("other", T0));
        clock.advance(500);
        let again = service.add_reference(&copy("SELECT 1", T0 + 500));

        let refs = service.references();
        assert_eq!(refs.len(), 2);
        assert_eq!(again.id, first.id);
        assert_eq!(refs[0].id, first.id);
        assert_eq!(refs[0].timestamp, T0 + 500);
    }

    #[test]
    fn test_different_agent_is_not_a_duplicate() {
        let (_clock, service) = service_with_clock();
        service.add_reference(&copy("same", T0));
        let mut other_agent = copy("same", T0);
        other_agent.agent_index = Some(1);
        service.add_reference(&other_agent);
        assert_eq!(service.references().len(), 2);
    }

    #[test]
    fn test_session_isolation() {
        let (_clock, service) = service_with_clock();
        service.add_reference(&copy("in s1", T0));
        service.track_copy(copy("pending", T0));
        service.add_highlight("pending", HighlightType::Copy, None);

        service.set_session(Some("s2"));
        assert!(service.references().is_empty());
        assert!(service.recent_copies().is_empty());
        assert!(service.highlights().is_empty());

        service.set_session(Some("s1"));
        assert_eq!(service.references().len(), 1);

        service.set_session(None);
        assert!(service.references().is_empty());
        assert!(service.get_visible_references().is_empty());
    }

    #[test]
    fn test_same_session_keeps_recent_copies() {
        let (_clock, service) = service_with_clock();
        service.track_copy(copy("pending", T0));
        service.set_session(Some("s1"));
        assert_eq!(service.recent_copies().len(), 1);
    }

    #[test]
    fn test_recent_copy_expiry() {
        let (clock, service) = service_with_clock();
        service.track_copy(copy("fleeting", T0));

        clock.advance(29_900);
        assert!(service.get_tracked_copy("fleeting").is_some());

        clock.advance(200);
        assert!(service.get_tracked_copy("fleeting").is_none());
    }

    #[test]
    fn test_retrack_resets_expiry() {
        let (clock, service) = service_with_clock();
        service.track_copy(copy("text", T0));
        clock.advance(20_000);
        service.track_copy(copy("text", T0 + 20_000));

        clock.advance(15_000);
        assert!(service.get_tracked_copy("text").is_some());
        clock.advance(15_100);
        assert_eq!(service.tick().expired_copies, 1);
    }

    #[test]
    fn test_fuzzy_matching() {
        let (_clock, service) = service_with_clock();
        service.track_copy(copy("Hello World", T0));

        let found = service.get_tracked_copy("Hello World  ").unwrap();
        assert_eq!(found.content, "Hello World");
        assert!(service.get_tracked_copy("Goodbye").is_none());
        assert!(
            service
                .get_tracked_copy("completely unrelated text of similar length")
                .is_none()
        );
        assert!(service.get_tracked_copy("").is_none());
        assert!(service.get_tracked_copy(" \n\t").is_none());
    }

    #[test]
    fn test_whitespace_padded_paste_matches() {
        let (_clock, service) = service_with_clock();
        service.track_copy(copy("Hello World", T0));
        service.track_copy(copy("ls", T0 + 1));

        for pasted in ["Hello World   ", "  Hello World\n\n", "\tHello World"] {
            let found = service.get_tracked_copy(pasted).unwrap();
            assert_eq!(found.content, "Hello World", "paste {:?}", pasted);
        }
        assert_eq!(service.get_tracked_copy("ls\n").unwrap().content, "ls");
        assert_eq!(service.get_tracked_copy("  ls ").unwrap().content, "ls");
    }

    #[test]
    fn test_trimmed_match_beats_containment() {
        let (_clock, service) = service_with_clock();
        service.track_copy(copy("SELECT 1", T0));
        service.track_copy(copy("SELECT 1 FROM dual", T0 + 5));

        let found = service.get_tracked_copy(" SELECT 1\n").unwrap();
        assert_eq!(found.content, "SELECT 1");
    }

    #[test]
    fn test_containment_prefers_most_recent() {
        let (_clock, service) = service_with_clock();
        service.track_copy(copy("abcdefghij", T0));
        service.track_copy(copy("abcdefghi", T0 + 1));

        let found = service.get_tracked_copy("xabcdefghij").unwrap();
        assert_eq!(found.content, "abcdefghi");

        service.track_copy(copy("zzz", T0 + 2));
        assert_eq!(service.get_tracked_copy("abcdefgh").unwrap().content, "abcdefghi");
    }

    #[test]
    fn test_clear_tracked_copy() {
        let (_clock, service) = service_with_clock();
        let metadata = copy("text", T0);
        service.track_copy(metadata.clone());
        assert!(service.clear_tracked_copy(&metadata.id));
        assert!(!service.clear_tracked_copy(&metadata.id));
        assert!(service.recent_copies().is_empty());
    }

    #[test]
    fn test_visible_and_overflow() {
        let (clock, service) = service_with_clock();
        for i in 0..5 {
            clock.advance(1);
            service.add_reference(&copy(&format!("ref {i}"), T0 + i));
        }

        let visible = service.get_visible_references();
        assert_eq!(visible.len(), 3);
        assert_eq!(visible[0].content, "ref 4");
        assert_eq!(service.get_overflow_count(), 2);
        assert_eq!(service.max_visible_references(), 3);
    }

    #[test]
    fn test_overflow_never_negative() {
        let (_clock, service) = service_with_clock();
        service.add_reference(&copy("only", T0));
        assert_eq!(service.get_overflow_count(), 0);
    }

    #[test]
    fn test_remove_and_get_reference() {
        let (_clock, service) = service_with_clock();
        let reference = service.add_reference(&copy("x", T0));
        assert_eq!(service.get_reference(&reference.id), Some(reference.clone()));
        assert!(service.remove_reference(&reference.id));
        assert!(!service.remove_reference(&reference.id));
        assert!(service.get_reference(&reference.id).is_none());
    }

    #[test]
    fn test_clear_all_references_is_session_scoped() {
        let (_clock, service) = service_with_clock();
        service.add_reference(&copy("s1 ref", T0));
        service.set_session(Some("s2"));
        service.add_reference(&copy("s2 ref", T0));

        service.clear_all_references();
        assert!(service.references().is_empty());

        service.set_session(Some("s1"));
        assert_eq!(service.references().len(), 1);

        service.set_session(None);
        service.clear_all_references();
        service.set_session(Some("s1"));
        assert!(service.references().is_empty());
        assert_eq!(service.storage_stats().total_references, 0);
    }

    #[test]
    fn test_clear_session_references() {
        let (_clock, service) = service_with_clock();
        service.add_reference(&copy("a", T0));
        service.set_session(Some("s2"));
        service.add_reference(&copy("b", T0));

        service.clear_session_references();
        assert!(service.references().is_empty());
        service.set_session(Some("s1"));
        assert_eq!(service.references().len(), 1);
    }

    #[test]
    fn test_handle_paste_promotes_and_evicts() {
        let (_clock, service) = service_with_clock();
        service.track_copy(copy("Hello World", T0));

        let reference = service.handle_paste("Hello World ").unwrap();
        assert_eq!(reference.content, "Hello World");
        assert_eq!(reference.session_id.as_deref(), Some("s1"));
        assert!(service.recent_copies().is_empty());
        assert!(service.handle_paste("Hello World").is_none());
        assert_eq!(
            service.highlights()[0].highlight_type,
            HighlightType::Paste
        );
    }

    #[test]
    fn test_references_persist_across_instances() {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(T0));
        let build = || {
            CopyTrackingService::builder()
                .with_clock(clock.clone())
                .with_store(LocalReferenceStore::new(
                    storage.clone(),
                    TrackingConfig::default().store,
                ))
                .with_session("s1")
                .build()
        };

        build().add_reference(&copy("kept", T0));
        let reloaded = build();
        assert_eq!(reloaded.references().len(), 1);
        assert_eq!(reloaded.references()[0].content, "kept");
    }

    #[test]
    fn test_copy_events_are_tracked_and_highlighted() {
        let clock = Arc::new(ManualClock::new(T0));
        let hub = CopyEventHub::new(clock.clone());
        let service = CopyTrackingService::builder()
            .with_clock(clock.clone())
            .with_copy_events(hub.clone())
            .with_session("s1")
            .build();

        hub.notify(&copy("copied", T0));
        assert_eq!(service.recent_copies().len(), 1);
        assert!(service.highlight_manager().is_content_highlighted("copied"));

        service.shutdown();
        assert_eq!(hub.listener_count(), 0);
        assert!(service.recent_copies().is_empty());
    }

    #[test]
    fn test_copy_and_session_switch_stay_consistent_across_threads() {
        let (_clock, service) = service_with_clock();
        let copier = {
            let service = service.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    service.on_copy(&copy(&format!("copy {i}"), T0));
                }
            })
        };
        let switcher = {
            let service = service.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    let session = if i % 2 == 0 { "s2" } else { "s1" };
                    service.set_session(Some(session));
                }
            })
        };
        copier.join().unwrap();
        switcher.join().unwrap();

        let mut highlighted: Vec<String> =
            service.highlights().into_iter().map(|h| h.content).collect();
        let mut cached: Vec<String> = service
            .recent_copies()
            .into_iter()
            .map(|m| m.content)
            .collect();
        highlighted.sort();
        cached.sort();
        assert_eq!(highlighted, cached);
    }

    #[test]
    fn test_dropping_service_unsubscribes() {
        let hub = CopyEventHub::default();
        {
            let _service = CopyTrackingService::builder()
                .with_copy_events(hub.clone())
                .build();
            assert_eq!(hub.listener_count(), 1);
        }
        assert_eq!(hub.listener_count(), 0);
    }
}
