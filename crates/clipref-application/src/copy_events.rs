//! Global copy-event fan-out.
//!
//! Hosts forward native copy events to a [`CopyEventHub`]; the hub runs
//! source detection and hands the resulting metadata to every subscriber.

use clipref_core::clock::{Clock, SystemClock};
use clipref_core::detection::{DomElement, Selection, detect_copy};
use clipref_core::reference::CopyMetadata;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Callback invoked for each detected copy.
pub type CopyListener = Arc<dyn Fn(&CopyMetadata) + Send + Sync>;

type ListenerList = Mutex<Vec<(u64, CopyListener)>>;

/// A native copy event as seen by the host.
#[derive(Debug, Clone)]
pub struct CopyEvent<E> {
    /// Current selection; `None` when the host has no selection API.
    pub selection: Option<Selection<E>>,
    /// Location path used for session detection (e.g. `/chat/abc`).
    pub location_path: Option<String>,
    /// Document root searched for a session marker.
    pub document_root: Option<E>,
}

impl<E> CopyEvent<E> {
    pub fn new(selection: Selection<E>) -> Self {
        Self {
            selection: Some(selection),
            location_path: None,
            document_root: None,
        }
    }

    pub fn with_location_path(mut self, path: impl Into<String>) -> Self {
        self.location_path = Some(path.into());
        self
    }

    pub fn with_document_root(mut self, root: E) -> Self {
        self.document_root = Some(root);
        self
    }
}

#[derive(Clone)]
pub struct CopyEventHub {
    listeners: Arc<ListenerList>,
    next_id: Arc<AtomicU64>,
    clock: Arc<dyn Clock>,
}

impl Default for CopyEventHub {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl CopyEventHub {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(0)),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(u64, CopyListener)>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers `callback` for every detected copy.
    ///
    /// The listener stays registered until the returned subscription is
    /// unsubscribed or dropped.
    pub fn setup_global_copy_detection<F>(&self, callback: F) -> CopySubscription
    where
        F: Fn(&CopyMetadata) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push((id, Arc::new(callback)));
        tracing::debug!("Copy listener {} registered", id);

        CopySubscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.lock().len()
    }

    /// Runs detection for a native copy event and notifies listeners.
    ///
    /// Returns the detected metadata, or `None` when there is no usable
    /// selection.
    pub fn handle_copy_event<E: DomElement>(&self, event: &CopyEvent<E>) -> Option<CopyMetadata> {
        let selection = event.selection.as_ref()?;
        let metadata = detect_copy(
            selection,
            event.location_path.as_deref(),
            event.document_root.as_ref(),
            self.clock.now_ms(),
        )?;

        tracing::debug!(
            "Detected copy {} from {} ({} chars)",
            metadata.id,
            metadata.source_type,
            metadata.content.chars().count()
        );
        self.notify(&metadata);
        Some(metadata)
    }

    /// Delivers already-built metadata to every listener.
    pub fn notify(&self, metadata: &CopyMetadata) {
        // Snapshot so listeners can (un)subscribe without deadlocking.
        let listeners: Vec<CopyListener> = self.lock().iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners {
            listener(metadata);
        }
    }
}

/// Handle returned by [`CopyEventHub::setup_global_copy_detection`].
pub struct CopySubscription {
    id: u64,
    listeners: Weak<ListenerList>,
}

impl CopySubscription {
    /// Removes the listener. Safe to call more than once.
    pub fn unsubscribe(&self) {
        if let Some(listeners) = self.listeners.upgrade() {
            let mut guard = listeners
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let before = guard.len();
            guard.retain(|(id, _)| *id != self.id);
            if guard.len() != before {
                tracing::debug!("Copy listener {} removed", self.id);
            }
        }
    }
}

impl Drop for CopySubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
