//! End-to-end copy → paste → reference flow.

use clipref_application::{CopyEvent, CopyEventHub, CopyTrackingService};
use clipref_core::clock::ManualClock;
use clipref_core::config::TrackingConfig;
use clipref_core::detection::detector::{AGENT_INDEX_ATTR, AGENT_NAME_ATTR};
use clipref_core::detection::{Document, NodeId, Selection};
use clipref_core::reference::SourceType;
use clipref_core::storage::KeyValueStorage;
use clipref_infrastructure::{LocalReferenceStore, MemoryStorage};
use std::sync::Arc;

const T0: i64 = 1_700_000_000_000;

struct ChatPage {
    doc: Document,
    code: NodeId,
}

fn chat_page() -> ChatPage {
    let mut doc = Document::new();
    let root = doc.root();
    let column = doc.append(root, "section");
    doc.add_class(column, "agent-column")
        .set_attribute(column, AGENT_INDEX_ATTR, "2")
        .set_attribute(column, AGENT_NAME_ATTR, "SQL-Bot");
    let pre = doc.append(column, "pre");
    let code = doc.append(pre, "code");
    doc.set_text(code, "SELECT * FROM users");
    ChatPage { doc, code }
}

struct Harness {
    clock: Arc<ManualClock>,
    hub: CopyEventHub,
    storage: Arc<MemoryStorage>,
    service: CopyTrackingService,
}

fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new(T0));
    let hub = CopyEventHub::new(clock.clone());
    let storage = Arc::new(MemoryStorage::new());
    let service = CopyTrackingService::builder()
        .with_clock(clock.clone())
        .with_store(
            LocalReferenceStore::new(storage.clone(), TrackingConfig::default().store)
                .with_clock(clock.clone()),
        )
        .with_copy_events(hub.clone())
        .with_session("chat-42")
        .build();
    Harness {
        clock,
        hub,
        storage,
        service,
    }
}

#[test]
fn test_copy_from_code_block_then_paste_creates_reference() {
    let h = harness();
    let page = chat_page();

    let event = CopyEvent::new(Selection::new(
        "SELECT * FROM users",
        Some(page.doc.element(page.code)),
    ))
    .with_location_path("/chat/chat-42");
    let metadata = h.hub.handle_copy_event(&event).expect("copy detected");

    assert_eq!(metadata.source_type, SourceType::CodeBlock);
    assert_eq!(metadata.agent_index, Some(2));
    assert_eq!(metadata.agent_name.as_deref(), Some("SQL-Bot"));
    assert_eq!(h.service.recent_copies().len(), 1);
    assert!(h.service.highlight_manager().is_content_highlighted("SELECT * FROM users"));

    h.clock.advance(10_000);
    let tracked = h
        .service
        .get_tracked_copy("SELECT * FROM users")
        .expect("still cached");
    assert_eq!(tracked.id, metadata.id);

    let reference = h.service.handle_paste("SELECT * FROM users").expect("promoted");
    assert_eq!(reference.truncated_preview, "SELECT * FROM users");
    assert_eq!(reference.source_type, SourceType::CodeBlock);
    assert_eq!(reference.session_id.as_deref(), Some("chat-42"));
    assert!(h.service.recent_copies().is_empty());

    let raw = h
        .storage
        .get_item("clipref.references")
        .unwrap()
        .expect("envelope persisted");
    let envelope: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(envelope["version"], 2);
    assert_eq!(envelope["references"][0]["sourceType"], "code-block");
    assert_eq!(envelope["references"][0]["agentName"], "SQL-Bot");
    assert_eq!(
        h.storage.get_item("clipref.references.version").unwrap().as_deref(),
        Some("2")
    );
}

#[test]
fn test_paste_after_expiry_does_not_promote() {
    let h = harness();
    let page = chat_page();

    let event = CopyEvent::new(Selection::new(
        "SELECT * FROM users",
        Some(page.doc.element(page.code)),
    ));
    h.hub.handle_copy_event(&event).expect("copy detected");

    h.clock.advance(30_100);
    assert!(h.service.handle_paste("SELECT * FROM users").is_none());
    assert!(h.service.references().is_empty());
}

#[test]
fn test_highlight_decays_while_reference_survives() {
    let h = harness();
    let page = chat_page();
    let event = CopyEvent::new(Selection::new(
        "SELECT * FROM users",
        Some(page.doc.element(page.code)),
    ));
    h.hub.handle_copy_event(&event).expect("copy detected");
    h.service.handle_paste("SELECT * FROM users").expect("promoted");

    h.clock.advance(4_100);
    let report = h.service.tick();
    assert_eq!(report.highlights.removed, 1);
    assert!(h.service.highlights().is_empty());
    assert_eq!(h.service.references().len(), 1);
}

#[test]
fn test_references_reload_in_a_new_service() {
    let h = harness();
    let page = chat_page();
    let event = CopyEvent::new(Selection::new(
        "SELECT * FROM users",
        Some(page.doc.element(page.code)),
    ));
    h.hub.handle_copy_event(&event).expect("copy detected");
    h.service.handle_paste("SELECT * FROM users").expect("promoted");
    h.service.shutdown();

    let reloaded = CopyTrackingService::builder()
        .with_clock(h.clock.clone())
        .with_store(LocalReferenceStore::new(
            h.storage.clone(),
            TrackingConfig::default().store,
        ))
        .build();
    assert!(reloaded.references().is_empty());
    reloaded.set_session(Some("chat-42"));
    assert_eq!(reloaded.references().len(), 1);
    assert_eq!(reloaded.storage_stats().total_references, 1);
}
