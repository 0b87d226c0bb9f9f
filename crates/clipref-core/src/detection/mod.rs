//! Copy source detection over an abstract DOM.

pub mod detector;
pub mod dom;

pub use detector::{
    AgentMetadata, Selection, SourceContext, create_copy_metadata, detect_copy,
    detect_source_context, detect_source_type, extract_agent_metadata, find_agent_container,
    get_current_session_id,
};
pub use dom::{Document, DomElement, ElementRef, NodeId};
