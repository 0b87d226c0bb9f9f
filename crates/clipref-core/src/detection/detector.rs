//! Copy source classification.
//!
//! Runs synchronously inside the host's native copy handler, so every
//! function here is cheap and infallible. When the DOM carries no usable
//! markers the detector falls back to defaults (`agent-response`, no agent
//! metadata) rather than blocking the copy.

use once_cell::sync::Lazy;
use regex::Regex;

use super::dom::DomElement;
use crate::reference::{CopyMetadata, SourceType};

pub const SOURCE_TYPE_ATTR: &str = "data-source-type";
pub const AGENT_INDEX_ATTR: &str = "data-agent-index";
pub const AGENT_NAME_ATTR: &str = "data-agent-name";
pub const AGENT_MODEL_ATTR: &str = "data-agent-model";
pub const SESSION_ID_ATTR: &str = "data-session-id";
pub const PROMPT_ATTR: &str = "data-prompt-content";
pub const SUPERVISOR_ATTR: &str = "data-supervisor-content";

const CODE_BLOCK_CLASS: &str = "code-block";
const PROMPT_CLASS: &str = "prompt-content";
const SUPERVISOR_CLASS: &str = "supervisor-response";
const AGENT_CONTAINER_CLASSES: &[&str] = &["agent-column", "agent-output", "agent-container"];
const HEADER_CLASSES: &[&str] = &["agent-header", "agent-name"];
const MODEL_CLASSES: &[&str] = &["agent-model", "model-name"];
const SESSION_PATH_PREFIXES: &[&str] = &["/chat/", "/session/"];

/// Matches headers such as `Agent 2: SQL-Bot (gpt-4o)` or `SQL-Bot`.
static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:Agent\s*\d+\s*[:\-–]\s*)?([^()\n]+?)\s*(?:\(([^()\n]+)\))?\s*$")
        .expect("header regex is valid")
});

/// Provenance scraped from an agent container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentMetadata {
    pub agent_index: Option<u32>,
    pub agent_name: Option<String>,
    pub agent_model: Option<String>,
}

/// Everything the detector knows about where a copy came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceContext {
    pub source_type: SourceType,
    pub agent: AgentMetadata,
    pub session_id: Option<String>,
}

/// Text selection captured at copy time.
#[derive(Debug, Clone)]
pub struct Selection<E> {
    pub text: String,
    pub is_collapsed: bool,
    /// Element containing the selection anchor, if the host could resolve it.
    pub anchor: Option<E>,
}

impl<E> Selection<E> {
    pub fn new(text: impl Into<String>, anchor: Option<E>) -> Self {
        Self {
            text: text.into(),
            is_collapsed: false,
            anchor,
        }
    }
}

fn is_code_block<E: DomElement>(el: &E) -> bool {
    let tag = el.tag_name();
    tag == "pre" || tag == "code" || el.has_class(CODE_BLOCK_CLASS)
}

fn is_prompt<E: DomElement>(el: &E) -> bool {
    el.has_attribute(PROMPT_ATTR) || el.has_class(PROMPT_CLASS)
}

fn is_supervisor<E: DomElement>(el: &E) -> bool {
    el.has_attribute(SUPERVISOR_ATTR) || el.has_class(SUPERVISOR_CLASS)
}

fn is_agent_container<E: DomElement>(el: &E) -> bool {
    el.has_attribute(AGENT_INDEX_ATTR) || AGENT_CONTAINER_CLASSES.iter().any(|c| el.has_class(c))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Classifies where `element` sits in the chat layout.
///
/// Priority: explicit marker, code block, prompt, supervisor, then
/// `agent-response`. An explicit marker with an unknown value is ignored.
pub fn detect_source_type<E: DomElement>(element: &E) -> SourceType {
    if let Some(marked) = element.closest(|el| el.has_attribute(SOURCE_TYPE_ATTR)) {
        let parsed = marked
            .attribute(SOURCE_TYPE_ATTR)
            .and_then(|v| v.trim().parse::<SourceType>().ok());
        if let Some(source_type) = parsed {
            return source_type;
        }
    }

    if element.closest(is_code_block).is_some() {
        return SourceType::CodeBlock;
    }
    if element.closest(is_prompt).is_some() {
        return SourceType::UserPrompt;
    }
    if element.closest(is_supervisor).is_some() {
        return SourceType::SupervisorResponse;
    }
    SourceType::AgentResponse
}

/// Nearest ancestor (or `element` itself) that represents an agent column.
pub fn find_agent_container<E: DomElement>(element: &E) -> Option<E> {
    element.closest(is_agent_container)
}

/// Reads agent provenance from a container.
///
/// Marker attributes win. Without them, the header and model descendants
/// are scraped; that fallback is best effort and may yield nothing.
pub fn extract_agent_metadata<E: DomElement>(container: &E) -> AgentMetadata {
    let mut metadata = AgentMetadata {
        agent_index: container
            .attribute(AGENT_INDEX_ATTR)
            .and_then(|v| v.trim().parse::<u32>().ok()),
        agent_name: non_empty(container.attribute(AGENT_NAME_ATTR)),
        agent_model: non_empty(container.attribute(AGENT_MODEL_ATTR)),
    };

    if metadata.agent_name.is_none() || metadata.agent_model.is_none() {
        let header = container.find_descendant(|el| {
            let tag = el.tag_name();
            matches!(tag.as_str(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "header")
                || HEADER_CLASSES.iter().any(|c| el.has_class(c))
        });

        if let Some(caps) = header
            .map(|h| h.text_content())
            .as_deref()
            .and_then(|text| HEADER_RE.captures(text.trim()))
        {
            if metadata.agent_name.is_none() {
                metadata.agent_name = non_empty(caps.get(1).map(|m| m.as_str().to_string()));
            }
            if metadata.agent_model.is_none() {
                metadata.agent_model = non_empty(caps.get(2).map(|m| m.as_str().to_string()));
            }
        }
    }

    if metadata.agent_model.is_none() {
        metadata.agent_model = container
            .find_descendant(|el| {
                el.has_attribute("data-model") || MODEL_CLASSES.iter().any(|c| el.has_class(c))
            })
            .and_then(|el| {
                non_empty(el.attribute("data-model")).or_else(|| non_empty(Some(el.text_content())))
            });
    }

    metadata
}

/// Resolves the active chat session.
///
/// The navigation path wins (`/chat/{id}` or `/session/{id}`); otherwise the
/// first element carrying a session id marker under `root` is used.
pub fn get_current_session_id<E: DomElement>(
    path: Option<&str>,
    root: Option<&E>,
) -> Option<String> {
    if let Some(path) = path {
        for prefix in SESSION_PATH_PREFIXES {
            if let Some(pos) = path.find(prefix) {
                let rest = &path[pos + prefix.len()..];
                let segment = rest.split(['/', '?', '#']).next().unwrap_or_default();
                if !segment.is_empty() {
                    return Some(segment.to_string());
                }
            }
        }
    }

    let root = root?;
    if let Some(id) = non_empty(root.attribute(SESSION_ID_ATTR)) {
        return Some(id);
    }
    root.find_descendant(|el| el.has_attribute(SESSION_ID_ATTR))
        .and_then(|el| non_empty(el.attribute(SESSION_ID_ATTR)))
}

/// Builds the full source context for an element.
pub fn detect_source_context<E: DomElement>(
    element: Option<&E>,
    path: Option<&str>,
    root: Option<&E>,
) -> SourceContext {
    let Some(element) = element else {
        return SourceContext {
            session_id: get_current_session_id(path, root),
            ..SourceContext::default()
        };
    };

    SourceContext {
        source_type: detect_source_type(element),
        agent: find_agent_container(element)
            .map(|container| extract_agent_metadata(&container))
            .unwrap_or_default(),
        session_id: get_current_session_id(path, root),
    }
}

/// Assembles copy metadata from trimmed content and a detected context.
pub fn create_copy_metadata(
    content: &str,
    context: &SourceContext,
    timestamp: i64,
) -> CopyMetadata {
    let mut metadata = CopyMetadata::new(content.trim(), context.source_type, timestamp).with_agent(
        context.agent.agent_index,
        context.agent.agent_name.clone(),
        context.agent.agent_model.clone(),
    );
    metadata.session_id = context.session_id.clone();
    metadata
}

/// Runs detection for a copy event.
///
/// Returns `None` for empty or collapsed selections.
pub fn detect_copy<E: DomElement>(
    selection: &Selection<E>,
    path: Option<&str>,
    root: Option<&E>,
    timestamp: i64,
) -> Option<CopyMetadata> {
    if selection.is_collapsed || selection.text.trim().is_empty() {
        return None;
    }
    let context = detect_source_context(selection.anchor.as_ref(), path, root);
    Some(create_copy_metadata(&selection.text, &context, timestamp))
}
