//! Reference and copy metadata domain models.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::hash::generate_id;

/// Structural origin of copied text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SourceType {
    UserPrompt,
    #[default]
    AgentResponse,
    CodeBlock,
    SupervisorResponse,
}

impl SourceType {
    pub const fn all() -> &'static [SourceType] {
        &[
            SourceType::UserPrompt,
            SourceType::AgentResponse,
            SourceType::CodeBlock,
            SourceType::SupervisorResponse,
        ]
    }

    /// Wire name, as used in markers and persisted JSON.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SourceType::UserPrompt => "user-prompt",
            SourceType::AgentResponse => "agent-response",
            SourceType::CodeBlock => "code-block",
            SourceType::SupervisorResponse => "supervisor-response",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceType::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown source type '{}'", s))
    }
}

/// Ephemeral record of a raw copy event, before promotion to a reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyMetadata {
    pub id: String,
    pub content: String,
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_model: Option<String>,
    /// Capture time in epoch milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl CopyMetadata {
    /// Creates metadata with a fresh id and no provenance.
    pub fn new(content: impl Into<String>, source_type: SourceType, timestamp: i64) -> Self {
        Self {
            id: generate_id(),
            content: content.into(),
            source_type,
            agent_index: None,
            agent_name: None,
            agent_model: None,
            timestamp,
            session_id: None,
        }
    }

    pub fn with_agent(
        mut self,
        index: Option<u32>,
        name: Option<String>,
        model: Option<String>,
    ) -> Self {
        self.agent_index = index;
        self.agent_name = name;
        self.agent_model = model;
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// A persisted, user-visible pinned citation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyReference {
    pub id: String,
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_model: Option<String>,
    /// Full captured text, never truncated.
    pub content: String,
    pub truncated_preview: String,
    /// Capture or last update time in epoch milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl CopyReference {
    /// Builds a reference from copy metadata.
    ///
    /// The reference keeps the metadata id, takes `timestamp` as its capture
    /// time and is scoped to `session_id`.
    pub fn from_metadata(
        metadata: &CopyMetadata,
        session_id: Option<String>,
        timestamp: i64,
        preview_length: usize,
    ) -> Self {
        Self {
            id: metadata.id.clone(),
            source_type: metadata.source_type,
            agent_index: metadata.agent_index,
            agent_name: metadata.agent_name.clone(),
            agent_model: metadata.agent_model.clone(),
            content: metadata.content.clone(),
            truncated_preview: truncate_preview(&metadata.content, preview_length),
            timestamp,
            session_id,
        }
    }

    /// True when `other` would violate the one-reference-per-content rule.
    pub fn is_duplicate_of(&self, other: &CopyReference) -> bool {
        self.session_id == other.session_id
            && self.agent_index == other.agent_index
            && self.source_type == other.source_type
            && self.content == other.content
    }

    /// Shape check applied before persisting and after loading.
    pub fn is_valid(&self) -> bool {
        !self.id.is_empty() && self.timestamp >= 0
    }
}

/// Hard-truncates `content` to `max_chars` characters plus `"..."`.
pub fn truncate_preview(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &content[..byte_idx]),
        None => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_type_wire_names() {
        for source in SourceType::all() {
            let json = serde_json::to_string(source).unwrap();
            assert_eq!(json, format!("\"{}\"", source.as_str()));
            assert_eq!(source.as_str().parse::<SourceType>().unwrap(), *source);
        }
        assert!("assistant".parse::<SourceType>().is_err());
    }

    #[test]
    fn test_truncate_preview() {
        assert_eq!(truncate_preview("SELECT * FROM users", 50), "SELECT * FROM users");

        let long = "a".repeat(60);
        let preview = truncate_preview(&long, 50);
        assert_eq!(preview.chars().count(), 53);
        assert!(preview.ends_with("..."));

        let exact = "b".repeat(50);
        assert_eq!(truncate_preview(&exact, 50), exact);
    }

    #[test]
    fn test_truncate_preview_multibyte() {
        let text = "日本語".repeat(30);
        let preview = truncate_preview(&text, 50);
        assert_eq!(preview.chars().count(), 53);
    }

    #[test]
    fn test_reference_from_metadata() {
        let metadata = CopyMetadata::new("hello", SourceType::CodeBlock, 10).with_agent(
            Some(2),
            Some("SQL-Bot".to_string()),
            None,
        );
        let reference =
            CopyReference::from_metadata(&metadata, Some("s1".to_string()), 20, 50);

        assert_eq!(reference.id, metadata.id);
        assert_eq!(reference.timestamp, 20);
        assert_eq!(reference.truncated_preview, "hello");
        assert_eq!(reference.session_id.as_deref(), Some("s1"));
        assert_eq!(reference.agent_index, Some(2));
    }

    #[test]
    fn test_reference_serializes_camel_case() {
        let metadata = CopyMetadata::new("x", SourceType::UserPrompt, 1);
        let reference = CopyReference::from_metadata(&metadata, None, 1, 50);
        let json = serde_json::to_value(&reference).unwrap();

        assert_eq!(json["sourceType"], "user-prompt");
        assert_eq!(json["truncatedPreview"], "x");
        assert!(json.get("sessionId").is_none());
    }
}
