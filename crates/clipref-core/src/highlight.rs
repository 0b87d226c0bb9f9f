//! Visual highlight domain model.

use serde::{Deserialize, Serialize};

use crate::config::HighlightConfig;
use crate::hash::{content_hash, generate_id};

/// What triggered a highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HighlightType {
    #[default]
    Copy,
    Paste,
    Selection,
}

/// Transient "this text was just copied" indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightInfo {
    pub id: String,
    pub content: String,
    pub content_hash: String,
    #[serde(rename = "type")]
    pub highlight_type: HighlightType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    pub start_time: i64,
    pub fade_start_time: i64,
    pub end_time: i64,
    pub is_active: bool,
    pub is_fading: bool,
}

impl HighlightInfo {
    /// Creates an active highlight starting at `start_time`.
    pub fn new(
        content: &str,
        highlight_type: HighlightType,
        element_id: Option<String>,
        start_time: i64,
        timings: &HighlightConfig,
    ) -> Self {
        Self {
            id: generate_id(),
            content: content.to_string(),
            content_hash: content_hash(content),
            highlight_type,
            element_id,
            start_time,
            fade_start_time: start_time + timings.fade_after_ms,
            end_time: start_time + timings.remove_after_ms,
            is_active: true,
            is_fading: false,
        }
    }

    /// Moves the highlight into its fading phase. A fading highlight is still
    /// active (visible) until it is removed.
    pub fn start_fading(&mut self) {
        self.is_fading = true;
    }

    /// True when the sweep should drop this highlight.
    pub fn is_stale(&self, now: i64, grace_ms: i64) -> bool {
        now - self.end_time > grace_ms
    }
}
