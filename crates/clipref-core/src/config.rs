//! Tracking configuration.
//!
//! All timing constants, limits and storage key names live here so hosts can
//! tune them from a TOML file. Every field has a default, so an empty file (or
//! no file at all) yields the stock behaviour.

use crate::error::{CliprefError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Highlight lifecycle timings, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HighlightConfig {
    /// Delay from creation until the highlight starts fading.
    pub fade_after_ms: i64,
    /// Total lifetime of a highlight.
    pub remove_after_ms: i64,
    /// Interval of the safety-net sweep.
    pub sweep_interval_ms: i64,
    /// How long past `end_time` a highlight may linger before the sweep drops it.
    pub sweep_grace_ms: i64,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            fade_after_ms: 3_000,
            remove_after_ms: 4_000,
            sweep_interval_ms: 5_000,
            sweep_grace_ms: 1_000,
        }
    }
}

/// Persistent reference store limits and key layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// Storage key holding the JSON envelope.
    pub references_key: String,
    /// Storage key holding the last applied schema version.
    pub version_key: String,
    /// Hard cap on persisted references.
    pub max_references: usize,
    /// Number of references kept when a write hits the storage quota.
    pub emergency_references: usize,
    /// Soft budget for the serialized envelope, in bytes.
    pub max_storage_bytes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            references_key: "clipref.references".to_string(),
            version_key: "clipref.references.version".to_string(),
            max_references: 500,
            emergency_references: 100,
            max_storage_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Top-level configuration for the copy tracking service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackingConfig {
    /// How many references the UI shows before collapsing into "+N more".
    pub max_visible_references: usize,
    /// Lifetime of an unpromoted recent copy.
    pub recent_copy_ttl_ms: i64,
    /// Length-ratio score a contained paste must exceed to match a copy.
    pub fuzzy_match_threshold: f64,
    /// Characters kept in a reference preview before the ellipsis.
    pub preview_length: usize,
    pub highlight: HighlightConfig,
    pub store: StoreConfig,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            max_visible_references: 3,
            recent_copy_ttl_ms: 30_000,
            fuzzy_match_threshold: 0.8,
            preview_length: 50,
            highlight: HighlightConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl TrackingConfig {
    /// Parses a configuration from TOML text and validates it.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TrackingConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file.
    ///
    /// A missing or empty file yields the defaults; a malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        Self::from_toml_str(&content)
    }

    /// Loads a configuration file, falling back to defaults on any error.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring invalid config at {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Serializes the configuration to pretty TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        let h = &self.highlight;
        if h.fade_after_ms < 0 || h.remove_after_ms <= 0 {
            return Err(CliprefError::config("highlight timings must be positive"));
        }
        if h.fade_after_ms > h.remove_after_ms {
            return Err(CliprefError::config(format!(
                "highlight.fade_after_ms ({}) exceeds highlight.remove_after_ms ({})",
                h.fade_after_ms, h.remove_after_ms
            )));
        }
        if h.sweep_interval_ms <= 0 {
            return Err(CliprefError::config("highlight.sweep_interval_ms must be positive"));
        }
        if self.recent_copy_ttl_ms <= 0 {
            return Err(CliprefError::config("recent_copy_ttl_ms must be positive"));
        }
        if !(0.0..=1.0).contains(&self.fuzzy_match_threshold) {
            return Err(CliprefError::config(
                "fuzzy_match_threshold must be within 0.0..=1.0",
            ));
        }
        let s = &self.store;
        if s.max_references == 0 || s.emergency_references == 0 {
            return Err(CliprefError::config("store reference limits must be non-zero"));
        }
        let keys_missing = s.references_key.is_empty() || s.version_key.is_empty();
        if keys_missing || s.references_key == s.version_key {
            return Err(CliprefError::config("store keys must be non-empty and distinct"));
        }
        Ok(())
    }
}
