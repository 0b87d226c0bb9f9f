pub mod clear;
pub mod config;
pub mod context;
pub mod list;
pub mod remove;
pub mod stats;

use chrono::{DateTime, Local};

/// Renders epoch milliseconds in local time, falling back to the raw value.
pub fn format_timestamp(ts: i64) -> String {
    DateTime::from_timestamp_millis(ts)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}
