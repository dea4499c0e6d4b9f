//! Repository layer: entity-scoped database operations.

mod analysis;
mod document;
mod finding;

use chrono::NaiveDateTime;

pub use analysis::*;
pub use document::*;
pub use finding::*;

/// Timestamps are stored as ISO-8601 text so they sort lexically.
pub(crate) fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.9f").to_string()
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
}
