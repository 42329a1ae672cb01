//! Mapping from raw backend rows to [`MemoryEntry`].
//!
//! Memory rows arrive loosely shaped: `content` is either a plain string or
//! an object `{"text": ..., "metadata": {...}}` (older rows use
//! `{"parts": [{"text": ...}]}`), and timestamps are strings. This module is
//! the one place that knows those shapes. Rows without a parseable
//! timestamp are dropped here, so every entry past this point has one.

use chrono::{DateTime, Utc};
use sanskara_core::memory::{MemoryEntry, MemoryKind, MemoryScope};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

/// `metadata.type` of a session summary row.
pub(crate) const SUMMARY_TYPE: &str = "session_final_summary";

/// One memory row as a backend hands it over.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMemoryRow {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

/// Convert a raw row into an entry of `scope`.
///
/// Returns `None` when the timestamp is missing or not RFC 3339.
pub fn to_memory_entry(row: RawMemoryRow, scope: &MemoryScope) -> Option<MemoryEntry> {
    let Some(created_at) = row.created_at.as_deref().and_then(parse_timestamp) else {
        debug!(id = ?row.id, "Dropping memory row without a usable timestamp");
        return None;
    };

    let (text, metadata) = split_content(&row.content);
    let mut entry = MemoryEntry::new(scope.clone(), text, created_at);
    entry.id = row.id.unwrap_or_default();

    if let Some(meta) = metadata {
        if meta.get("type").and_then(Value::as_str) == Some(SUMMARY_TYPE) {
            entry.kind = MemoryKind::SessionFinalSummary;
        }
        entry.session_id = ["session_id", "adk_session_id"]
            .iter()
            .find_map(|key| meta.get(*key).and_then(Value::as_str))
            .map(str::to_owned);
        entry.author = meta.get("author").and_then(Value::as_str).map(str::to_owned);
    }
    if row.author.is_some() {
        entry.author = row.author;
    }

    Some(entry)
}

/// The JSON `content` column written for `entry`; [`to_memory_entry`] reads
/// it back.
pub fn content_json(entry: &MemoryEntry) -> Value {
    let mut metadata = serde_json::Map::new();
    if entry.kind == MemoryKind::SessionFinalSummary {
        metadata.insert("type".into(), json!(SUMMARY_TYPE));
    }
    if let Some(session_id) = &entry.session_id {
        metadata.insert("session_id".into(), json!(session_id));
    }
    if let Some(author) = &entry.author {
        metadata.insert("author".into(), json!(author));
    }
    json!({ "text": entry.text, "metadata": metadata })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn split_content(content: &Value) -> (String, Option<&serde_json::Map<String, Value>>) {
    match content {
        Value::String(text) => (text.clone(), None),
        Value::Object(obj) => {
            let text = obj
                .get("text")
                .and_then(Value::as_str)
                .or_else(|| {
                    obj.get("parts")?
                        .as_array()?
                        .first()?
                        .get("text")?
                        .as_str()
                })
                .unwrap_or_default()
                .to_owned();
            (text, obj.get("metadata").and_then(Value::as_object))
        }
        _ => (String::new(), None),
    }
}
