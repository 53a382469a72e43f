//! Decoding of playlist collections as the realtime database stores them.

use serde_json::{Map, Value};
use tracing::{debug, warn};
use crate::core::{PlaylistRecord, Snapshot};
use crate::source::SourceError;

/// Node holding the collection in a whole-database export
const PLAYLISTS_NODE: &str = "playlists";

/// Decode a snapshot from text
pub fn parse_snapshot_str(text: &str) -> Result<Snapshot, SourceError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: Value = serde_json::from_str(text)?;
    Ok(parse_snapshot(value))
}

/// Decode a snapshot from the JSON the database hands out.
///
/// Accepts `null`, an object keyed by record id, an array, or a database
/// export with a `playlists` node at the root. Bad records are skipped, the
/// rest survive.
pub fn parse_snapshot(value: Value) -> Snapshot {
    let entries: Vec<(String, Value)> = match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, v)| (index.to_string(), v))
            .collect(),
        Value::Object(mut map) => {
            if is_export_root(&map) {
                return map.remove(PLAYLISTS_NODE).map(parse_snapshot).unwrap_or_default();
            }
            map.into_iter().collect()
        }
        other => {
            warn!(kind = json_kind(&other), "snapshot is neither an object nor an array");
            Vec::new()
        }
    };

    entries
        .into_iter()
        .filter_map(|(key, value)| decode_record(&key, value))
        .collect()
}

fn decode_record(key: &str, value: Value) -> Option<PlaylistRecord> {
    let Value::Object(mut fields) = value else {
        if !value.is_null() {
            debug!(key, kind = json_kind(&value), "skipping non-object record");
        }
        return None;
    };

    // The console leaves nameless placeholders behind
    let named = fields
        .get("name")
        .and_then(Value::as_str)
        .map(|n| !n.trim().is_empty())
        .unwrap_or(false);
    if !named {
        debug!(key, "skipping record without a name");
        return None;
    }

    let has_id = fields
        .get("id")
        .and_then(Value::as_str)
        .map(|id| !id.is_empty())
        .unwrap_or(false);
    if !has_id {
        fields.insert("id".to_string(), Value::String(key.to_string()));
    }

    match serde_json::from_value::<PlaylistRecord>(Value::Object(fields)) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(key, error = %e, "skipping undecodable playlist");
            None
        }
    }
}

/// A database export rather than the collection itself
fn is_export_root(map: &Map<String, Value>) -> bool {
    let Some(node) = map.get(PLAYLISTS_NODE) else {
        return false;
    };
    // A playlist that happens to be keyed "playlists" has a name
    let looks_like_record = node.get("name").map(Value::is_string).unwrap_or(false);
    !looks_like_record && (node.is_object() || node.is_array() || node.is_null())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ItemKind;
    use serde_json::json;

    #[test]
    fn test_keyed_object_uses_key_as_id() {
        let snapshot = parse_snapshot(json!({
            "-Nx1": {
                "name": "Lobby",
                "isActive": true,
                "items": [{ "id": "i1", "name": "Welcome", "type": "image", "url": "https://cdn/w.png" }],
                "schedule": { "start": "08:00", "end": "18:00", "days": [1, 2, 3] }
            },
            "-Nx2": { "id": "explicit", "name": "Cafeteria" }
        }));

        assert_eq!(snapshot.len(), 2);
        let lobby = snapshot.iter().find(|p| p.name == "Lobby").unwrap();
        assert_eq!(lobby.id, "-Nx1");
        assert_eq!(lobby.items[0].kind, ItemKind::Image);
        assert_eq!(lobby.schedule.as_ref().unwrap().days, vec![1, 2, 3]);
        assert!(snapshot.iter().any(|p| p.id == "explicit"));
    }

    #[test]
    fn test_null_and_empty() {
        assert!(parse_snapshot(Value::Null).is_empty());
        assert!(parse_snapshot(json!({})).is_empty());
        assert!(parse_snapshot_str("null").unwrap().is_empty());
        assert!(parse_snapshot_str("  ").unwrap().is_empty());
    }

    #[test]
    fn test_array_skips_null_slots() {
        let snapshot = parse_snapshot(json!([null, { "name": "One" }, null, { "name": "Three" }]));
        let ids: Vec<&str> = snapshot.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_export_root() {
        let snapshot = parse_snapshot(json!({
            "devices": {},
            "media": {},
            "playlists": { "p1": { "name": "Morning" } }
        }));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, "p1");

        assert!(parse_snapshot(json!({ "playlists": {} })).is_empty());
    }

    #[test]
    fn test_record_keyed_playlists_is_not_an_export() {
        let snapshot = parse_snapshot(json!({ "playlists": { "name": "Odd key" } }));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, "playlists");
    }

    #[test]
    fn test_bad_records_are_skipped() {
        let snapshot = parse_snapshot(json!({
            "nameless": { "items": [] },
            "blank": { "name": "  " },
            "broken": { "name": "Broken", "isActive": "yes" },
            "scalar": 7,
            "good": { "name": "Good" }
        }));
        let ids: Vec<&str> = snapshot.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["good"]);
    }

    #[test]
    fn test_malformed_text_is_an_error() {
        assert!(matches!(parse_snapshot_str("{ not json"), Err(SourceError::Malformed(_))));
    }
}
