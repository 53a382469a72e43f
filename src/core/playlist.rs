use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use crate::core::item::PlaylistItem;

/// A playlist as stored by the admin console
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistRecord {
    /// Opaque unique identifier (the database key)
    #[serde(default)]
    pub id: String,

    /// Display label
    #[serde(default)]
    pub name: String,

    /// Items in playback order
    #[serde(default, deserialize_with = "seq_or_map")]
    pub items: Vec<PlaylistItem>,

    /// When the playlist may play
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,

    /// Only active playlists are eligible
    #[serde(default)]
    pub is_active: bool,
}

impl PlaylistRecord {
    /// Create an active playlist with no items and no schedule
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            items: Vec::new(),
            schedule: None,
            is_active: true,
        }
    }

    pub fn with_items(mut self, items: Vec<PlaylistItem>) -> Self {
        self.items = items;
        self
    }

    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn item(&self, index: usize) -> Option<&PlaylistItem> {
        self.items.get(index)
    }

    /// Human readable schedule window, e.g. "09:00 - 17:00"
    pub fn schedule_label(&self) -> String {
        match &self.schedule {
            Some(s) => format!(
                "{} - {}",
                s.start.as_deref().unwrap_or("--:--"),
                s.end.as_deref().unwrap_or("--:--")
            ),
            None => "unscheduled".to_string(),
        }
    }
}

/// Day/time window in the viewer's local time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// Window start, "HH:MM"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,

    /// Window end (inclusive), "HH:MM"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,

    /// Days of week, 0 = Sunday
    #[serde(default, deserialize_with = "seq_or_map")]
    pub days: Vec<u8>,
}

impl Schedule {
    pub fn new(start: &str, end: &str, days: &[u8]) -> Self {
        Self {
            start: Some(start.to_string()),
            end: Some(end.to_string()),
            days: days.to_vec(),
        }
    }

    /// Every day of the week
    pub fn daily(start: &str, end: &str) -> Self {
        Self::new(start, end, &[0, 1, 2, 3, 4, 5, 6])
    }
}

/// The realtime database turns sparse arrays into objects keyed by index,
/// so list fields accept either shape. Null slots are dropped.
#[derive(Deserialize)]
#[serde(untagged)]
enum SeqOrMap<T> {
    Seq(Vec<Option<T>>),
    Map(HashMap<String, Option<T>>),
}

fn seq_or_map<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match Option::<SeqOrMap<T>>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(SeqOrMap::Seq(values)) => values.into_iter().flatten().collect(),
        Some(SeqOrMap::Map(map)) => {
            let mut entries: Vec<(String, Option<T>)> = map.into_iter().collect();
            // Numeric keys in numeric order, anything else after them
            entries.sort_by(|(a, _), (b, _)| match (a.parse::<u64>(), b.parse::<u64>()) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                (Ok(_), Err(_)) => Ordering::Less,
                (Err(_), Ok(_)) => Ordering::Greater,
                (Err(_), Err(_)) => a.cmp(b),
            });
            entries.into_iter().filter_map(|(_, v)| v).collect()
        }
    })
}
