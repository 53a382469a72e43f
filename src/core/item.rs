use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Display time used when an item has no usable duration
pub const DEFAULT_ITEM_DURATION_SECS: f64 = 10.0;

/// Kind of media a playlist item refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemKind {
    Image,
    Video,
    /// PDFs and other embeddable documents
    Document,
    /// Generated text card
    Text,
    #[default]
    Other,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Image => "image",
            ItemKind::Video => "video",
            ItemKind::Document => "document",
            ItemKind::Text => "text",
            ItemKind::Other => "other",
        }
    }
}

impl From<String> for ItemKind {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "image" => ItemKind::Image,
            "video" => ItemKind::Video,
            "document" | "pdf" => ItemKind::Document,
            "text" => ItemKind::Text,
            _ => ItemKind::Other,
        }
    }
}

impl From<ItemKind> for String {
    fn from(kind: ItemKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Font weight as written by the editor, either a CSS keyword or a number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FontWeight {
    Numeric(f32),
    Keyword(String),
}

impl FontWeight {
    /// Whether this weight should be drawn bold
    pub fn is_bold(&self) -> bool {
        match self {
            FontWeight::Numeric(w) => *w >= 600.0,
            FontWeight::Keyword(k) => matches!(
                k.trim().to_ascii_lowercase().as_str(),
                "bold" | "bolder" | "600" | "700" | "800" | "900"
            ),
        }
    }
}

/// Styling for text card items
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    /// Font size in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    /// Foreground colour (CSS hex)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Background colour (CSS hex)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<FontWeight>,
}

/// One entry of a playlist
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    /// Unique within its playlist
    #[serde(default)]
    pub id: String,

    /// Label shown on placeholders and captions
    #[serde(default)]
    pub name: String,

    #[serde(rename = "type", default)]
    pub kind: ItemKind,

    /// Primary content location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Preview location, used for images when `url` is missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    /// Display time in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    /// Per-item loop flag; playback always loops the whole playlist
    #[serde(rename = "loop", default)]
    pub looped: bool,

    /// Seek offset in seconds (videos only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_style: Option<TextStyle>,
}

impl PlaylistItem {
    /// Create an item of the given kind
    pub fn new(id: &str, name: &str, kind: ItemKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            ..Default::default()
        }
    }

    /// Set the content location
    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    /// Set the display duration in seconds
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration = Some(secs);
        self
    }

    /// How long the item stays on screen before the advance timer fires
    pub fn display_duration(&self) -> Duration {
        let secs = self
            .duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(DEFAULT_ITEM_DURATION_SECS);
        Duration::try_from_secs_f64(secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_ITEM_DURATION_SECS))
    }

    /// Offset to seek to when a video starts, if any
    pub fn seek_offset(&self) -> Option<Duration> {
        if self.kind != ItemKind::Video {
            return None;
        }
        self.start_time
            .filter(|s| s.is_finite() && *s > 0.0)
            .and_then(|s| Duration::try_from_secs_f64(s).ok())
    }

    pub fn is_video(&self) -> bool {
        self.kind == ItemKind::Video
    }
}
