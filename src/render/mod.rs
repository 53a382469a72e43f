//! Item to presentation dispatch.
//!
//! Everything here is a pure function of the item: the playback session
//! decides *what* to show, a [`crate::surface::PresentationSurface`] decides
//! how to draw it.

pub mod style;

pub use style::{ResolvedTextStyle, Rgba};

use serde::Serialize;
use std::time::Duration;
use crate::core::{ItemKind, PlaylistItem, PlaylistRecord};

/// Shown on text cards with no content
pub const EMPTY_TEXT_FALLBACK: &str = "No text content";

/// Source schemes that only live as long as the browser tab that made them
const EPHEMERAL_SCHEMES: &[&str] = &["blob:", "filesystem:"];

/// What a surface should put on screen for one item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RenderPlan {
    Image {
        name: String,
        source: String,
    },
    /// Autoplay muted; the surface reports end of media
    Video {
        name: String,
        source: String,
        start_at: Option<Duration>,
        muted: bool,
    },
    /// Inline document viewer
    Document {
        name: String,
        source: String,
    },
    /// Full-bleed text card
    Text {
        name: String,
        content: String,
        style: ResolvedTextStyle,
    },
    /// Name-only fallback, used for unknown kinds and unusable sources
    Placeholder {
        name: String,
    },
}

impl RenderPlan {
    /// Build the plan for an item. Never fails: anything that cannot be
    /// shown becomes a placeholder.
    pub fn for_item(item: &PlaylistItem) -> Self {
        let name = item.name.clone();
        match item.kind {
            ItemKind::Image => match resolve_source(item) {
                Some(source) => RenderPlan::Image { name, source: source.to_string() },
                None => RenderPlan::Placeholder { name },
            },
            ItemKind::Video => match resolve_source(item) {
                Some(source) => RenderPlan::Video {
                    name,
                    source: source.to_string(),
                    start_at: item.seek_offset(),
                    muted: true,
                },
                None => RenderPlan::Placeholder { name },
            },
            ItemKind::Document => match resolve_source(item) {
                Some(source) => RenderPlan::Document { name, source: source.to_string() },
                None => RenderPlan::Placeholder { name },
            },
            ItemKind::Text => RenderPlan::Text {
                name,
                content: item
                    .text_content
                    .as_deref()
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .unwrap_or(EMPTY_TEXT_FALLBACK)
                    .to_string(),
                style: ResolvedTextStyle::resolve(item.text_style.as_ref()),
            },
            ItemKind::Other => RenderPlan::Placeholder { name },
        }
    }

    /// Name-only plan for an item whose media failed to load
    pub fn placeholder_for(item: &PlaylistItem) -> Self {
        RenderPlan::Placeholder { name: item.name.clone() }
    }

    pub fn name(&self) -> &str {
        match self {
            RenderPlan::Image { name, .. }
            | RenderPlan::Video { name, .. }
            | RenderPlan::Document { name, .. }
            | RenderPlan::Text { name, .. }
            | RenderPlan::Placeholder { name } => name,
        }
    }

    /// Media location, when the plan has one
    pub fn source(&self) -> Option<&str> {
        match self {
            RenderPlan::Image { source, .. }
            | RenderPlan::Video { source, .. }
            | RenderPlan::Document { source, .. } => Some(source),
            RenderPlan::Text { .. } | RenderPlan::Placeholder { .. } => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, RenderPlan::Placeholder { .. })
    }
}

/// Location to load for an item, or `None` when nothing durable is set.
/// Images fall back to their thumbnail; other kinds only use `url`.
pub fn resolve_source(item: &PlaylistItem) -> Option<&str> {
    let url = item.url.as_deref().filter(|u| is_durable(u));
    match item.kind {
        ItemKind::Image => url.or_else(|| item.thumbnail.as_deref().filter(|t| is_durable(t))),
        _ => url,
    }
}

/// Whether a source reference survives a reload
pub fn is_durable(source: &str) -> bool {
    let source = source.trim();
    if source.is_empty() {
        return false;
    }
    let lower = source.to_ascii_lowercase();
    !EPHEMERAL_SCHEMES.iter().any(|scheme| lower.starts_with(scheme))
}

/// Now-playing information drawn around the item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Caption {
    pub playlist_name: String,
    pub item_name: String,
    /// 1-based position
    pub position: usize,
    pub total: usize,
    pub duration_secs: f64,
    pub schedule: String,
}

impl Caption {
    pub fn new(playlist: &PlaylistRecord, index: usize) -> Self {
        let item = playlist.item(index);
        Self {
            playlist_name: playlist.name.clone(),
            item_name: item.map(|i| i.name.clone()).unwrap_or_default(),
            position: index + 1,
            total: playlist.items.len(),
            duration_secs: item.map(|i| i.display_duration().as_secs_f64()).unwrap_or_default(),
            schedule: playlist.schedule_label(),
        }
    }

    /// Fraction of the playlist shown so far, for progress bars
    pub fn progress(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        (self.position as f32 / self.total as f32).clamp(0.0, 1.0)
    }
}
