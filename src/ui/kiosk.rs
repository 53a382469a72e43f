//! Drawing of the current item and the now-playing overlay.

use imgui::{Condition, StyleColor, StyleVar, TextureId, Ui, WindowFlags};
use std::time::Instant;
use tokio::sync::watch;
use crate::playback::{Cue, PlaybackStatus};
use crate::render::{Caption, RenderPlan, ResolvedTextStyle, EMPTY_TEXT_FALLBACK};

/// Pixel size of the font atlas; larger text is scaled from it
pub const BASE_FONT_SIZE: f32 = 14.0;

const OVERLAY_HEIGHT: f32 = 36.0;
const PROGRESS_HEIGHT: f32 = 6.0;
const CARD_MARGIN: f32 = 48.0;

const IDLE_BACKGROUND: [f32; 4] = [0.05, 0.05, 0.07, 1.0];
const SLIDE_BACKGROUND: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
const MEDIA_BACKGROUND: [f32; 4] = [0.08, 0.09, 0.12, 1.0];
const PLACEHOLDER_BACKGROUND: [f32; 4] = [0.18, 0.18, 0.2, 1.0];
const OVERLAY_BACKGROUND: [f32; 4] = [0.0, 0.0, 0.0, 0.55];
const MUTED_TEXT: [f32; 4] = [0.65, 0.67, 0.72, 1.0];
const ACCENT: [f32; 4] = [0.23, 0.51, 0.96, 1.0];

/// What the kiosk window shows
pub struct KioskView {
    current: Option<Shown>,
    pub show_overlay: bool,
    status: watch::Receiver<PlaybackStatus>,
}

struct Shown {
    cue: Cue,
    plan: RenderPlan,
    caption: Caption,
    since: Instant,
    slide: Option<Slide>,
}

/// Uploaded pixels of an image item
#[derive(Debug, Clone, Copy, PartialEq)]
struct Slide {
    texture: TextureId,
    size: [f32; 2],
}

impl KioskView {
    pub fn new(show_overlay: bool, status: watch::Receiver<PlaybackStatus>) -> Self {
        Self {
            current: None,
            show_overlay,
            status,
        }
    }

    /// Put an item on screen. A re-present under the same cue (placeholder
    /// fallback, live edit) keeps the elapsed time, and keeps the loaded
    /// image while the plan is still an image.
    pub fn present(&mut self, cue: Cue, plan: RenderPlan, caption: Caption) {
        let (since, slide) = match self.current.take() {
            Some(shown) if shown.cue == cue => {
                let slide = shown.slide.filter(|_| matches!(plan, RenderPlan::Image { .. }));
                (shown.since, slide)
            }
            _ => (Instant::now(), None),
        };
        self.current = Some(Shown {
            cue,
            plan,
            caption,
            since,
            slide,
        });
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Whether decoded pixels for `cue` would be shown
    pub fn wants_image(&self, cue: Cue) -> bool {
        matches!(&self.current, Some(shown) if shown.cue == cue && matches!(shown.plan, RenderPlan::Image { .. }))
    }

    /// Show an uploaded texture for the image item under `cue`
    pub fn set_image(&mut self, cue: Cue, texture: TextureId, size: [f32; 2]) -> bool {
        if !self.wants_image(cue) {
            return false;
        }
        if let Some(shown) = self.current.as_mut() {
            shown.slide = Some(Slide { texture, size });
        }
        true
    }

    /// Cue whose texture is on screen; any other texture can be freed
    pub fn image_cue(&self) -> Option<Cue> {
        self.current
            .as_ref()
            .filter(|shown| shown.slide.is_some())
            .map(|shown| shown.cue)
    }

    pub fn draw(&self, ui: &Ui) {
        let display = ui.io().display_size;

        let background = match &self.current {
            None => IDLE_BACKGROUND,
            Some(shown) if shown.plan.is_placeholder() => PLACEHOLDER_BACKGROUND,
            Some(shown) => match &shown.plan {
                RenderPlan::Text { style, .. } => style.background.to_f32(),
                _ if shown.slide.is_some() => SLIDE_BACKGROUND,
                _ => MEDIA_BACKGROUND,
            },
        };

        let _bg = ui.push_style_color(StyleColor::WindowBg, background);
        let _padding = ui.push_style_var(StyleVar::WindowPadding([0.0, 0.0]));
        let _border = ui.push_style_var(StyleVar::WindowBorderSize(0.0));

        ui.window("##kiosk")
            .position([0.0, 0.0], Condition::Always)
            .size(display, Condition::Always)
            .flags(
                WindowFlags::NO_DECORATION
                    | WindowFlags::NO_MOVE
                    | WindowFlags::NO_SAVED_SETTINGS
                    | WindowFlags::NO_BRING_TO_FRONT_ON_FOCUS
                    | WindowFlags::NO_NAV,
            )
            .build(|| match &self.current {
                Some(shown) => {
                    draw_shown(ui, shown, display);
                    if self.show_overlay {
                        draw_overlay(ui, shown, display);
                    }
                }
                None => self.draw_idle(ui, display),
            });
    }

    fn draw_idle(&self, ui: &Ui, display: [f32; 2]) {
        let status = self.status.borrow();
        let detail = match status.candidates.len() {
            0 => "No playlist is scheduled right now".to_string(),
            n => format!("{n} playlist(s) scheduled"),
        };
        centered_lines(ui, &["Waiting for a scheduled playlist"], 2.0, [1.0, 1.0, 1.0, 1.0], display, -20.0);
        centered_lines(ui, &[detail.as_str()], 1.2, MUTED_TEXT, display, 30.0);
    }
}

fn draw_shown(ui: &Ui, shown: &Shown, display: [f32; 2]) {
    match (&shown.plan, shown.slide) {
        (RenderPlan::Image { .. }, Some(slide)) => {
            let (min, max) = fit_contain(slide.size, display);
            ui.get_window_draw_list().add_image(slide.texture, min, max).build();
        }
        (plan, _) => draw_plan(ui, plan, display),
    }
}

fn draw_plan(ui: &Ui, plan: &RenderPlan, display: [f32; 2]) {
    match plan {
        RenderPlan::Text { content, style, .. } => draw_text_card(ui, content, style, display),
        // Still loading
        RenderPlan::Image { name, source } => draw_source_card(ui, "IMAGE", name, source, None, display),
        RenderPlan::Video { name, source, start_at, muted } => {
            let mut parts = Vec::new();
            if *muted {
                parts.push("muted".to_string());
            }
            if let Some(offset) = start_at {
                parts.push(format!("from {:.0}s", offset.as_secs_f64()));
            }
            let detail = parts.join(", ");
            draw_source_card(ui, "VIDEO", name, source, Some(detail.as_str()), display)
        }
        RenderPlan::Document { name, source } => draw_source_card(ui, "DOCUMENT", name, source, None, display),
        RenderPlan::Placeholder { name } => {
            centered_lines(ui, &[name.as_str()], 3.0, [1.0, 1.0, 1.0, 1.0], display, 0.0)
        }
    }
}

fn draw_text_card(ui: &Ui, content: &str, style: &ResolvedTextStyle, display: [f32; 2]) {
    let text = if content.trim().is_empty() { EMPTY_TEXT_FALLBACK } else { content };
    let scale = font_scale(style.font_size, style.bold);

    ui.set_window_font_scale(scale);
    let max_width = (display[0] - CARD_MARGIN * 2.0).max(1.0);
    let lines = wrap_text(text, max_width, |s| ui.calc_text_size(s)[0]);
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    centered_lines(ui, &refs, scale, style.color.to_f32(), display, 0.0);
    ui.set_window_font_scale(1.0);
}

fn draw_source_card(ui: &Ui, label: &str, name: &str, source: &str, detail: Option<&str>, display: [f32; 2]) {
    centered_lines(ui, &[label], 1.2, ACCENT, display, -60.0);
    centered_lines(ui, &[name], 3.0, [1.0, 1.0, 1.0, 1.0], display, 0.0);
    centered_lines(ui, &[source], 1.0, MUTED_TEXT, display, 50.0);
    if let Some(detail) = detail.filter(|d| !d.is_empty()) {
        centered_lines(ui, &[detail], 1.0, MUTED_TEXT, display, 75.0);
    }
}

fn draw_overlay(ui: &Ui, shown: &Shown, display: [f32; 2]) {
    let draw_list = ui.get_window_draw_list();
    let caption = &shown.caption;

    // Header
    draw_list
        .add_rect([0.0, 0.0], [display[0], OVERLAY_HEIGHT], OVERLAY_BACKGROUND)
        .filled(true)
        .build();
    draw_list.add_text(
        [12.0, 10.0],
        [1.0, 1.0, 1.0, 1.0],
        format!("{}  ({}/{})", caption.playlist_name, caption.position, caption.total),
    );
    let right = format!("{}  |  {:.0}s", caption.schedule, caption.duration_secs);
    let right_width = ui.calc_text_size(&right)[0];
    draw_list.add_text([display[0] - right_width - 12.0, 10.0], MUTED_TEXT, &right);

    // Item progress along the bottom edge
    let elapsed = shown.since.elapsed().as_secs_f64();
    let fraction = item_progress(elapsed, caption.duration_secs);
    let top = display[1] - PROGRESS_HEIGHT;
    draw_list
        .add_rect([0.0, top], [display[0], display[1]], OVERLAY_BACKGROUND)
        .filled(true)
        .build();
    draw_list
        .add_rect([0.0, top], [display[0] * fraction, display[1]], ACCENT)
        .filled(true)
        .build();
}

/// Draw lines centred on the window, shifted vertically by `offset`
fn centered_lines(ui: &Ui, lines: &[&str], scale: f32, color: [f32; 4], display: [f32; 2], offset: f32) {
    ui.set_window_font_scale(scale);
    let line_height = ui.text_line_height_with_spacing();
    let block_height = line_height * lines.len() as f32;
    let mut y = (display[1] - block_height) / 2.0 + offset;

    for line in lines {
        let width = ui.calc_text_size(line)[0];
        ui.set_cursor_pos([((display[0] - width) / 2.0).max(0.0), y.max(0.0)]);
        ui.text_colored(color, line);
        y += line_height;
    }
    ui.set_window_font_scale(1.0);
}

/// Window font scale for a CSS pixel size. Bold text has no separate face
/// in the atlas, so it is drawn slightly larger instead.
pub fn font_scale(font_size: f32, bold: bool) -> f32 {
    let size = if font_size.is_finite() && font_size > 0.0 { font_size } else { BASE_FONT_SIZE };
    let scale = size / BASE_FONT_SIZE;
    if bold {
        scale * 1.05
    } else {
        scale
    }
}

/// Largest rectangle with the image's aspect ratio centred in `area`,
/// as (top-left, bottom-right)
pub fn fit_contain(image: [f32; 2], area: [f32; 2]) -> ([f32; 2], [f32; 2]) {
    if image[0] <= 0.0 || image[1] <= 0.0 {
        return ([0.0, 0.0], area);
    }
    let scale = (area[0] / image[0]).min(area[1] / image[1]);
    let size = [image[0] * scale, image[1] * scale];
    let min = [(area[0] - size[0]) / 2.0, (area[1] - size[1]) / 2.0];
    (min, [min[0] + size[0], min[1] + size[1]])
}

/// Fraction of an item's display time that has passed
pub fn item_progress(elapsed_secs: f64, duration_secs: f64) -> f32 {
    if duration_secs <= 0.0 {
        return 0.0;
    }
    (elapsed_secs / duration_secs).clamp(0.0, 1.0) as f32
}

/// Greedy word wrap. Explicit newlines are kept; a word wider than the line
/// gets a line of its own.
pub fn wrap_text<F>(text: &str, max_width: f32, measure: F) -> Vec<String>
where
    F: Fn(&str) -> f32,
{
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            if line.is_empty() {
                line.push_str(word);
                continue;
            }
            let candidate = format!("{line} {word}");
            if measure(&candidate) <= max_width {
                line = candidate;
            } else {
                lines.push(std::mem::take(&mut line));
                line.push_str(word);
            }
        }
        lines.push(line);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> f32 {
        s.chars().count() as f32 * 10.0
    }

    #[test]
    fn test_wrap_text() {
        let lines = wrap_text("Welcome to the main lobby", 120.0, chars);
        assert_eq!(lines, vec!["Welcome to", "the main", "lobby"]);
    }

    #[test]
    fn test_wrap_keeps_newlines_and_long_words() {
        let lines = wrap_text("Hi\nextraordinarily long", 50.0, chars);
        assert_eq!(lines, vec!["Hi", "extraordinarily", "long"]);
        assert_eq!(wrap_text("", 50.0, chars), vec![String::new()]);
    }

    #[test]
    fn test_font_scale() {
        assert_eq!(font_scale(28.0, false), 2.0);
        assert!(font_scale(28.0, true) > 2.0);
        assert_eq!(font_scale(f32::NAN, false), 1.0);
        assert_eq!(font_scale(0.0, false), 1.0);
    }

    #[test]
    fn test_item_progress() {
        assert_eq!(item_progress(5.0, 10.0), 0.5);
        assert_eq!(item_progress(20.0, 10.0), 1.0);
        assert_eq!(item_progress(1.0, 0.0), 0.0);
    }

    #[test]
    fn test_fit_contain() {
        // Wide image letterboxed top and bottom
        assert_eq!(fit_contain([200.0, 100.0], [400.0, 400.0]), ([0.0, 100.0], [400.0, 300.0]));
        // Tall image pillarboxed
        assert_eq!(fit_contain([100.0, 200.0], [400.0, 400.0]), ([100.0, 0.0], [300.0, 400.0]));
        assert_eq!(fit_contain([0.0, 0.0], [400.0, 300.0]), ([0.0, 0.0], [400.0, 300.0]));
    }

    fn caption() -> Caption {
        Caption {
            playlist_name: "P".to_string(),
            item_name: "a".to_string(),
            position: 1,
            total: 1,
            duration_secs: 10.0,
            schedule: "09:00 - 17:00".to_string(),
        }
    }

    fn image_plan() -> RenderPlan {
        RenderPlan::Image {
            name: "a".to_string(),
            source: "https://cdn.example.com/a.png".to_string(),
        }
    }

    #[test]
    fn test_image_only_attaches_to_current_cue() {
        let (_tx, rx) = watch::channel(PlaybackStatus::default());
        let mut view = KioskView::new(true, rx);
        let texture = TextureId::new(7);

        view.present(Cue::new(1), image_plan(), caption());
        assert!(!view.set_image(Cue::new(2), texture, [4.0, 3.0]));
        assert_eq!(view.image_cue(), None);

        assert!(view.set_image(Cue::new(1), texture, [4.0, 3.0]));
        assert_eq!(view.image_cue(), Some(Cue::new(1)));

        // Live edit under the same cue keeps the picture until a new one arrives
        view.present(Cue::new(1), image_plan(), caption());
        assert_eq!(view.image_cue(), Some(Cue::new(1)));

        // Placeholder fallback drops it
        view.present(Cue::new(1), RenderPlan::Placeholder { name: "a".to_string() }, caption());
        assert_eq!(view.image_cue(), None);
        assert!(!view.wants_image(Cue::new(1)));

        // Next item starts without one
        view.present(Cue::new(2), image_plan(), caption());
        assert!(view.wants_image(Cue::new(2)));
        assert_eq!(view.image_cue(), None);
    }

    #[test]
    fn test_represent_under_same_cue_keeps_clock() {
        let (_tx, rx) = watch::channel(PlaybackStatus::default());
        let mut view = KioskView::new(true, rx);
        let plan = RenderPlan::Placeholder { name: "a".to_string() };
        let caption = Caption {
            playlist_name: "P".to_string(),
            item_name: "a".to_string(),
            position: 1,
            total: 1,
            duration_secs: 10.0,
            schedule: "09:00 - 17:00".to_string(),
        };

        view.present(Cue::new(1), plan.clone(), caption.clone());
        let since = view.current.as_ref().unwrap().since;
        view.present(Cue::new(1), plan, caption);
        assert_eq!(view.current.as_ref().unwrap().since, since);

        view.clear();
        assert!(view.current.is_none());
    }
}
