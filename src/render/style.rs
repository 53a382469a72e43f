use serde::Serialize;
use crate::core::TextStyle;

pub const DEFAULT_FONT_SIZE: f32 = 48.0;
pub const DEFAULT_TEXT_COLOR: Rgba = Rgba::opaque(0xff, 0xff, 0xff);
/// Dark blue (#1e40af)
pub const DEFAULT_BACKGROUND: Rgba = Rgba::opaque(0x1e, 0x40, 0xaf);

/// 8-bit RGBA colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    /// Parse a CSS hex colour: `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`
    pub fn parse_hex(s: &str) -> Option<Self> {
        let hex = s.trim().strip_prefix('#')?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }

        let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

        match hex.len() {
            3 => Some(Self::opaque(nibble(0)?, nibble(1)?, nibble(2)?)),
            4 => Some(Self { r: nibble(0)?, g: nibble(1)?, b: nibble(2)?, a: nibble(3)? }),
            6 => Some(Self::opaque(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self { r: byte(0)?, g: byte(2)?, b: byte(4)?, a: byte(6)? }),
            _ => None,
        }
    }

    /// Normalised components for GPU APIs
    pub fn to_f32(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }
}

/// Text card styling with every default filled in
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedTextStyle {
    pub font_size: f32,
    pub color: Rgba,
    pub background: Rgba,
    pub bold: bool,
}

impl Default for ResolvedTextStyle {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            color: DEFAULT_TEXT_COLOR,
            background: DEFAULT_BACKGROUND,
            bold: true,
        }
    }
}

impl ResolvedTextStyle {
    /// Apply an item's style over the defaults. Unreadable values keep the default.
    pub fn resolve(style: Option<&TextStyle>) -> Self {
        let defaults = Self::default();
        let Some(style) = style else {
            return defaults;
        };

        Self {
            font_size: style
                .font_size
                .filter(|s| s.is_finite() && *s > 0.0)
                .unwrap_or(defaults.font_size),
            color: style
                .color
                .as_deref()
                .and_then(Rgba::parse_hex)
                .unwrap_or(defaults.color),
            background: style
                .background_color
                .as_deref()
                .and_then(Rgba::parse_hex)
                .unwrap_or(defaults.background),
            bold: style
                .font_weight
                .as_ref()
                .map(|w| w.is_bold())
                .unwrap_or(defaults.bold),
        }
    }
}
