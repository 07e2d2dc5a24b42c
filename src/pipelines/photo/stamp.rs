// SPDX-License-Identifier: GPL-3.0-only

//! Text stamp compositor
//!
//! Draws a solid band across the bottom of the raster and renders a
//! strftime-formatted line of text into it with the built-in 6×11 font.

use super::font::glyph;
use crate::constants::stamp::{DEFAULT_FOREGROUND, GLYPH_HEIGHT, GLYPH_WIDTH, MAX_STAMP_LEN};
use crate::errors::ConfigError;
use crate::media::raster::Raster;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Write};
use std::str::FromStr;
use tracing::debug;

/// 24-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color {
        r: 0xFF,
        g: 0xFF,
        b: 0xFF,
    };

    /// Build from `0xRRGGBB`; values wider than 24 bits are not colors
    pub const fn from_rgb24(value: u32) -> Option<Color> {
        if value > 0xFF_FF_FF {
            return None;
        }
        Some(Color {
            r: (value >> 16) as u8,
            g: (value >> 8) as u8,
            b: value as u8,
        })
    }

    pub const fn to_rgb24(self) -> u32 {
        (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    /// Luminosity, used when stamping greyscale rasters
    pub fn luma(self) -> u8 {
        ((21 * self.r as u32 + 71 * self.g as u32 + 7 * self.b as u32 + 49) / 99) as u8
    }

    fn paint(self, pixel: &mut [u8]) {
        match pixel.len() {
            1 => pixel[0] = self.luma(),
            _ => pixel.copy_from_slice(&[self.r, self.g, self.b]),
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::from_rgb24(DEFAULT_FOREGROUND).unwrap_or(Color::WHITE)
    }
}

impl FromStr for Color {
    type Err = ConfigError;

    /// Parse hex `RRGGBB`, optionally prefixed with `#` or `0x`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('#')
            .or_else(|| trimmed.strip_prefix("0x"))
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        u32::from_str_radix(digits, 16)
            .ok()
            .and_then(Color::from_rgb24)
            .ok_or_else(|| ConfigError::InvalidColor(s.to_string()))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.to_rgb24())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Text stamp parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOverlay {
    /// strftime template
    pub template: String,
    pub foreground: Color,
    /// Cell background; `None` leaves unset glyph pixels showing the band
    pub background: Option<Color>,
}

impl TextOverlay {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            foreground: Color::default(),
            background: None,
        }
    }
}

/// Expand strftime directives in `template`, truncated to the stamp length
///
/// A template with an invalid directive is used verbatim.
pub fn format_template<Tz: TimeZone>(template: &str, now: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    let items: Vec<Item<'_>> = StrftimeItems::new(template).collect();

    let mut text = String::new();
    let formatted = !items.iter().any(|item| matches!(item, Item::Error))
        && write!(text, "{}", now.format_with_items(items.iter())).is_ok();
    if !formatted {
        text = template.to_string();
    }

    match text.char_indices().nth(MAX_STAMP_LEN) {
        Some((end, _)) => text[..end].to_string(),
        None => text,
    }
}

/// Composite `overlay` onto the bottom of `raster`
pub fn stamp<Tz: TimeZone>(raster: &mut Raster, overlay: &TextOverlay, now: &DateTime<Tz>)
where
    Tz::Offset: fmt::Display,
{
    let text = format_template(&overlay.template, now);
    debug!(text = %text, "Adding stamp");
    draw_text(raster, &text, overlay.foreground, overlay.background);
}

/// Fill the band and render `text` into it, clipped at the right edge
pub fn draw_text(raster: &mut Raster, text: &str, foreground: Color, background: Option<Color>) {
    let width = raster.width() as usize;
    let height = raster.height() as usize;
    let band = GLYPH_HEIGHT.min(height);
    let top = height - band;
    // Rasters shorter than a glyph show its bottom rows
    let first_glyph_row = GLYPH_HEIGHT - band;

    let fill = background.unwrap_or(Color::BLACK);
    for y in top..height {
        for x in 0..width {
            fill.paint(raster.pixel_mut(x as u32, y as u32));
        }
    }

    for (index, c) in text.chars().enumerate() {
        let left = index * GLYPH_WIDTH;
        if left >= width {
            break;
        }
        let bitmap = glyph(c);

        for row in 0..band {
            let bits = bitmap[first_glyph_row + row];
            let y = (top + row) as u32;

            for column in 0..GLYPH_WIDTH.min(width - left) {
                let pixel = raster.pixel_mut((left + column) as u32, y);
                if bits & (0x80 >> column) != 0 {
                    foreground.paint(pixel);
                } else if let Some(bg) = background {
                    bg.paint(pixel);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::raster::Channels;
    use chrono::Utc;

    fn black(width: u32, height: u32) -> Raster {
        Raster::new(width, height, Channels::Rgb)
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 5).unwrap()
    }

    #[test]
    fn test_color_parsing() {
        assert_eq!("#ff8000".parse::<Color>().unwrap(), Color { r: 255, g: 128, b: 0 });
        assert_eq!("0x00ff00".parse::<Color>().unwrap().to_rgb24(), 0x00FF00);
        assert_eq!("0000ff".parse::<Color>().unwrap(), Color { r: 0, g: 0, b: 255 });
        assert!("1000000".parse::<Color>().is_err());
        assert!("green".parse::<Color>().is_err());
    }

    #[test]
    fn test_template_expansion() {
        assert_eq!(format_template("%Y-%m-%d %H:%M", &noon()), "2024-03-09 12:30");
        assert_eq!(format_template("plain text", &noon()), "plain text");
    }

    #[test]
    fn test_invalid_directive_keeps_template() {
        assert_eq!(format_template("bad %Q here", &noon()), "bad %Q here");
    }

    #[test]
    fn test_text_is_truncated() {
        let long = "x".repeat(80);
        assert_eq!(format_template(&long, &noon()).len(), MAX_STAMP_LEN);
    }

    #[test]
    fn test_band_is_filled_black_without_background() {
        let mut raster = Raster::from_raw(4, 12, Channels::Rgb, vec![200; 4 * 12 * 3]).unwrap();
        draw_text(&mut raster, "", Color::WHITE, None);
        assert_eq!(raster.pixel(0, 0), &[200, 200, 200]);
        assert_eq!(raster.pixel(3, 1), &[0, 0, 0]);
        assert_eq!(raster.pixel(3, 11), &[0, 0, 0]);
    }

    #[test]
    fn test_band_uses_background() {
        let mut raster = black(8, 11);
        let bg = Color { r: 1, g: 2, b: 3 };
        draw_text(&mut raster, "", Color::WHITE, Some(bg));
        assert!(raster.as_raw().chunks_exact(3).all(|p| p == [1, 2, 3]));
    }

    #[test]
    fn test_glyph_pixels_use_foreground() {
        let mut raster = black(6, 11);
        let fg = Color { r: 10, g: 20, b: 30 };
        draw_text(&mut raster, "I", fg, None);
        // Top row of 'I' covers columns 1..4 at glyph row 2
        assert_eq!(raster.pixel(0, 2), &[0, 0, 0]);
        assert_eq!(raster.pixel(1, 2), &[10, 20, 30]);
        assert_eq!(raster.pixel(3, 2), &[10, 20, 30]);
        assert_eq!(raster.pixel(4, 2), &[0, 0, 0]);
    }

    #[test]
    fn test_text_clipped_at_right_edge() {
        let mut raster = black(8, 11);
        draw_text(&mut raster, "WWWW", Color::WHITE, Some(Color::BLACK));
        assert_eq!(raster.len(), 8 * 11 * 3);
    }

    #[test]
    fn test_short_raster_is_stamped_without_panic() {
        let mut raster = black(10, 4);
        draw_text(&mut raster, "T", Color::WHITE, None);
        assert_eq!(raster.len(), 10 * 4 * 3);
    }

    #[test]
    fn test_greyscale_stamp_uses_luma() {
        let mut raster = Raster::new(6, 11, Channels::Grey);
        draw_text(&mut raster, "I", Color::WHITE, Some(Color { r: 0, g: 99, b: 0 }));
        assert_eq!(raster.pixel(2, 2), &[255]);
        assert_eq!(raster.pixel(0, 0), &[Color { r: 0, g: 99, b: 0 }.luma()]);
    }
}
