//! Stone colors and luminance-to-color quantization.
//!
//! Luminance is first bucketed into `color_count` bins, then each bin is
//! spread over the palette (whose length may differ from `color_count`).
//! The resulting mapping is many-to-one and wraps modulo the palette
//! length, so the brightest bin can land back on the first color.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An opaque sRGB color, serialized as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Pure black, the first default palette entry.
    pub const BLACK: Self = Self::new(0, 0, 0);

    /// Create a color from its channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Error returned when a color string is not `#RRGGBB` / `RRGGBB`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color '{0}': expected #RRGGBB")]
pub struct ParseColorError(String);

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ParseColorError(s.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| ParseColorError(s.to_string()))
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for Color {
    type Error = ParseColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// Built-in palette used when no custom colors are configured.
pub const DEFAULT_PALETTE: [Color; 9] = [
    Color::BLACK,
    Color::new(0xFF, 0x00, 0x00),
    Color::new(0x00, 0xFF, 0x00),
    Color::new(0x00, 0x00, 0xFF),
    Color::new(0xFF, 0xFF, 0x00),
    Color::new(0xFF, 0x00, 0xFF),
    Color::new(0x00, 0xFF, 0xFF),
    Color::new(0xFF, 0xA5, 0x00),
    Color::new(0x80, 0x00, 0x80),
];

/// A non-empty, ordered list of colors stones are drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette(Vec<Color>);

impl Palette {
    /// Use `custom` when it has entries, otherwise [`DEFAULT_PALETTE`].
    #[must_use]
    pub fn resolve(custom: &[Color]) -> Self {
        if custom.is_empty() {
            Self(DEFAULT_PALETTE.to_vec())
        } else {
            Self(custom.to_vec())
        }
    }

    /// The palette's colors in order.
    #[must_use]
    pub fn colors(&self) -> &[Color] {
        &self.0
    }

    /// Whether `color` is one of this palette's entries.
    #[must_use]
    pub fn contains(&self, color: Color) -> bool {
        self.0.contains(&color)
    }

    /// Quantize `luminance` into one of the palette's colors.
    ///
    /// With `color_count <= 1` the first entry is always returned.
    #[must_use]
    pub fn color_for(&self, luminance: u8, color_count: u32) -> Color {
        self.0[palette_index(luminance, color_count, self.0.len())]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::resolve(&[])
    }
}

/// Bucket `luminance` into one of `color_count + 1` bins:
/// `floor(luminance / 255 * color_count)`.
///
/// Only full white (255) reaches bin `color_count`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn luminance_bucket(luminance: u8, color_count: u32) -> u32 {
    (f64::from(luminance) / 255.0 * f64::from(color_count)).floor() as u32
}

/// Palette index for `luminance`: its bucket spread over
/// `palette_len` entries, modulo `palette_len`.
///
/// `palette_len` must be non-zero.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn palette_index(luminance: u8, color_count: u32, palette_len: usize) -> usize {
    if color_count <= 1 || palette_len <= 1 {
        return 0;
    }
    let bucket = luminance_bucket(luminance, color_count);
    let spread = (f64::from(bucket) / f64::from(color_count) * palette_len as f64).floor();
    (spread as usize) % palette_len
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn color_parses_with_and_without_hash() {
        assert_eq!("#FFA500".parse::<Color>().unwrap(), Color::new(255, 165, 0));
        assert_eq!("ffa500".parse::<Color>().unwrap(), Color::new(255, 165, 0));
        assert_eq!(" #800080 ".parse::<Color>().unwrap(), Color::new(128, 0, 128));
    }

    #[test]
    fn color_rejects_malformed() {
        for bad in ["", "#FFF", "#GG0000", "#12345678", "#ÿÿÿ"] {
            assert!(bad.parse::<Color>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn color_display_is_uppercase_hex() {
        assert_eq!(Color::new(0xab, 0x01, 0xef).to_string(), "#AB01EF");
    }

    #[test]
    fn color_serializes_as_string() {
        let json = serde_json::to_string(&Color::new(0, 255, 0)).unwrap();
        assert_eq!(json, r##""#00FF00""##);
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Color::new(0, 255, 0));
        assert!(serde_json::from_str::<Color>(r#""nope""#).is_err());
    }

    #[test]
    fn default_palette_starts_with_black() {
        let palette = Palette::default();
        assert_eq!(palette.colors().len(), 9);
        assert_eq!(palette.colors()[0], Color::BLACK);
    }

    #[test]
    fn resolve_prefers_custom_colors() {
        let custom = [Color::new(1, 2, 3), Color::new(4, 5, 6)];
        let palette = Palette::resolve(&custom);
        assert_eq!(palette.colors(), &custom);
    }

    #[test]
    fn single_color_always_first_entry() {
        let palette = Palette::default();
        for lum in 0..=255 {
            assert_eq!(palette.color_for(lum, 1), Color::BLACK);
        }
    }

    #[test]
    fn buckets_are_non_decreasing() {
        for count in 1..12 {
            let mut prev = 0;
            for lum in 0..=255 {
                let b = luminance_bucket(lum, count);
                assert!(b >= prev, "bucket decreased at lum={lum} count={count}");
                assert!(b <= count);
                prev = b;
            }
        }
    }

    #[test]
    fn bucket_spread_over_larger_palette() {
        // 2 buckets over 4 colors: dark -> 0, mid/bright -> 2.
        assert_eq!(palette_index(0, 2, 4), 0);
        assert_eq!(palette_index(127, 2, 4), 0);
        assert_eq!(palette_index(128, 2, 4), 2);
        assert_eq!(palette_index(254, 2, 4), 2);
    }

    #[test]
    fn full_white_wraps_to_first_entry() {
        // Bucket == color_count spreads to palette_len, which wraps to 0.
        assert_eq!(palette_index(255, 2, 4), 0);
        assert_eq!(palette_index(255, 3, 9), 0);
    }

    #[test]
    fn indices_within_palette() {
        for count in 1..12 {
            for len in 1..12 {
                for lum in 0..=255 {
                    assert!(palette_index(lum, count, len) < len);
                }
            }
        }
    }

    #[test]
    fn color_for_uses_custom_palette() {
        let palette = Palette::resolve(&[Color::new(10, 10, 10), Color::new(20, 20, 20)]);
        assert_eq!(palette.color_for(0, 2), Color::new(10, 10, 10));
        assert_eq!(palette.color_for(200, 2), Color::new(20, 20, 20));
        assert!(palette.contains(palette.color_for(255, 2)));
    }
}
