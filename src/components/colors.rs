use image::Rgba;
use serde::{Deserialize, Serialize};

/// The built-in coloring palette. The first entry is the initial color.
pub const DEFAULT_PALETTE: [&str; 16] = [
    "#575757", "#DC2323", "#2A4BD7", "#1D6914", "#814A19", "#8126C0", "#A0A0A0", "#81C57A",
    "#9DAFFF", "#29D0D0", "#FF9233", "#FFEE33", "#E9DEBB", "#FFCDF3", "#FFFFFF", "#000000",
];

/// Tolerance for [`colors_match`] when the caller has no tighter or looser
/// threshold of its own. Fills use [`FillTolerances`](crate::ops::fill::FillTolerances).
pub const DEFAULT_MATCH_TOLERANCE: u8 = 20;

/// An opaque RGB color. Alpha is implied (always 255 when written to a raster).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#RRGGBB`, upper-case.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Fully opaque RGBA pixel.
    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }

    /// True when every channel is strictly below `threshold` (line-art ink).
    pub fn is_near_black(&self, threshold: u8) -> bool {
        self.r < threshold && self.g < threshold && self.b < threshold
    }
}

impl From<Rgba<u8>> for Color {
    fn from(px: Rgba<u8>) -> Self {
        Color::new(px.0[0], px.0[1], px.0[2])
    }
}

/// Parse a 7-character `#RRGGBB` string.
///
/// Anything that is not exactly seven bytes long comes back as black rather
/// than an error. A pair that is not valid hex reads as 0 for that channel.
pub fn hex_to_rgb(hex: &str) -> Color {
    if hex.len() != 7 {
        return Color::BLACK;
    }
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
            .unwrap_or(0)
    };
    Color::new(channel(1..3), channel(3..5), channel(5..7))
}

/// Compare the RGB channels of the pixel starting at byte `index` of a flat
/// RGBA slice against `color`. Alpha is ignored. An index that runs past the
/// end of `data` never matches.
#[inline]
pub fn colors_match(data: &[u8], index: usize, color: Color, tolerance: u8) -> bool {
    match data.get(index..index + 3) {
        Some(px) => {
            px[0].abs_diff(color.r) <= tolerance
                && px[1].abs_diff(color.g) <= tolerance
                && px[2].abs_diff(color.b) <= tolerance
        }
        None => false,
    }
}

/// The default palette parsed into colors.
pub fn default_palette() -> Vec<Color> {
    DEFAULT_PALETTE.iter().map(|h| hex_to_rgb(h)).collect()
}
