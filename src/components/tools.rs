use serde::{Deserialize, Serialize};

use crate::components::colors::{Color, default_palette, hex_to_rgb};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Brush,
    Fill,
}

/// Current color, brush width and the palette the color is picked from.
#[derive(Clone, Debug)]
pub struct ToolProperties {
    pub color: Color,
    /// Brush width in display pixels.
    pub brush_size: f64,
    pub palette: Vec<Color>,
    /// Palette slot of `color`, if it came from the palette.
    pub palette_index: Option<usize>,
}

impl Default for ToolProperties {
    fn default() -> Self {
        Self::with_palette(default_palette(), 10.0)
    }
}

impl ToolProperties {
    /// Start on the first palette entry (black for an empty palette).
    pub fn with_palette(palette: Vec<Color>, brush_size: f64) -> Self {
        let color = palette.first().copied().unwrap_or(Color::BLACK);
        let palette_index = if palette.is_empty() { None } else { Some(0) };
        Self {
            color,
            brush_size,
            palette,
            palette_index,
        }
    }

    /// Pick a palette slot. Out-of-range indices are ignored.
    pub fn select_palette(&mut self, index: usize) -> bool {
        match self.palette.get(index) {
            Some(&color) => {
                self.color = color;
                self.palette_index = Some(index);
                true
            }
            None => false,
        }
    }

    /// Set the color from a `#RRGGBB` string (malformed input reads as black).
    pub fn set_hex_color(&mut self, hex: &str) {
        self.color = hex_to_rgb(hex);
        self.palette_index = self.palette.iter().position(|&c| c == self.color);
    }

    /// Ignore sizes that are not finite and positive.
    pub fn set_brush_size(&mut self, size: f64) -> bool {
        if size.is_finite() && size > 0.0 {
            self.brush_size = size;
            true
        } else {
            false
        }
    }
}
