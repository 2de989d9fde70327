use serde::{Deserialize, Serialize};

use crate::canvas::PixelBuffer;
use crate::components::colors::Color;
use crate::ops::fill::{FillOutcome, FillTolerances, flood_fill_with};
use crate::ops::geometry::relative_to_native;

// ============================================================================
// FILL RECORD
// ============================================================================

/// One bucket fill, remembered by where it landed on the image rather than
/// where it landed on screen. `relative_x` / `relative_y` are fractions in
/// `[0, 1]` of the displayed image's width and height.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FillRecord {
    pub relative_x: f64,
    pub relative_y: f64,
    pub color: Color,
}

impl FillRecord {
    /// Native pixel this fill seeds from on an image of the given size.
    pub fn seed(&self, native_width: u32, native_height: u32) -> Option<(u32, u32)> {
        relative_to_native(self.relative_x, self.relative_y, native_width, native_height)
    }
}

// ============================================================================
// FILL HISTORY
// ============================================================================

/// Append-only log of fills for the current image. Fills are not undoable
/// one at a time; the log only ever grows or is emptied wholesale.
#[derive(Clone, Debug, Default)]
pub struct FillHistory {
    records: Vec<FillRecord>,
}

impl FillHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, relative_x: f64, relative_y: f64, color: Color) {
        self.records.push(FillRecord { relative_x, relative_y, color });
    }

    /// Re-run every fill, oldest first, against `buffer`.
    ///
    /// Seeds are re-derived from the stored fractions and the buffer's own
    /// native size, so the same history reproduces the same regions on any
    /// copy of the source image regardless of how it is displayed. Order is
    /// kept because later fills may repaint regions touched by earlier ones.
    /// Returns how many fills actually recolored pixels.
    pub fn replay_all(&self, buffer: &mut PixelBuffer, tolerances: &FillTolerances) -> usize {
        let (w, h) = buffer.dimensions();
        let mut applied = 0;
        for record in &self.records {
            let Some((x, y)) = record.seed(w, h) else { continue };
            if let FillOutcome::Filled { .. } = flood_fill_with(buffer, x, y, record.color, tolerances) {
                applied += 1;
            }
        }
        applied
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FillRecord> {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&FillRecord> {
        self.records.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// White canvas split into left/right halves by a black wall.
    fn split(width: u32, height: u32) -> PixelBuffer {
        let mut buf = PixelBuffer::new_filled(width, height, Rgba([255, 255, 255, 255]));
        for y in 0..height {
            buf.put_pixel(width / 2, y, Rgba([0, 0, 0, 255]));
        }
        buf
    }

    #[test]
    fn records_in_order() {
        let mut history = FillHistory::new();
        history.record(0.1, 0.2, Color::new(1, 2, 3));
        history.record(0.9, 0.8, Color::new(4, 5, 6));
        let colors: Vec<Color> = history.iter().map(|r| r.color).collect();
        assert_eq!(colors, vec![Color::new(1, 2, 3), Color::new(4, 5, 6)]);
        assert_eq!(history.last().map(|r| r.relative_x), Some(0.9));
    }

    #[test]
    fn replay_reproduces_fills_on_fresh_copy() {
        let pristine = split(20, 10);
        let mut live = pristine.clone();
        let mut history = FillHistory::new();

        for (rx, ry, color) in [(0.2, 0.5, Color::new(220, 35, 35)), (0.8, 0.5, Color::new(42, 75, 215))] {
            let (x, y) = relative_to_native(rx, ry, 20, 10).unwrap();
            flood_fill_with(&mut live, x, y, color, &FillTolerances::default());
            history.record(rx, ry, color);
        }

        let mut replayed = pristine.clone();
        assert_eq!(history.replay_all(&mut replayed, &FillTolerances::default()), 2);
        assert_eq!(replayed, live);
    }

    #[test]
    fn replay_keeps_insertion_order() {
        let mut history = FillHistory::new();
        history.record(0.5, 0.5, Color::new(200, 0, 0));
        // Second fill seeds on the now-red region and repaints it.
        history.record(0.5, 0.5, Color::new(0, 200, 0));

        let mut buf = PixelBuffer::new_filled(4, 4, Rgba([255, 255, 255, 255]));
        assert_eq!(history.replay_all(&mut buf, &FillTolerances::default()), 2);
        assert!(buf.as_raw().chunks_exact(4).all(|p| p == [0, 200, 0, 255]));
    }

    #[test]
    fn seed_on_line_art_stays_a_noop_in_replay() {
        let mut history = FillHistory::new();
        // 0.5 of width 20 lands on the wall column.
        history.record(0.5, 0.5, Color::new(255, 0, 0));
        let mut buf = split(20, 10);
        let before = buf.clone();
        assert_eq!(history.replay_all(&mut buf, &FillTolerances::default()), 0);
        assert_eq!(buf, before);
    }

    #[test]
    fn clear_empties_log() {
        let mut history = FillHistory::new();
        history.record(0.0, 0.0, Color::WHITE);
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.len(), 0);
    }
}
