// ============================================================================
// BUCKET FILL: tolerance-bounded flood fill over a PixelBuffer
// ============================================================================

use crate::canvas::PixelBuffer;
use crate::components::colors::{Color, colors_match};

/// Color-distance thresholds that decide what a fill may touch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FillTolerances {
    /// A seed within this distance of the fill color is "already filled".
    pub fill_match: u8,
    /// Pixels further than this from the seed color stop the fill.
    pub boundary: u8,
    /// A seed with every channel below this is line art and never fills.
    pub black_threshold: u8,
}

impl Default for FillTolerances {
    fn default() -> Self {
        Self {
            fill_match: 10,
            boundary: 35,
            black_threshold: 30,
        }
    }
}

/// Why a fill left the buffer alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Seed lies outside the raster.
    OutOfBounds,
    /// Seed is near-black line art.
    BoundarySeed,
    /// Seed already carries the fill color.
    AlreadyFilled,
}

/// Result of a single bucket fill.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillOutcome {
    /// `bounds` is `(min_x, min_y, max_x, max_y)`, inclusive.
    Filled { pixels: usize, bounds: (u32, u32, u32, u32) },
    Skipped(SkipReason),
}

impl FillOutcome {
    pub fn is_filled(&self) -> bool {
        matches!(self, FillOutcome::Filled { .. })
    }

    /// Number of pixels recolored (0 when skipped).
    pub fn pixels(&self) -> usize {
        match self {
            FillOutcome::Filled { pixels, .. } => *pixels,
            FillOutcome::Skipped(_) => 0,
        }
    }
}

/// Flood fill with the stock tolerances (10 / 35 / 30).
pub fn flood_fill(buffer: &mut PixelBuffer, start_x: u32, start_y: u32, fill_color: Color) -> FillOutcome {
    flood_fill_with(buffer, start_x, start_y, fill_color, &FillTolerances::default())
}

/// Recolor the 4-connected region around `(start_x, start_y)`.
///
/// The region is every pixel reachable from the seed whose RGB stays within
/// `tolerances.boundary` of the seed's original color. Filled pixels become
/// `fill_color` at full opacity. Traversal uses an explicit stack of flat
/// pixel indices, and the edited raster is written back in one commit.
///
/// Pixels that already hold exactly `fill_color` are treated as visited, so
/// they neither change nor propagate the fill.
pub fn flood_fill_with(
    buffer: &mut PixelBuffer,
    start_x: u32,
    start_y: u32,
    fill_color: Color,
    tolerances: &FillTolerances,
) -> FillOutcome {
    let Some(seed_offset) = buffer.index_of(start_x, start_y) else {
        return FillOutcome::Skipped(SkipReason::OutOfBounds);
    };

    // Guards read the seed before anything is written.
    let raw = buffer.as_raw();
    let start_color = Color::new(raw[seed_offset], raw[seed_offset + 1], raw[seed_offset + 2]);

    if start_color.is_near_black(tolerances.black_threshold) {
        return FillOutcome::Skipped(SkipReason::BoundarySeed);
    }
    if colors_match(raw, seed_offset, fill_color, tolerances.fill_match) {
        return FillOutcome::Skipped(SkipReason::AlreadyFilled);
    }

    let wu = buffer.width() as usize;
    let hu = buffer.height() as usize;
    let mut data = buffer.to_flat();
    let fill_px = [fill_color.r, fill_color.g, fill_color.b, 255];
    let boundary = tolerances.boundary;

    let mut filled = 0usize;
    let (mut min_x, mut min_y) = (start_x as usize, start_y as usize);
    let (mut max_x, mut max_y) = (min_x, min_y);

    let mut stack: Vec<usize> = Vec::with_capacity(4096);
    stack.push(seed_offset / 4);

    while let Some(idx) = stack.pop() {
        let o = idx * 4;

        // Visited
        if data[o] == fill_px[0] && data[o + 1] == fill_px[1] && data[o + 2] == fill_px[2] {
            continue;
        }
        if !colors_match(&data, o, start_color, boundary) {
            continue;
        }

        data[o..o + 4].copy_from_slice(&fill_px);
        filled += 1;

        let x = idx % wu;
        let y = idx / wu;
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);

        // Off-raster neighbours are never pushed.
        if x + 1 < wu {
            stack.push(idx + 1);
        }
        if x > 0 {
            stack.push(idx - 1);
        }
        if y + 1 < hu {
            stack.push(idx + wu);
        }
        if y > 0 {
            stack.push(idx - wu);
        }
    }

    let committed = buffer.commit(data);
    debug_assert!(committed, "working copy must match the buffer length");

    FillOutcome::Filled {
        pixels: filled,
        bounds: (min_x as u32, min_y as u32, max_x as u32, max_y as u32),
    }
}
