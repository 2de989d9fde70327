// ============================================================================
// EXPORT: flatten the page and its brush strokes into one raster
// ============================================================================

use image::imageops::{self, FilterType};
use image::RgbaImage;
use rayon::prelude::*;

use crate::canvas::PixelBuffer;
use crate::components::colors::Color;
use crate::components::strokes::{Stroke, StrokeStore};
use crate::io::ExportError;
use crate::ops::geometry::Layout;

/// Largest export edge, in output pixels.
pub const MAX_EXPORT_SIDE: u32 = 16_384;

/// Output raster size for `viewport` at `ratio`, refusing anything over
/// [`MAX_EXPORT_SIDE`] on either axis.
fn output_size(viewport: (f64, f64), ratio: f64) -> Result<(u32, u32), ExportError> {
    let w = (viewport.0 * ratio).round().max(1.0);
    let h = (viewport.1 * ratio).round().max(1.0);
    let limit = MAX_EXPORT_SIDE as f64;
    if !(w <= limit && h <= limit) {
        return Err(ExportError::TooLarge { width: w, height: h });
    }
    let (w, h) = (w as u32, h as u32);
    (w as usize)
        .checked_mul(h as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or(ExportError::TooLarge { width: w as f64, height: h as f64 })?;
    Ok((w, h))
}

/// Render the whole viewport (letterbox included) at `pixel_ratio` times its
/// display size: `background` everywhere, the page scaled into `layout`, then
/// every stroke with round caps and joins, clipped to the page rectangle.
pub fn composite_stage(
    buffer: &PixelBuffer,
    layout: &Layout,
    viewport: (f64, f64),
    strokes: &StrokeStore,
    pixel_ratio: f64,
    background: Color,
) -> Result<RgbaImage, ExportError> {
    let ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 { pixel_ratio } else { 1.0 };
    let (out_w, out_h) = output_size(viewport, ratio)?;
    let mut out = RgbaImage::from_pixel(out_w, out_h, background.to_rgba());

    if layout.is_empty() || buffer.width() == 0 || buffer.height() == 0 {
        return Ok(out);
    }

    let dest = layout.scaled(ratio);
    let dw = dest.width.round().max(1.0) as u32;
    let dh = dest.height.round().max(1.0) as u32;
    let dx = dest.x.round() as i64;
    let dy = dest.y.round() as i64;

    let page = if (dw, dh) == buffer.dimensions() {
        buffer.as_image().clone()
    } else {
        imageops::resize(buffer.as_image(), dw, dh, FilterType::Triangle)
    };
    imageops::overlay(&mut out, &page, dx, dy);

    // Clip rectangle in output pixels (half-open)
    let clip = (
        dx.clamp(0, out_w as i64) as u32,
        dy.clamp(0, out_h as i64) as u32,
        (dx + dw as i64).clamp(0, out_w as i64) as u32,
        (dy + dh as i64).clamp(0, out_h as i64) as u32,
    );

    for stroke in strokes.iter() {
        rasterize_stroke(&mut out, stroke, ratio, clip);
    }

    Ok(out)
}

/// Distance from `(px, py)` to the segment `a`–`b`.
#[inline]
fn sdf_line_segment(px: f32, py: f32, ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    let dx = bx - ax;
    let dy = by - ay;
    let len2 = dx * dx + dy * dy;
    if len2 <= f32::EPSILON {
        return ((px - ax) * (px - ax) + (py - ay) * (py - ay)).sqrt();
    }
    let t = (((px - ax) * dx + (py - ay) * dy) / len2).clamp(0.0, 1.0);
    let cx = ax + t * dx;
    let cy = ay + t * dy;
    ((px - cx) * (px - cx) + (py - cy) * (py - cy)).sqrt()
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Paint one stroke as a capsule chain (round caps and joins) with a half
/// pixel of anti-aliasing, source-over onto `out`, inside `clip`.
fn rasterize_stroke(out: &mut RgbaImage, stroke: &Stroke, ratio: f64, clip: (u32, u32, u32, u32)) {
    let (cx0, cy0, cx1, cy1) = clip;
    if stroke.points.is_empty() || cx0 >= cx1 || cy0 >= cy1 {
        return;
    }

    let half = (stroke.width * ratio / 2.0) as f32;
    let pts: Vec<(f32, f32)> = stroke
        .points
        .iter()
        .map(|p| ((p.x * ratio) as f32, (p.y * ratio) as f32))
        .collect();

    // A lone point is a zero-length segment (a round dot).
    let segments: Vec<[f32; 4]> = if pts.len() == 1 {
        vec![[pts[0].0, pts[0].1, pts[0].0, pts[0].1]]
    } else {
        pts.windows(2).map(|w| [w[0].0, w[0].1, w[1].0, w[1].1]).collect()
    };

    let reach = half + 1.0;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (f32::MAX, f32::MAX, f32::MIN, f32::MIN);
    for &(x, y) in &pts {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
        return;
    }

    let x0 = ((min_x - reach).floor().max(cx0 as f32) as u32).min(cx1);
    let x1 = ((max_x + reach).ceil().max(0.0) as u32).min(cx1);
    let y0 = ((min_y - reach).floor().max(cy0 as f32) as u32).min(cy1);
    let y1 = ((max_y + reach).ceil().max(0.0) as u32).min(cy1);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let color = [stroke.color.r as f32, stroke.color.g as f32, stroke.color.b as f32];
    let row_bytes = out.width() as usize * 4;
    let raw: &mut [u8] = &mut *out;

    raw.par_chunks_mut(row_bytes)
        .enumerate()
        .skip(y0 as usize)
        .take((y1 - y0) as usize)
        .for_each(|(row, row_buf)| {
            let py = row as f32 + 0.5;
            let near: Vec<&[f32; 4]> = segments
                .iter()
                .filter(|s| py >= s[1].min(s[3]) - reach && py <= s[1].max(s[3]) + reach)
                .collect();
            if near.is_empty() {
                return;
            }
            for col in x0..x1 {
                let px = col as f32 + 0.5;
                let d = near
                    .iter()
                    .map(|s| sdf_line_segment(px, py, s[0], s[1], s[2], s[3]))
                    .fold(f32::MAX, f32::min);
                let coverage = smoothstep(0.5, -0.5, d - half);
                if coverage <= 0.001 {
                    continue;
                }
                let idx = col as usize * 4;
                let dst = &mut row_buf[idx..idx + 4];
                for c in 0..3 {
                    dst[c] = (color[c] * coverage + dst[c] as f32 * (1.0 - coverage)).round() as u8;
                }
                dst[3] = (dst[3] as f32 + (255.0 - dst[3] as f32) * coverage).round() as u8;
            }
        });
}
