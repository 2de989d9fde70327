// ============================================================================
// VIEWPORT GEOMETRY: display layout and display <-> native pixel mapping
// ============================================================================
//
// Everything drawn is remembered as a fraction of the layout it was drawn in.
// Absolute positions are re-derived from those fractions whenever the layout
// changes, so repeated resizes never accumulate rounding drift.

use serde::{Deserialize, Serialize};

/// A position in viewport (display) coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Where the native image currently sits inside the viewport.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Layout {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Layout {
    /// True when the layout has no positive area (also for NaN sizes).
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Position of `p` as fractions of this layout's width/height.
    /// `None` for an empty layout.
    pub fn fraction_of(&self, p: Point) -> Option<(f64, f64)> {
        if self.is_empty() {
            return None;
        }
        Some(((p.x - self.x) / self.width, (p.y - self.y) / self.height))
    }

    /// Like [`Layout::fraction_of`] but only for points over the image
    /// (both fractions in `[0, 1]`).
    pub fn relative_position(&self, p: Point) -> Option<(f64, f64)> {
        let (rx, ry) = self.fraction_of(p)?;
        if (0.0..=1.0).contains(&rx) && (0.0..=1.0).contains(&ry) {
            Some((rx, ry))
        } else {
            None
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        self.relative_position(p).is_some()
    }

    /// Display position of a layout fraction.
    pub fn point_at(&self, rx: f64, ry: f64) -> Point {
        Point::new(self.x + rx * self.width, self.y + ry * self.height)
    }

    /// Same rectangle in a coordinate space `factor` times denser.
    pub fn scaled(&self, factor: f64) -> Layout {
        Layout {
            x: self.x * factor,
            y: self.y * factor,
            width: self.width * factor,
            height: self.height * factor,
        }
    }
}

/// Scale the native image to the largest size that fits the viewport without
/// cropping, preserving aspect ratio, and center it (letterbox / pillarbox).
///
/// A zero-sized image or a non-positive viewport yields an empty layout at
/// the origin.
pub fn fit_to_container(native_width: u32, native_height: u32, viewport_width: f64, viewport_height: f64) -> Layout {
    if native_width == 0 || native_height == 0 || !(viewport_width > 0.0) || !(viewport_height > 0.0) {
        return Layout::default();
    }

    let image_ratio = native_width as f64 / native_height as f64;
    let container_ratio = viewport_width / viewport_height;

    let (width, height) = if image_ratio > container_ratio {
        (viewport_width, viewport_width / image_ratio)
    } else {
        (viewport_height * image_ratio, viewport_height)
    };

    Layout {
        x: (viewport_width - width) / 2.0,
        y: (viewport_height - height) / 2.0,
        width,
        height,
    }
}

/// Native pixel under a layout fraction. `None` when either fraction is
/// outside `[0, 1]` or the image is empty. A fraction of exactly 1 lands on
/// the last row/column.
pub fn relative_to_native(relative_x: f64, relative_y: f64, native_width: u32, native_height: u32) -> Option<(u32, u32)> {
    if native_width == 0 || native_height == 0 {
        return None;
    }
    if !(0.0..=1.0).contains(&relative_x) || !(0.0..=1.0).contains(&relative_y) {
        return None;
    }
    let px = ((relative_x * native_width as f64).floor() as u32).min(native_width - 1);
    let py = ((relative_y * native_height as f64).floor() as u32).min(native_height - 1);
    Some((px, py))
}

/// Native pixel under a viewport pointer position, or `None` when the pointer
/// is not over the displayed image.
pub fn to_native_pixel(pointer: Point, layout: &Layout, native_width: u32, native_height: u32) -> Option<(u32, u32)> {
    let (rx, ry) = layout.relative_position(pointer)?;
    relative_to_native(rx, ry, native_width, native_height)
}

/// Move a display point so it keeps its image-relative position when the
/// layout changes from `old` to `new`. Points are returned unchanged when
/// `old` is empty.
pub fn remap_stroke_point(point: Point, old: &Layout, new: &Layout) -> Point {
    match old.fraction_of(point) {
        Some((rx, ry)) => new.point_at(rx, ry),
        None => point,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= EPS * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn wide_image_letterboxes() {
        let layout = fit_to_container(2000, 1000, 800.0, 600.0);
        assert_eq!(layout, Layout { x: 0.0, y: 100.0, width: 800.0, height: 400.0 });
    }

    #[test]
    fn tall_image_pillarboxes() {
        let layout = fit_to_container(600, 900, 1000.0, 600.0);
        assert!(close(layout.x, 300.0) && close(layout.width, 400.0));
        assert_eq!((layout.y, layout.height), (0.0, 600.0));
    }

    #[test]
    fn fit_law_holds_across_sizes() {
        let natives = [(1, 1), (640, 480), (480, 640), (1700, 2200), (3, 1000), (1000, 3)];
        let viewports = [(1.0, 1.0), (320.0, 240.0), (1280.0, 720.0), (375.0, 812.0), (99.5, 1001.25)];
        for &(nw, nh) in &natives {
            for &(vw, vh) in &viewports {
                let l = fit_to_container(nw, nh, vw, vh);
                assert!(l.x >= -EPS && l.y >= -EPS);
                assert!(l.x + l.width <= vw + EPS * vw && l.y + l.height <= vh + EPS * vh);
                let touches_x = close(l.width, vw);
                let touches_y = close(l.height, vh);
                assert!(touches_x || touches_y, "{nw}x{nh} in {vw}x{vh}: {l:?}");
                assert!(close(l.width / l.height, nw as f64 / nh as f64));
                // centered
                assert!(close(l.x * 2.0 + l.width, vw));
                assert!(close(l.y * 2.0 + l.height, vh));
            }
        }
    }

    #[test]
    fn degenerate_inputs_give_empty_layout() {
        assert!(fit_to_container(0, 10, 100.0, 100.0).is_empty());
        assert!(fit_to_container(10, 10, 0.0, 100.0).is_empty());
        assert!(fit_to_container(10, 10, f64::NAN, 100.0).is_empty());
    }

    #[test]
    fn pointer_maps_to_native_pixel() {
        let layout = Layout { x: 100.0, y: 50.0, width: 200.0, height: 100.0 };
        assert_eq!(to_native_pixel(Point::new(100.0, 50.0), &layout, 400, 200), Some((0, 0)));
        assert_eq!(to_native_pixel(Point::new(200.0, 100.0), &layout, 400, 200), Some((200, 100)));
        assert_eq!(to_native_pixel(Point::new(299.9, 149.9), &layout, 400, 200), Some((399, 199)));
    }

    #[test]
    fn far_edge_clamps_to_last_pixel() {
        let layout = Layout { x: 0.0, y: 0.0, width: 50.0, height: 50.0 };
        assert_eq!(to_native_pixel(Point::new(50.0, 50.0), &layout, 10, 10), Some((9, 9)));
    }

    #[test]
    fn pointer_off_image_is_out_of_bounds() {
        let layout = Layout { x: 100.0, y: 0.0, width: 200.0, height: 100.0 };
        assert_eq!(to_native_pixel(Point::new(99.0, 50.0), &layout, 10, 10), None);
        assert_eq!(to_native_pixel(Point::new(150.0, 100.5), &layout, 10, 10), None);
        assert_eq!(to_native_pixel(Point::new(150.0, 50.0), &Layout::default(), 10, 10), None);
    }

    #[test]
    fn relative_outside_unit_square_is_rejected() {
        assert_eq!(relative_to_native(-0.01, 0.5, 10, 10), None);
        assert_eq!(relative_to_native(0.5, 1.01, 10, 10), None);
        assert_eq!(relative_to_native(0.5, 0.5, 0, 10), None);
        assert_eq!(relative_to_native(0.25, 0.75, 8, 8), Some((2, 6)));
    }

    #[test]
    fn remap_keeps_image_relative_position() {
        let old = Layout { x: 0.0, y: 100.0, width: 800.0, height: 400.0 };
        let new = Layout { x: 50.0, y: 0.0, width: 400.0, height: 200.0 };
        let p = remap_stroke_point(Point::new(200.0, 200.0), &old, &new);
        assert_eq!(p, Point::new(150.0, 50.0));
    }

    #[test]
    fn remap_round_trip_is_stable() {
        let a = fit_to_container(1700, 2200, 1280.0, 720.0);
        let b = fit_to_container(1700, 2200, 375.0, 812.0);
        let start = a.point_at(0.3, 0.8);
        let mut p = start;
        for _ in 0..50 {
            p = remap_stroke_point(p, &a, &b);
            p = remap_stroke_point(p, &b, &a);
        }
        assert!((p.x - start.x).abs() < 1e-6 && (p.y - start.y).abs() < 1e-6);
    }

    #[test]
    fn remap_from_empty_layout_is_identity() {
        let p = Point::new(12.0, 34.0);
        let new = Layout { x: 1.0, y: 1.0, width: 10.0, height: 10.0 };
        assert_eq!(remap_stroke_point(p, &Layout::default(), &new), p);
    }
}
