// ============================================================================
// SESSION: one coloring page, what has been drawn on it, and the input state
// ============================================================================
//
// All mutation happens from the caller's event loop, one event at a time, so
// nothing here is shared or locked. The rendering host reads state back
// through the accessors and the generation counters.

use std::time::Instant;

use image::RgbaImage;

use crate::canvas::PixelBuffer;
use crate::components::colors::Color;
use crate::components::history::FillHistory;
use crate::components::strokes::{Stroke, StrokeStore};
use crate::components::tools::{Tool, ToolProperties};
use crate::debounce::Debouncer;
use crate::io::{ExportError, ImageLibrary, LoadError};
use crate::ops::export::composite_stage;
use crate::ops::fill::{FillOutcome, FillTolerances, SkipReason, flood_fill_with};
use crate::ops::geometry::{Layout, Point, fit_to_container, relative_to_native};
use crate::settings::Settings;

/// The page currently being colored.
#[derive(Clone, Debug)]
pub struct LoadedImage {
    pub name: String,
    /// Decoded source, never painted on.
    pristine: PixelBuffer,
    /// Source plus every fill so far.
    buffer: PixelBuffer,
}

impl LoadedImage {
    pub fn pristine(&self) -> &PixelBuffer {
        &self.pristine
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }
}

pub struct Session {
    tolerances: FillTolerances,
    tools: ToolProperties,
    tool: Tool,
    image: Option<LoadedImage>,
    layout: Layout,
    /// Last non-empty layout; stroke points are expressed against it.
    stroke_layout: Layout,
    viewport: (f64, f64),
    fills: FillHistory,
    strokes: StrokeStore,
    painting: bool,
    resize: Debouncer,
    pending_viewport: Option<(f64, f64)>,
    background_generation: u64,
    strokes_generation: u64,
}

impl Session {
    pub fn new(settings: &Settings, viewport_width: f64, viewport_height: f64) -> Self {
        Self {
            tolerances: settings.fill_tolerances(),
            tools: ToolProperties::with_palette(settings.palette.clone(), settings.brush_size),
            tool: Tool::default(),
            image: None,
            layout: Layout::default(),
            stroke_layout: Layout::default(),
            viewport: (viewport_width, viewport_height),
            fills: FillHistory::new(),
            strokes: StrokeStore::new(),
            painting: false,
            resize: Debouncer::new(settings.resize_debounce()),
            pending_viewport: None,
            background_generation: 0,
            strokes_generation: 0,
        }
    }

    // ---- accessors ----------------------------------------------------------

    pub fn tool(&self) -> Tool { self.tool }

    pub fn tools(&self) -> &ToolProperties { &self.tools }

    pub fn color(&self) -> Color { self.tools.color }

    pub fn image(&self) -> Option<&LoadedImage> { self.image.as_ref() }

    pub fn image_name(&self) -> Option<&str> {
        self.image.as_ref().map(|img| img.name.as_str())
    }

    /// The page with fills applied, if one is loaded.
    pub fn buffer(&self) -> Option<&PixelBuffer> {
        self.image.as_ref().map(|img| &img.buffer)
    }

    pub fn layout(&self) -> &Layout { &self.layout }

    pub fn viewport(&self) -> (f64, f64) { self.viewport }

    pub fn fills(&self) -> &FillHistory { &self.fills }

    pub fn strokes(&self) -> &StrokeStore { &self.strokes }

    pub fn is_painting(&self) -> bool { self.painting }

    /// Bumped whenever the page raster or its layout changes.
    pub fn background_generation(&self) -> u64 { self.background_generation }

    /// Bumped whenever the stroke set or any stroke's points change.
    pub fn strokes_generation(&self) -> u64 { self.strokes_generation }

    // ---- tool selection -----------------------------------------------------

    pub fn set_tool(&mut self, tool: Tool) {
        if self.tool != tool {
            self.painting = false;
            self.tool = tool;
        }
    }

    pub fn set_color_hex(&mut self, hex: &str) {
        self.tools.set_hex_color(hex);
    }

    pub fn select_palette(&mut self, index: usize) -> bool {
        self.tools.select_palette(index)
    }

    pub fn set_brush_size(&mut self, size: f64) -> bool {
        self.tools.set_brush_size(size)
    }

    // ---- image lifecycle ----------------------------------------------------

    /// Make `image` the current page. Fills and strokes from the previous
    /// page are dropped in the same step.
    pub fn load_image(&mut self, name: &str, image: RgbaImage) {
        let pristine = PixelBuffer::from_rgba_image(image);
        let (w, h) = pristine.dimensions();

        self.fills.clear();
        self.strokes.clear();
        self.painting = false;
        self.layout = fit_to_container(w, h, self.viewport.0, self.viewport.1);
        self.stroke_layout = self.layout;
        self.image = Some(LoadedImage {
            name: name.to_string(),
            buffer: pristine.clone(),
            pristine,
        });
        self.background_generation += 1;
        self.strokes_generation += 1;

        crate::log_info!("Loaded '{}' ({}×{}), layout {:?}", name, w, h, self.layout);
    }

    /// Decode `name` from `library` and load it. On failure the current page
    /// and everything drawn on it are kept as they were.
    pub fn load_from_library(&mut self, library: &ImageLibrary, name: &str) -> Result<(), LoadError> {
        match library.load(name) {
            Ok(image) => {
                self.load_image(name, image);
                Ok(())
            }
            Err(e) => {
                crate::log_err!("Failed to load '{}': {}", name, e);
                Err(e)
            }
        }
    }

    /// Drop all fills and strokes and restore the page as it was loaded.
    pub fn clear(&mut self) {
        self.fills.clear();
        self.strokes.clear();
        self.painting = false;
        self.strokes_generation += 1;

        if let Some(img) = self.image.as_mut() {
            img.buffer = img.pristine.clone();
            let (w, h) = img.pristine.dimensions();
            self.layout = fit_to_container(w, h, self.viewport.0, self.viewport.1);
            self.stroke_layout = self.layout;
            self.background_generation += 1;
            crate::log_info!("Cleared '{}'", img.name);
        }
    }

    // ---- pointer input ------------------------------------------------------

    /// Press. In brush mode over the page this starts a stroke.
    pub fn pointer_down(&mut self, pos: Point) -> bool {
        if self.tool != Tool::Brush || self.image.is_none() || !self.layout.contains(pos) {
            return false;
        }
        self.strokes.begin(pos, self.tools.color, self.tools.brush_size);
        self.painting = true;
        self.strokes_generation += 1;
        true
    }

    /// Drag. Extends the active stroke; ignored when not painting.
    pub fn pointer_move(&mut self, pos: Point) -> bool {
        if !self.painting || self.tool != Tool::Brush {
            return false;
        }
        self.strokes.extend(pos);
        self.strokes_generation += 1;
        true
    }

    pub fn pointer_up(&mut self) {
        self.painting = false;
    }

    /// Click / tap. In fill mode this bucket-fills the region under `pos` and
    /// records the fill. `None` when not in fill mode or no page is loaded.
    pub fn click(&mut self, pos: Point) -> Option<FillOutcome> {
        if self.tool != Tool::Fill {
            return None;
        }
        let img = self.image.as_mut()?;

        let Some((rx, ry)) = self.layout.relative_position(pos) else {
            return Some(FillOutcome::Skipped(SkipReason::OutOfBounds));
        };
        let (w, h) = img.buffer.dimensions();
        let Some((x, y)) = relative_to_native(rx, ry, w, h) else {
            return Some(FillOutcome::Skipped(SkipReason::OutOfBounds));
        };

        let color = self.tools.color;
        self.fills.record(rx, ry, color);
        let outcome = flood_fill_with(&mut img.buffer, x, y, color, &self.tolerances);
        if let FillOutcome::Filled { pixels, .. } = outcome {
            self.background_generation += 1;
            crate::log_info!("Fill {} at ({}, {}): {} px", color.to_hex(), x, y, pixels);
        }
        Some(outcome)
    }

    /// Remove the newest stroke. Fills are not affected.
    pub fn undo(&mut self) -> Option<Stroke> {
        let removed = self.strokes.undo();
        if removed.is_some() {
            self.painting = false;
            self.strokes_generation += 1;
        }
        removed
    }

    // ---- viewport -----------------------------------------------------------

    /// Note a new viewport size. The reflow runs from [`Session::poll`] once
    /// no further resize has arrived for the debounce delay.
    pub fn request_resize(&mut self, width: f64, height: f64, now: Instant) {
        self.pending_viewport = Some((width, height));
        self.resize.schedule(now);
    }

    /// Apply a debounced resize if it is due. Returns `true` if one ran.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.resize.fire_if_due(now) {
            self.apply_pending_resize()
        } else {
            false
        }
    }

    /// Apply any pending resize immediately.
    pub fn flush_resize(&mut self) -> bool {
        if self.resize.flush() {
            self.apply_pending_resize()
        } else {
            false
        }
    }

    pub fn resize_pending(&self) -> bool {
        self.resize.is_pending()
    }

    fn apply_pending_resize(&mut self) -> bool {
        match self.pending_viewport.take() {
            Some((w, h)) => {
                self.resize_now(w, h);
                true
            }
            None => false,
        }
    }

    /// Re-fit the page to a new viewport: strokes follow the page, and fills
    /// are rebuilt by replaying the history over a fresh copy of the source.
    ///
    /// While the viewport is degenerate (e.g. minimized) strokes keep their
    /// points and are carried over from the last real layout once it returns.
    pub fn resize_now(&mut self, width: f64, height: f64) {
        self.viewport = (width, height);
        let Some(img) = self.image.as_mut() else { return };

        let (w, h) = img.pristine.dimensions();
        let new = fit_to_container(w, h, width, height);
        self.layout = new;

        if !new.is_empty() {
            self.strokes.remap(&self.stroke_layout, &new);
            self.stroke_layout = new;
            self.strokes_generation += 1;
        } else {
            self.painting = false;
        }

        img.buffer = img.pristine.clone();
        let replayed = self.fills.replay_all(&mut img.buffer, &self.tolerances);
        self.background_generation += 1;

        crate::log_info!(
            "Resized to {}×{}: layout {:?}, replayed {}/{} fills",
            width,
            height,
            new,
            replayed,
            self.fills.len()
        );
    }

    // ---- export -------------------------------------------------------------

    /// Flatten the viewport (page, fills and strokes on white) at
    /// `pixel_ratio` times display size.
    pub fn export(&self, pixel_ratio: f64) -> Result<RgbaImage, ExportError> {
        let empty = PixelBuffer::new(0, 0);
        let buffer = self.buffer().unwrap_or(&empty);
        composite_stage(buffer, &self.layout, self.viewport, &self.strokes, pixel_ratio, Color::WHITE)
    }
}
