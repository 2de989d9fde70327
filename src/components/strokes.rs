use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::components::colors::Color;
use crate::ops::geometry::{Layout, Point, remap_stroke_point};

/// A freehand brush stroke in current display coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub id: Uuid,
    pub points: Vec<Point>,
    pub color: Color,
    pub width: f64,
}

impl Stroke {
    pub fn new(start: Point, color: Color, width: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            points: vec![start],
            color,
            width,
        }
    }
}

/// Ordered strokes, oldest first. Only the newest is ever extended.
#[derive(Clone, Debug, Default)]
pub struct StrokeStore {
    strokes: Vec<Stroke>,
}

impl StrokeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new stroke with a single point. Returns its id.
    pub fn begin(&mut self, start: Point, color: Color, width: f64) -> Uuid {
        let stroke = Stroke::new(start, color, width);
        let id = stroke.id;
        self.strokes.push(stroke);
        id
    }

    /// Append a point to the newest stroke. No-op when the store is empty.
    pub fn extend(&mut self, point: Point) {
        if let Some(stroke) = self.strokes.last_mut() {
            stroke.points.push(point);
        }
    }

    /// Remove and return the newest stroke.
    pub fn undo(&mut self) -> Option<Stroke> {
        self.strokes.pop()
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
    }

    /// Carry every point from `old` to `new` so strokes stay on the same part
    /// of the image.
    pub fn remap(&mut self, old: &Layout, new: &Layout) {
        for stroke in &mut self.strokes {
            for p in &mut stroke.points {
                *p = remap_stroke_point(*p, old, new);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stroke> {
        self.strokes.iter()
    }

    pub fn last(&self) -> Option<&Stroke> {
        self.strokes.last()
    }
}
