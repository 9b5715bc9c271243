//! Axis-aligned boxes in PDF user space and the overlap test used to decide
//! whether a glyph belongs to an annotation.

use serde::{Deserialize, Serialize};

/// Fraction of a primitive's area that must fall inside an annotation box
/// for the primitive to count as covered.
pub const OVERLAP_THRESHOLD: f32 = 0.5;

/// An axis-aligned rectangle in PDF user space (y grows upwards).
///
/// Constructors normalize the corners so that `x0 <= x1` and `y0 <= y1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Rect {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Build a rectangle from a PDF `[llx lly urx ury]` array.
    pub fn from_array(values: [f32; 4]) -> Self {
        Rect::new(values[0], values[1], values[2], values[3])
    }

    /// Bounding box of one quadrilateral (`x1 y1 x2 y2 x3 y3 x4 y4`).
    ///
    /// Returns `None` unless exactly eight coordinates are supplied.
    pub fn from_quad(points: &[f32]) -> Option<Self> {
        if points.len() != 8 {
            return None;
        }
        let xs = points.iter().step_by(2).copied();
        let ys = points.iter().skip(1).step_by(2).copied();
        let (x0, x1) = xs.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        let (y0, y1) = ys.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        Some(Rect { x0, y0, x1, y1 })
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Area shared by `self` and `other`; zero when they do not touch.
    pub fn intersection_area(&self, other: &Rect) -> f32 {
        let x_overlap = (self.x1.min(other.x1) - self.x0.max(other.x0)).max(0.0);
        let y_overlap = (self.y1.min(other.y1) - self.y0.max(other.y0)).max(0.0);
        x_overlap * y_overlap
    }

    /// Smallest rectangle containing both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Clamp a point into this rectangle.
    pub fn clamp_point(&self, x: f32, y: f32) -> (f32, f32) {
        (x.clamp(self.x0, self.x1), y.clamp(self.y0, self.y1))
    }
}

/// Does most of `item` lie inside `target`?
///
/// Annotation quad points rarely line up exactly with glyph boxes, so a glyph
/// counts as covered once at least half of its area is inside the box. A
/// degenerate (zero-area) item never matches.
pub fn overlaps(item: &Rect, target: &Rect) -> bool {
    let item_area = item.area();
    if item_area <= 0.0 {
        return false;
    }
    item.intersection_area(target) >= OVERLAP_THRESHOLD * item_area
}
