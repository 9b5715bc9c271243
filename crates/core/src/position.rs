//! Anchor positions and the column-aware reading order.
//!
//! Reading order is top-to-bottom within a column, columns left to right,
//! pages in sequence. The number of columns is not detected: callers pass it
//! in, together with every page's media box, through [`ReadingOrder`].

use std::cmp::Ordering;
use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// A point on a page used for ordering and outline lookup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pos {
    /// 0-based page index.
    pub page: usize,
    pub x: f32,
    pub y: f32,
}

impl Pos {
    pub fn new(page: usize, x: f32, y: f32) -> Self {
        Pos { page, x, y }
    }

    /// Anchor of a box: its leftmost x and topmost y.
    pub fn anchor_of(page: usize, rect: &Rect) -> Self {
        Pos {
            page,
            x: rect.x0.min(rect.x1),
            y: rect.y0.max(rect.y1),
        }
    }
}

/// Total order over [`Pos`] values of one document.
#[derive(Debug, Clone)]
pub struct ReadingOrder {
    columns: NonZeroUsize,
    media_boxes: Vec<Rect>,
}

/// Page-local sort key: column, then clamped coordinates.
struct ColumnKey {
    column: usize,
    x: f32,
    y: f32,
}

impl ReadingOrder {
    /// `media_boxes[i]` is the media box of page `i`.
    pub fn new(columns: NonZeroUsize, media_boxes: Vec<Rect>) -> Self {
        ReadingOrder {
            columns,
            media_boxes,
        }
    }

    /// Compare two positions.
    ///
    /// Pages never interleave. Within a page the lower column index wins,
    /// then the greater clamped y (nearer the top), then the smaller clamped
    /// x, so two positions tie only when their clamped coordinates are equal.
    pub fn compare(&self, a: &Pos, b: &Pos) -> Ordering {
        a.page.cmp(&b.page).then_with(|| {
            let ka = self.column_key(a);
            let kb = self.column_key(b);
            ka.column
                .cmp(&kb.column)
                .then_with(|| kb.y.total_cmp(&ka.y))
                .then_with(|| ka.x.total_cmp(&kb.x))
        })
    }

    /// `true` when `a` comes strictly before `b`.
    pub fn precedes(&self, a: &Pos, b: &Pos) -> bool {
        self.compare(a, b) == Ordering::Less
    }

    fn column_key(&self, pos: &Pos) -> ColumnKey {
        let Some(media) = self.media_boxes.get(pos.page) else {
            // Unknown page geometry: no clamping, single column.
            return ColumnKey {
                column: 0,
                x: pos.x,
                y: pos.y,
            };
        };

        let (x, y) = media.clamp_point(pos.x, pos.y);
        let columns = self.columns.get();
        let column_width = media.width() / columns as f32;
        let column = if column_width > 0.0 {
            let index = ((x - media.x0) / column_width).floor() as usize;
            index.min(columns - 1)
        } else {
            0
        };

        ColumnKey { column, x, y }
    }
}
