//! The per-page primitive tree handed over by the layout collaborator.

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// One node of a page's primitive tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayoutItem {
    /// Grouping node with no geometry of its own (a page, a text line).
    Container(Vec<LayoutItem>),
    /// A block of wrapped text lines with its aggregate box. Closing a text
    /// group ends the current line for every annotation that touched it.
    TextGroup { bbox: Rect, children: Vec<LayoutItem> },
    /// A glyph drawn at a known position.
    Char { bbox: Rect, text: String },
    /// Whitespace inferred by layout analysis; it has no position. `"\n"`
    /// marks a line break.
    Whitespace(String),
}

impl LayoutItem {
    pub fn char(bbox: Rect, text: impl Into<String>) -> Self {
        LayoutItem::Char {
            bbox,
            text: text.into(),
        }
    }

    pub fn space() -> Self {
        LayoutItem::Whitespace(" ".to_string())
    }

    pub fn newline() -> Self {
        LayoutItem::Whitespace("\n".to_string())
    }

    /// `true` for an inferred line break.
    pub fn is_line_break(&self) -> bool {
        matches!(self, LayoutItem::Whitespace(ws) if ws == "\n")
    }

    /// Box of this item, computing the union of the children for plain
    /// containers. Whitespace and empty containers have none.
    pub fn bbox(&self) -> Option<Rect> {
        match self {
            LayoutItem::Char { bbox, .. } | LayoutItem::TextGroup { bbox, .. } => Some(*bbox),
            LayoutItem::Container(children) => children
                .iter()
                .filter_map(LayoutItem::bbox)
                .reduce(|acc, b| acc.union(&b)),
            LayoutItem::Whitespace(_) => None,
        }
    }

    /// Concatenated text of the subtree, whitespace markers included.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            LayoutItem::Container(children) | LayoutItem::TextGroup { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
            LayoutItem::Char { text, .. } | LayoutItem::Whitespace(text) => out.push_str(text),
        }
    }
}
