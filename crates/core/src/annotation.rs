use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;
use crate::position::Pos;

/// Returned instead of blank text when an annotation has boxes but nothing
/// was captured under them.
pub const MISSING_TEXT: &str = "(XXX: missing text!)";

/// Ligatures and typographic punctuation replaced with plain ASCII.
const SUBSTITUTIONS: &[(char, &str)] = &[
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{2026}', "..."),
];

/// Replace ligatures, curly quotes and ellipses with their ASCII spelling.
pub fn substitute_special_chars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match SUBSTITUTIONS.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => out.push_str(to),
            None => out.push(c),
        }
    }
    out
}

/// The annotation subtypes that are kept at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationKind {
    Text,
    Highlight,
    Squiggly,
    StrikeOut,
    Underline,
}

impl AnnotationKind {
    /// Map a PDF `/Subtype` name to a kind; other subtypes are not supported.
    pub fn from_subtype(name: &str) -> Option<Self> {
        match name {
            "Text" => Some(AnnotationKind::Text),
            "Highlight" => Some(AnnotationKind::Highlight),
            "Squiggly" => Some(AnnotationKind::Squiggly),
            "StrikeOut" => Some(AnnotationKind::StrikeOut),
            "Underline" => Some(AnnotationKind::Underline),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationKind::Text => "Text",
            AnnotationKind::Highlight => "Highlight",
            AnnotationKind::Squiggly => "Squiggly",
            AnnotationKind::StrikeOut => "StrikeOut",
            AnnotationKind::Underline => "Underline",
        }
    }

    /// Small textual corrections: squiggles, strikeouts and underlines.
    pub fn is_nit(&self) -> bool {
        matches!(
            self,
            AnnotationKind::Squiggly | AnnotationKind::StrikeOut | AnnotationKind::Underline
        )
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A reviewer annotation on one page.
///
/// The captured-text buffer is only written by the reconciliation pass of
/// the owning page; read it back through [`Annotation::recovered_text`].
#[derive(Debug, Clone)]
pub struct Annotation {
    /// 0-based index of the owning page.
    pub page: usize,
    pub kind: AnnotationKind,
    /// Regions covered by the markup, one per quadrilateral.
    pub boxes: Option<Vec<Rect>>,
    pub rect: Option<Rect>,
    /// The reviewer's comment, never `Some("")`.
    pub contents: Option<String>,
    pub author: Option<String>,
    text: String,
}

impl Annotation {
    pub fn new(page: usize, kind: AnnotationKind) -> Self {
        Annotation {
            page,
            kind,
            boxes: None,
            rect: None,
            contents: None,
            author: None,
            text: String::new(),
        }
    }

    pub fn with_boxes(mut self, boxes: Vec<Rect>) -> Self {
        self.boxes = Some(boxes);
        self
    }

    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = Some(rect);
        self
    }

    /// Set the comment; an empty string counts as no comment.
    pub fn with_contents(mut self, contents: impl Into<String>) -> Self {
        let contents = contents.into();
        self.contents = (!contents.is_empty()).then_some(contents);
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn has_boxes(&self) -> bool {
        self.boxes.as_ref().is_some_and(|b| !b.is_empty())
    }

    /// Does any of this annotation's boxes cover most of `item`?
    pub fn covers(&self, item: &Rect) -> bool {
        self.boxes
            .iter()
            .flatten()
            .any(|b| crate::geometry::overlaps(item, b))
    }

    /// Append captured text.
    pub fn capture(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Account for a line break in the captured text.
    ///
    /// A trailing hyphen is dropped so that words split across lines are
    /// joined; otherwise the break becomes a single space, and repeated
    /// breaks never stack.
    pub fn capture_newline(&mut self) {
        if self.text.ends_with('-') {
            self.text.pop();
        } else if !self.text.ends_with(' ') {
            self.text.push(' ');
        }
    }

    /// Raw captured buffer, before trimming and substitutions.
    pub fn captured(&self) -> &str {
        &self.text
    }

    /// Text covered by the annotation.
    ///
    /// `None` for pure comments (no boxes). When boxes exist but nothing
    /// printable was captured, returns [`MISSING_TEXT`].
    pub fn recovered_text(&self) -> Option<String> {
        if !self.has_boxes() {
            return None;
        }
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            Some(MISSING_TEXT.to_string())
        } else {
            Some(substitute_special_chars(trimmed))
        }
    }

    /// Ordering anchor: the rectangle if present, else the first box.
    pub fn anchor(&self) -> Option<Pos> {
        self.rect
            .as_ref()
            .or_else(|| self.boxes.as_ref().and_then(|b| b.first()))
            .map(|r| Pos::anchor_of(self.page, r))
    }
}
