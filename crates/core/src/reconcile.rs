//! Route the text of a page's primitive tree into annotation buffers.
//!
//! A single depth-first walk visits every primitive. Positioned glyphs go to
//! the annotations whose boxes cover them. Inferred whitespace has no
//! position, so it is attributed heuristically:
//!
//! - an inferred space goes only to the annotations hit by the most recent
//!   glyph (`last_hit`);
//! - a line break is broadcast to every annotation touched anywhere on the
//!   current line (`current_line`), so a highlight that continues on the
//!   next line is joined with a space (or dehyphenated) even if the last
//!   glyph of the line was not covered.
//!
//! Annotations are identified by their index in the page's annotation slice.

use std::collections::BTreeSet;

use crate::annotation::Annotation;
use crate::geometry::Rect;
use crate::layout::LayoutItem;

/// Capture text for every boxed annotation in `annotations` from `root`.
///
/// Annotations without boxes are left untouched. The traversal state lives
/// only for the duration of this call.
pub fn reconcile_page(annotations: &mut [Annotation], root: &LayoutItem) {
    let mut pass = PagePass::new(annotations);
    pass.visit(root);
    log::trace!("reconciled {} boxed annotation(s)", pass.candidates.len());
}

/// Traversal state for one page.
struct PagePass<'a> {
    annotations: &'a mut [Annotation],
    /// Indices of annotations that have boxes.
    candidates: Vec<usize>,
    last_hit: BTreeSet<usize>,
    current_line: BTreeSet<usize>,
}

impl<'a> PagePass<'a> {
    fn new(annotations: &'a mut [Annotation]) -> Self {
        let candidates = annotations
            .iter()
            .enumerate()
            .filter(|(_, a)| a.has_boxes())
            .map(|(i, _)| i)
            .collect();
        PagePass {
            annotations,
            candidates,
            last_hit: BTreeSet::new(),
            current_line: BTreeSet::new(),
        }
    }

    fn visit(&mut self, item: &LayoutItem) {
        match item {
            LayoutItem::Container(children) => {
                for child in children {
                    self.visit(child);
                }
            }
            LayoutItem::TextGroup { bbox, children } => {
                for child in children {
                    self.visit(child);
                }
                self.test_boxes(bbox);
                self.break_line();
            }
            LayoutItem::Char { bbox, text } => {
                for index in self.test_boxes(bbox) {
                    self.annotations[index].capture(text);
                }
            }
            LayoutItem::Whitespace(text) => {
                if item.is_line_break() {
                    self.break_line();
                } else {
                    for &index in &self.last_hit {
                        self.annotations[index].capture(text);
                    }
                }
            }
        }
    }

    /// Find the annotations covering `bbox`, remember them as the latest hit
    /// and add them to the current line.
    fn test_boxes(&mut self, bbox: &Rect) -> BTreeSet<usize> {
        let hits: BTreeSet<usize> = self
            .candidates
            .iter()
            .copied()
            .filter(|&i| self.annotations[i].covers(bbox))
            .collect();
        self.current_line.extend(hits.iter().copied());
        self.last_hit = hits.clone();
        hits
    }

    /// Broadcast a line break to everything seen on the current line.
    fn break_line(&mut self) {
        for index in std::mem::take(&mut self.current_line) {
            self.annotations[index].capture_newline();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationKind, MISSING_TEXT};

    const GLYPH_W: f32 = 5.0;
    const GLYPH_H: f32 = 10.0;

    /// Lay out `word` as glyphs starting at `x` on the baseline `y`.
    fn word(text: &str, x: f32, y: f32) -> Vec<LayoutItem> {
        text.chars()
            .enumerate()
            .map(|(i, c)| {
                let x0 = x + i as f32 * GLYPH_W;
                LayoutItem::char(Rect::new(x0, y, x0 + GLYPH_W, y + GLYPH_H), c.to_string())
            })
            .collect()
    }

    /// A line of words separated by inferred spaces, closed by a newline.
    fn line(words: &[&str], y: f32) -> LayoutItem {
        let mut items = Vec::new();
        let mut x = 0.0;
        for (i, w) in words.iter().enumerate() {
            if i > 0 {
                items.push(LayoutItem::space());
                x += GLYPH_W;
            }
            items.extend(word(w, x, y));
            x += w.chars().count() as f32 * GLYPH_W;
        }
        items.push(LayoutItem::newline());
        LayoutItem::Container(items)
    }

    fn group(lines: Vec<LayoutItem>) -> LayoutItem {
        let bbox = LayoutItem::Container(lines.clone())
            .bbox()
            .unwrap_or(Rect::new(0.0, 0.0, 0.0, 0.0));
        LayoutItem::TextGroup {
            bbox,
            children: lines,
        }
    }

    fn highlight(boxes: Vec<Rect>) -> Annotation {
        Annotation::new(0, AnnotationKind::Highlight).with_boxes(boxes)
    }

    #[test]
    fn test_single_line_capture() {
        // "systems are hard" occupies x 0..80 on baseline 100.
        let page = LayoutItem::Container(vec![group(vec![line(
            &["systems", "are", "hard"],
            100.0,
        )])]);
        let mut annots = vec![highlight(vec![Rect::new(-1.0, 99.0, 81.0, 111.0)])];

        reconcile_page(&mut annots, &page);

        assert_eq!(annots[0].recovered_text().as_deref(), Some("systems are hard"));
    }

    #[test]
    fn test_partial_line_capture() {
        // Only "are" (x 40..55) is covered.
        let page = LayoutItem::Container(vec![group(vec![line(
            &["systems", "are", "hard"],
            100.0,
        )])]);
        let mut annots = vec![highlight(vec![Rect::new(40.0, 99.0, 55.0, 111.0)])];

        reconcile_page(&mut annots, &page);

        assert_eq!(annots[0].recovered_text().as_deref(), Some("are"));
    }

    #[test]
    fn test_wrapped_highlight_joins_lines() {
        let page = LayoutItem::Container(vec![group(vec![
            line(&["one", "two"], 200.0),
            line(&["three", "four"], 180.0),
        ])]);
        // "two" on the first line, "three" on the second.
        let mut annots = vec![highlight(vec![
            Rect::new(20.0, 199.0, 35.0, 211.0),
            Rect::new(0.0, 179.0, 25.0, 191.0),
        ])];

        reconcile_page(&mut annots, &page);

        assert_eq!(annots[0].recovered_text().as_deref(), Some("two three"));
    }

    #[test]
    fn test_hyphenated_word_is_rejoined() {
        let page = LayoutItem::Container(vec![group(vec![
            line(&["auto-"], 200.0),
            line(&["matic"], 180.0),
        ])]);
        let mut annots = vec![highlight(vec![
            Rect::new(0.0, 199.0, 25.0, 211.0),
            Rect::new(0.0, 179.0, 25.0, 191.0),
        ])];

        reconcile_page(&mut annots, &page);

        assert_eq!(annots[0].recovered_text().as_deref(), Some("automatic"));
    }

    #[test]
    fn test_inferred_space_goes_only_to_last_hit() {
        // Annotation 0 covers "alpha", annotation 1 covers "beta".
        let page = LayoutItem::Container(vec![group(vec![line(&["alpha", "beta"], 100.0)])]);
        let mut annots = vec![
            highlight(vec![Rect::new(0.0, 99.0, 25.0, 111.0)]),
            highlight(vec![Rect::new(30.0, 99.0, 50.0, 111.0)]),
        ];

        reconcile_page(&mut annots, &page);

        // The space after "alpha" belongs to annotation 0 only.
        assert_eq!(annots[0].captured(), "alpha ");
        assert_eq!(annots[1].captured(), "beta ");
        assert_eq!(annots[1].recovered_text().as_deref(), Some("beta"));
    }

    #[test]
    fn test_space_not_leaked_after_uncovered_glyph() {
        // Annotation covers "a"; the following space comes after "bb", which
        // is not covered, so it must not be attributed.
        let page = LayoutItem::Container(vec![group(vec![line(&["abb", "c"], 100.0)])]);
        let mut annots = vec![highlight(vec![Rect::new(0.0, 99.0, 5.0, 111.0)])];

        reconcile_page(&mut annots, &page);

        assert_eq!(annots[0].captured(), "a ");
    }

    #[test]
    fn test_newline_broadcast_to_whole_line() {
        // The annotation covers the first word only, yet still receives the
        // line break because it was touched on this line.
        let page = LayoutItem::Container(vec![group(vec![
            line(&["first", "rest"], 200.0),
            line(&["next"], 180.0),
        ])]);
        let mut annots = vec![highlight(vec![
            Rect::new(0.0, 199.0, 25.0, 211.0),
            Rect::new(0.0, 179.0, 20.0, 191.0),
        ])];

        reconcile_page(&mut annots, &page);

        assert_eq!(annots[0].recovered_text().as_deref(), Some("first next"));
    }

    #[test]
    fn test_untouched_annotation_gets_no_newlines() {
        let page = LayoutItem::Container(vec![group(vec![
            line(&["one"], 200.0),
            line(&["two"], 180.0),
        ])]);
        let mut annots = vec![
            highlight(vec![Rect::new(0.0, 199.0, 15.0, 211.0)]),
            highlight(vec![Rect::new(300.0, 300.0, 400.0, 400.0)]),
        ];

        reconcile_page(&mut annots, &page);

        assert_eq!(annots[1].captured(), "");
        assert_eq!(annots[1].recovered_text().as_deref(), Some(MISSING_TEXT));
    }

    #[test]
    fn test_text_group_aggregate_box_hit() {
        // A box covering the whole paragraph also hits the group itself.
        let page = LayoutItem::Container(vec![group(vec![line(&["ab"], 100.0)])]);
        let mut annots = vec![highlight(vec![Rect::new(-5.0, 90.0, 50.0, 120.0)])];

        reconcile_page(&mut annots, &page);

        assert_eq!(annots[0].captured(), "ab ");
    }

    #[test]
    fn test_comment_annotations_are_ignored() {
        let page = LayoutItem::Container(vec![group(vec![line(&["text"], 100.0)])]);
        let mut annots = vec![Annotation::new(0, AnnotationKind::Text)
            .with_rect(Rect::new(0.0, 0.0, 500.0, 500.0))
            .with_contents("note")];

        reconcile_page(&mut annots, &page);

        assert_eq!(annots[0].captured(), "");
        assert_eq!(annots[0].recovered_text(), None);
    }

    #[test]
    fn test_state_does_not_leak_between_pages() {
        let first = LayoutItem::Container(vec![LayoutItem::Container(
            word("ab", 0.0, 100.0),
        )]);
        let second = LayoutItem::Container(vec![LayoutItem::space(), LayoutItem::newline()]);

        let mut page_one = vec![highlight(vec![Rect::new(0.0, 99.0, 10.0, 111.0)])];
        reconcile_page(&mut page_one, &first);
        assert_eq!(page_one[0].captured(), "ab");

        // The same annotations passed to a fresh page pass start clean: no
        // stray space from a previous last hit, no pending line break.
        reconcile_page(&mut page_one, &second);
        assert_eq!(page_one[0].captured(), "ab");
    }
}
