use serde::{Deserialize, Serialize};

use crate::position::{Pos, ReadingOrder};

/// A document bookmark with a resolved position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    pub title: String,
    /// The destination as written in the document (a name or an explicit
    /// destination array), kept for diagnostics.
    pub dest: String,
    pub pos: Pos,
}

impl Outline {
    pub fn new(title: impl Into<String>, dest: impl Into<String>, pos: Pos) -> Self {
        Outline {
            title: title.into(),
            dest: dest.into(),
            pos,
        }
    }
}

/// Document outlines in bookmark order.
///
/// Bookmark order is assumed to follow reading order; it is never re-sorted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutlineIndex {
    entries: Vec<Outline>,
}

impl OutlineIndex {
    pub fn new(entries: Vec<Outline>) -> Self {
        OutlineIndex { entries }
    }

    pub fn entries(&self) -> &[Outline] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The last outline that starts strictly before `pos`.
    pub fn nearest_preceding(&self, pos: &Pos, order: &ReadingOrder) -> Option<&Outline> {
        self.entries
            .iter()
            .take_while(|o| order.precedes(&o.pos, pos))
            .last()
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::*;
    use crate::geometry::Rect;

    fn order() -> ReadingOrder {
        ReadingOrder::new(
            NonZeroUsize::new(1).unwrap(),
            vec![Rect::new(0.0, 0.0, 600.0, 800.0); 3],
        )
    }

    fn index() -> OutlineIndex {
        OutlineIndex::new(vec![
            Outline::new("Introduction", "sec.1", Pos::new(0, 72.0, 700.0)),
            Outline::new("Method", "sec.2", Pos::new(0, 72.0, 300.0)),
            Outline::new("Results", "sec.3", Pos::new(1, 72.0, 500.0)),
        ])
    }

    #[test]
    fn test_between_first_and_second() {
        let idx = index();
        let found = idx.nearest_preceding(&Pos::new(0, 100.0, 500.0), &order());
        assert_eq!(found.map(|o| o.title.as_str()), Some("Introduction"));
    }

    #[test]
    fn test_after_last() {
        let idx = index();
        let found = idx.nearest_preceding(&Pos::new(2, 0.0, 800.0), &order());
        assert_eq!(found.map(|o| o.title.as_str()), Some("Results"));
    }

    #[test]
    fn test_before_first_is_none() {
        let idx = index();
        assert!(idx
            .nearest_preceding(&Pos::new(0, 72.0, 750.0), &order())
            .is_none());
    }

    #[test]
    fn test_equal_position_is_not_preceding() {
        let idx = index();
        let found = idx.nearest_preceding(&Pos::new(0, 72.0, 300.0), &order());
        assert_eq!(found.map(|o| o.title.as_str()), Some("Introduction"));
    }

    #[test]
    fn test_empty_index_is_none() {
        let idx = OutlineIndex::default();
        assert!(idx.is_empty());
        assert!(idx
            .nearest_preceding(&Pos::new(0, 0.0, 0.0), &order())
            .is_none());
    }
}
