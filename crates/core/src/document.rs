//! Pages, ingestion of raw annotation records and resolution of the final,
//! ordered annotation list.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::annotation::{substitute_special_chars, Annotation, AnnotationKind};
use crate::geometry::Rect;
use crate::layout::LayoutItem;
use crate::outline::OutlineIndex;
use crate::position::{Pos, ReadingOrder};
use crate::reconcile::reconcile_page;
use crate::AnnotsError;

/// An annotation as read from the document, before any filtering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAnnotation {
    /// The `/Subtype` name, e.g. `Highlight`.
    pub subtype: String,
    /// Flat `/QuadPoints` array, eight numbers per quadrilateral.
    pub quad_points: Option<Vec<f32>>,
    pub rect: Option<[f32; 4]>,
    pub contents: Option<String>,
    pub author: Option<String>,
}

/// Normalize a comment: unify line endings and replace special characters.
pub fn normalize_contents(contents: &str) -> String {
    let unified = contents.replace("\r\n", "\n").replace('\r', "\n");
    substitute_special_chars(&unified)
}

/// Group a flat quad-point array into boxes.
///
/// Numbers left over after the last complete group of eight are ignored.
pub fn quad_points_to_boxes(points: &[f32]) -> Vec<Rect> {
    let chunks = points.chunks_exact(8);
    if !chunks.remainder().is_empty() {
        log::warn!(
            "ignoring {} trailing quad point value(s)",
            chunks.remainder().len()
        );
    }
    chunks.filter_map(Rect::from_quad).collect()
}

/// Turn the raw records of page `page` into annotations, dropping
/// unsupported subtypes.
pub fn ingest_annotations(page: usize, records: Vec<RawAnnotation>) -> Vec<Annotation> {
    records
        .into_iter()
        .filter_map(|record| {
            let kind = AnnotationKind::from_subtype(&record.subtype)?;
            let mut annotation = Annotation::new(page, kind);
            annotation.boxes = record.quad_points.as_deref().map(quad_points_to_boxes);
            annotation.rect = record.rect.map(Rect::from_array);
            if let Some(contents) = record.contents {
                annotation = annotation.with_contents(normalize_contents(&contents));
            }
            annotation.author = record.author;
            Some(annotation)
        })
        .collect()
}

/// One page of the document and the annotations drawn on it.
#[derive(Debug, Clone)]
pub struct Page {
    /// 0-based page index.
    pub index: usize,
    pub media_box: Rect,
    pub annotations: Vec<Annotation>,
}

impl Page {
    pub fn new(index: usize, media_box: Rect) -> Self {
        Page {
            index,
            media_box,
            annotations: Vec::new(),
        }
    }

    /// Ingest raw annotation records for this page.
    pub fn ingest(&mut self, records: Vec<RawAnnotation>) {
        self.annotations.extend(ingest_annotations(self.index, records));
    }

    /// Whether any annotation here needs the page's text.
    pub fn needs_text(&self) -> bool {
        self.annotations.iter().any(Annotation::has_boxes)
    }

    /// Capture the text under this page's annotations from its layout.
    pub fn reconcile(&mut self, layout: &LayoutItem) {
        reconcile_page(&mut self.annotations, layout);
    }
}

/// An annotation ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAnnotation {
    pub kind: AnnotationKind,
    /// 0-based page index.
    pub page: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<Pos>,
    /// Title of the nearest preceding outline entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// A fully reconciled document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub title: Option<String>,
    pub pages: Vec<Page>,
    pub outlines: OutlineIndex,
}

impl Document {
    /// Reading order for this document's pages.
    pub fn reading_order(&self, columns: NonZeroUsize) -> ReadingOrder {
        ReadingOrder::new(columns, self.pages.iter().map(|p| p.media_box).collect())
    }

    pub fn annotation_count(&self) -> usize {
        self.pages.iter().map(|p| p.annotations.len()).sum()
    }

    /// Every annotation in reading order, labelled with its outline.
    ///
    /// Fails if an annotation carries neither text nor a comment, which means
    /// the ingestion contract was broken.
    pub fn resolve(&self, columns: NonZeroUsize) -> Result<Vec<ResolvedAnnotation>, AnnotsError> {
        let order = self.reading_order(columns);
        let mut resolved = Vec::with_capacity(self.annotation_count());

        for page in &self.pages {
            let mut annotations: Vec<(&Annotation, Option<Pos>)> =
                page.annotations.iter().map(|a| (a, a.anchor())).collect();
            // Anchorless annotations keep their relative order after the rest.
            annotations.sort_by(|(_, a), (_, b)| match (a, b) {
                (Some(a), Some(b)) => order.compare(a, b),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            });

            for (annotation, pos) in annotations {
                resolved.push(resolve_one(annotation, pos, &order, &self.outlines)?);
            }
        }

        Ok(resolved)
    }
}

fn resolve_one(
    annotation: &Annotation,
    pos: Option<Pos>,
    order: &ReadingOrder,
    outlines: &OutlineIndex,
) -> Result<ResolvedAnnotation, AnnotsError> {
    let text = annotation.recovered_text();
    let comment = annotation.contents.clone();

    if text.is_none() && comment.is_none() {
        return Err(AnnotsError::EmptyAnnotation {
            page: annotation.page + 1,
            kind: annotation.kind,
        });
    }

    let outline = pos
        .as_ref()
        .and_then(|p| outlines.nearest_preceding(p, order))
        .map(|o| o.title.clone());

    Ok(ResolvedAnnotation {
        kind: annotation.kind,
        page: annotation.page,
        pos,
        outline,
        text,
        comment,
        author: annotation.author.clone(),
    })
}
