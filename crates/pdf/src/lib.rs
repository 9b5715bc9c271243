//! PDF input for pdfannots.
//!
//! Reads annotations, bookmarks and the text layout of annotated pages out
//! of a PDF and hands them to `pdfannots_core` as a reconciled
//! [`pdfannots_core::Document`].

use std::path::Path;

use pdfannots_core::{Document, Outline, OutlineIndex, Page, Pos, Rect};
use thiserror::Error;

use parser::backend::{LopdfBackend, PdfBackend};
use parser::outline::OutlineTarget;

pub mod parser;
pub mod types;

pub use types::*;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// A loaded PDF ready for annotation extraction.
pub struct AnnotatedPdf {
    backend: LopdfBackend,
}

/// The outcome of [`AnnotatedPdf::extract`].
#[derive(Debug, Clone)]
pub struct Extracted {
    pub document: Document,
    pub stats: ExtractStats,
}

impl AnnotatedPdf {
    /// Parse PDF bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfError> {
        Ok(AnnotatedPdf {
            backend: LopdfBackend::load_bytes(bytes)?,
        })
    }

    /// Read and parse a PDF file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PdfError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn page_count(&self) -> usize {
        self.backend.page_count()
    }

    pub fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata::from_info(&self.backend.metadata(), self.backend.page_count())
    }

    /// Read every page's annotations, recover the text under them and
    /// resolve the document's bookmarks.
    ///
    /// `on_page(done, total)` is called after each page.
    pub fn extract(&self, mut on_page: impl FnMut(usize, usize)) -> Result<Extracted, PdfError> {
        let page_ids = self.backend.pages();
        let total = page_ids.len();
        let mut stats = ExtractStats {
            pages: total,
            ..Default::default()
        };
        let mut pages = Vec::with_capacity(total);

        for (index, &page_id) in page_ids.values().enumerate() {
            let media_box = Rect::from_array(self.backend.page_media_box(page_id)?);
            let mut page = Page::new(index, media_box);
            page.ingest(self.backend.page_annotations(page_id)?);

            if page.needs_text() {
                let layout = parser::layout::page_layout(&self.backend, page_id)?;
                page.reconcile(&layout);
                stats.pages_laid_out += 1;
            }

            log::debug!(
                "page {}/{}: {} annotation(s)",
                index + 1,
                total,
                page.annotations.len()
            );
            stats.annotations += page.annotations.len();
            pages.push(page);
            on_page(index + 1, total);
        }

        let outlines = resolve_outlines(self.backend.outlines(), &pages);
        stats.outlines = outlines.len();

        let document = Document {
            title: self.metadata().title,
            pages,
            outlines,
        };

        Ok(Extracted { document, stats })
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Place bookmarks on their pages; unspecified coordinates fall back to the
/// top-left corner of the page's media box.
fn resolve_outlines(targets: Vec<OutlineTarget>, pages: &[Page]) -> OutlineIndex {
    let entries = targets
        .into_iter()
        .filter_map(|target| {
            let Some(page) = pages.get(target.page) else {
                log::warn!("outline '{}': page {} not found", target.title, target.page + 1);
                return None;
            };
            let media_box = page.media_box;
            let pos = Pos::new(
                target.page,
                target.left.unwrap_or(media_box.x0),
                target.top.unwrap_or(media_box.y1),
            );
            Some(Outline::new(target.title, target.dest, pos))
        })
        .collect();

    OutlineIndex::new(entries)
}
