//! Core library for pdfannots
//!
//! This crate implements the **Functional Core** of pdfannots, following the
//! Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! pdfannots is split into three crates:
//!
//! - **`pdfannots_core`** (this crate): Pure transformation functions with zero I/O
//! - **`pdf`**: Reads annotations, outlines and page layouts out of PDF files
//! - **`pdfannots`**: The command line shell that wires the two together
//!
//! ## Functional Core Principles
//!
//! Everything here works on plain data handed over by the `pdf` crate:
//!
//! - **Pure functions**: Same input always produces the same output
//! - **No side effects**: No file access, no global state
//! - **Testable**: Fixture layouts and annotations, no PDF files needed
//!
//! # Module Organization
//!
//! - [`geometry`]: Rectangles and the overlap test
//! - [`annotation`]: Annotation records and their captured-text buffers
//! - [`layout`]: The per-page tree of positioned glyphs and inferred whitespace
//! - [`reconcile`]: Routes glyph text into the annotations that cover it
//! - [`position`]: Anchor positions and the column-aware reading order
//! - [`outline`]: Bookmark lookup by position
//! - [`document`]: Pages, ingestion and final resolution
//! - [`org`]: Org-mode rendering
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use pdfannots_core::{Document, LayoutItem, Page, RawAnnotation, Rect};
//!
//! let mut page = Page::new(0, Rect::new(0.0, 0.0, 612.0, 792.0));
//! page.ingest(records);
//! page.reconcile(&layout);
//!
//! let doc = Document { title: None, pages: vec![page], outlines: Default::default() };
//! let annotations = doc.resolve(NonZeroUsize::new(2).unwrap())?;
//! print!("{}", render_org(&annotations, &OrgOptions::default()));
//! ```

pub mod annotation;
pub mod document;
pub mod geometry;
pub mod layout;
pub mod org;
pub mod outline;
pub mod position;
pub mod reconcile;

pub use annotation::{Annotation, AnnotationKind, MISSING_TEXT};
pub use document::{Document, Page, RawAnnotation, ResolvedAnnotation};
pub use geometry::{overlaps, Rect};
pub use layout::LayoutItem;
pub use org::{render_org, OrgOptions, Section};
pub use outline::{Outline, OutlineIndex};
pub use position::{Pos, ReadingOrder};

/// Errors raised while resolving annotations.
#[derive(Debug, thiserror::Error)]
pub enum AnnotsError {
    #[error("{kind} annotation on page {page} has neither text nor a comment")]
    EmptyAnnotation { page: usize, kind: AnnotationKind },
}
