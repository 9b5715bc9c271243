//! Content-stream interpretation and page layout analysis.
//!
//! A page's content stream is interpreted into positioned glyphs, which are
//! grouped into lines and the lines into text boxes. The result is the
//! primitive tree consumed by annotation reconciliation.
//!
//! # Pipeline
//!
//! ```text
//! content ops  ->  Glyph[]  ->  GlyphLine[]  ->  TextBox[]  ->  LayoutItem
//!   (per page)     interpret    group_glyphs     group_lines     build_page_tree
//! ```
//!
//! Glyph boxes use the font's advance widths and a fixed vertical extent of
//! one em starting [`GLYPH_DESCENT`] below the baseline.

use pdfannots_core::{LayoutItem, Rect};

use super::backend::{get_number_from_value, ContentOp, PageId, PdfBackend, PdfValue};
use super::font::BackendFontInfo;
use crate::PdfError;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A single character drawn on the page, in default user space.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub text: String,
    pub bbox: Rect,
    /// Y of the baseline origin.
    pub baseline: f32,
    /// Rendered font size.
    pub font_size: f32,
}

impl Glyph {
    fn is_whitespace(&self) -> bool {
        self.text.chars().all(char::is_whitespace)
    }
}

/// Glyphs sharing a baseline with no large horizontal gap, left to right.
#[derive(Debug, Clone)]
pub struct GlyphLine {
    pub glyphs: Vec<Glyph>,
    pub bbox: Rect,
    pub baseline: f32,
    pub font_size: f32,
}

/// Consecutive lines stacked closely on top of each other.
#[derive(Debug, Clone)]
pub struct TextBox {
    pub lines: Vec<GlyphLine>,
    pub bbox: Rect,
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Glyphs whose baselines differ by less than this share a line.
const Y_TOLERANCE: f32 = 1.0;

/// A horizontal gap wider than this multiple of the font size splits a line.
const LINE_SPLIT_FACTOR: f32 = 1.5;

/// A gap wider than this multiple of the font size is an inferred space.
const WORD_GAP_FACTOR: f32 = 0.15;

/// Lines whose baselines are at most this multiple of the font size apart
/// belong to the same text box.
const BLOCK_GAP_FACTOR: f32 = 1.4;

/// Depth of the glyph box below the baseline, as a fraction of the font size.
pub const GLYPH_DESCENT: f32 = 0.2;

// ---------------------------------------------------------------------------
// CJK / spaceless-script helper
// ---------------------------------------------------------------------------

/// Returns `true` if `c` belongs to a script that does not use inter-word
/// spaces (CJK Unified Ideographs, Hiragana, Katakana, Hangul, Thai, etc.).
pub fn is_spaceless_script_char(c: char) -> bool {
    matches!(
        c as u32,
        // CJK Unified Ideographs and extensions A, B
        0x4E00..=0x9FFF
        | 0x3400..=0x4DBF
        | 0x20000..=0x2A6DF
        // CJK Compatibility Ideographs
        | 0xF900..=0xFAFF
        // Hiragana, Katakana and phonetic extensions
        | 0x3040..=0x30FF
        | 0x31F0..=0x31FF
        // Hangul syllables and jamo
        | 0xAC00..=0xD7AF
        | 0x1100..=0x11FF
        | 0x3130..=0x318F
        // CJK Symbols and Punctuation
        | 0x3000..=0x303F
        // Fullwidth Forms
        | 0xFF00..=0xFFEF
        // Thai, Lao, Tibetan, Myanmar, Khmer
        | 0x0E00..=0x0EFF
        | 0x0F00..=0x109F
        | 0x1780..=0x17FF
    )
}

// ---------------------------------------------------------------------------
// Internal: matrices
// ---------------------------------------------------------------------------

/// A 2x3 affine matrix `[a, b, c, d, e, f]`, applied to row vectors.
type Matrix = [f32; 6];

const IDENTITY_MATRIX: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `m × n`: apply `m` first, then `n`.
fn multiply(m: &Matrix, n: &Matrix) -> Matrix {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

fn apply(m: &Matrix, x: f32, y: f32) -> (f32, f32) {
    (x * m[0] + y * m[2] + m[4], x * m[1] + y * m[3] + m[5])
}

fn matrix_operands(operands: &[PdfValue]) -> Option<Matrix> {
    let vals: Vec<f32> = operands
        .iter()
        .take(6)
        .filter_map(get_number_from_value)
        .collect();
    <[f32; 6]>::try_from(vals).ok()
}

// ---------------------------------------------------------------------------
// Internal: PDF text-state machine
// ---------------------------------------------------------------------------

/// Text state parameters; saved and restored with the graphics state.
#[derive(Debug, Clone)]
struct TextState {
    /// Current font resource name (the `/F1`-style key).
    font_key: Vec<u8>,
    font_size: f32,
    /// Text matrix, reset by BT.
    text_matrix: Matrix,
    /// Text line matrix, updated by Td/TD/T*/Tm.
    line_matrix: Matrix,
    /// Horizontal scaling factor (percent / 100).
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_size: 0.0,
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    /// Advance the text matrix horizontally by `dx` text-space units.
    fn advance_x(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    /// Multiply the text line matrix by a translation (used by Td / TD).
    fn translate_line(&mut self, tx: f32, ty: f32) {
        let (x, y) = apply(&self.line_matrix, tx, ty);
        self.line_matrix[4] = x;
        self.line_matrix[5] = y;
        self.text_matrix = self.line_matrix;
    }
}

/// Resolve a font resource name to its [`BackendFontInfo`].
fn resolve_font<'a>(key: &[u8], fonts: &'a [BackendFontInfo]) -> Option<&'a BackendFontInfo> {
    fonts.iter().find(|info| info.name == key)
}

/// Walks content streams and records every glyph drawn.
struct Interpreter<'a> {
    backend: &'a dyn PdfBackend,
    page_id: PageId,
    state: TextState,
    ctm: Matrix,
    saved: Vec<(Matrix, TextState)>,
    glyphs: Vec<Glyph>,
    fallback_font: BackendFontInfo,
}

impl<'a> Interpreter<'a> {
    fn new(backend: &'a dyn PdfBackend, page_id: PageId) -> Self {
        Self {
            backend,
            page_id,
            state: TextState::default(),
            ctm: IDENTITY_MATRIX,
            saved: Vec::new(),
            glyphs: Vec::new(),
            fallback_font: BackendFontInfo::default(),
        }
    }

    /// Interpret `ops` with `fonts` as the active font resources.
    ///
    /// Form XObjects are followed from the page's own content stream only.
    fn run(
        &mut self,
        ops: &[ContentOp],
        fonts: &[BackendFontInfo],
        in_form: bool,
    ) -> Result<(), PdfError> {
        for op in ops {
            let operands = op.operands.as_slice();
            match op.operator.as_str() {
                // -- Graphics state -------------------------------------
                "q" => self.saved.push((self.ctm, self.state.clone())),
                "Q" => {
                    if let Some((ctm, state)) = self.saved.pop() {
                        self.ctm = ctm;
                        self.state = state;
                    }
                }
                "cm" => {
                    if let Some(m) = matrix_operands(operands) {
                        self.ctm = multiply(&m, &self.ctm);
                    }
                }
                "Do" if !in_form => {
                    if let Some(PdfValue::Name(name)) = operands.first() {
                        self.run_form(name)?;
                    }
                }

                // -- Text object delimiters ----------------------------
                "BT" => {
                    self.state.text_matrix = IDENTITY_MATRIX;
                    self.state.line_matrix = IDENTITY_MATRIX;
                }

                // -- Font -----------------------------------------------
                "Tf" => {
                    if let [PdfValue::Name(key), size, ..] = operands {
                        self.state.font_key = key.clone();
                        self.state.font_size = get_number_from_value(size).unwrap_or(0.0);
                    }
                }

                // -- Text matrix / position -----------------------------
                "Tm" => {
                    if let Some(m) = matrix_operands(operands) {
                        self.state.text_matrix = m;
                        self.state.line_matrix = m;
                    }
                }
                "Td" | "TD" => {
                    if let [tx, ty, ..] = operands {
                        let tx = get_number_from_value(tx).unwrap_or(0.0);
                        let ty = get_number_from_value(ty).unwrap_or(0.0);
                        if op.operator == "TD" {
                            self.state.leading = -ty;
                        }
                        self.state.translate_line(tx, ty);
                    }
                }
                "T*" => {
                    let leading = self.state.leading;
                    self.state.translate_line(0.0, -leading);
                }

                // -- Spacing / scaling ----------------------------------
                "TL" | "Tc" | "Tw" | "Tz" | "Ts" => {
                    if let Some(v) = operands.first().and_then(get_number_from_value) {
                        match op.operator.as_str() {
                            "TL" => self.state.leading = v,
                            "Tc" => self.state.char_spacing = v,
                            "Tw" => self.state.word_spacing = v,
                            "Tz" => self.state.horiz_scale = v / 100.0,
                            _ => self.state.text_rise = v,
                        }
                    }
                }

                // -- Show text ------------------------------------------
                "Tj" => {
                    if let Some(PdfValue::Str(bytes)) = operands.first() {
                        self.show(bytes, fonts);
                    }
                }
                "TJ" => {
                    if let Some(PdfValue::Array(elements)) = operands.first() {
                        self.show_array(elements, fonts);
                    }
                }
                "'" => {
                    let leading = self.state.leading;
                    self.state.translate_line(0.0, -leading);
                    if let Some(PdfValue::Str(bytes)) = operands.first() {
                        self.show(bytes, fonts);
                    }
                }
                "\"" => {
                    if let [aw, ac, PdfValue::Str(bytes), ..] = operands {
                        if let Some(aw) = get_number_from_value(aw) {
                            self.state.word_spacing = aw;
                        }
                        if let Some(ac) = get_number_from_value(ac) {
                            self.state.char_spacing = ac;
                        }
                        let leading = self.state.leading;
                        self.state.translate_line(0.0, -leading);
                        self.show(bytes, fonts);
                    }
                }

                _ => { /* Ignore non-text operators */ }
            }
        }
        Ok(())
    }

    fn run_form(&mut self, name: &[u8]) -> Result<(), PdfError> {
        let Some(form) = self.backend.form_xobject(self.page_id, name) else {
            return Ok(());
        };
        let ops = self.backend.decode_content(&form.content)?;
        let fonts = if form.fonts.is_empty() {
            self.backend.page_fonts(self.page_id).unwrap_or_default()
        } else {
            form.fonts
        };

        self.saved.push((self.ctm, self.state.clone()));
        self.ctm = multiply(&form.matrix, &self.ctm);
        let result = self.run(&ops, &fonts, true);
        if let Some((ctm, state)) = self.saved.pop() {
            self.ctm = ctm;
            self.state = state;
        }
        result
    }

    /// Record the glyphs of one string and advance the text position.
    fn show(&mut self, bytes: &[u8], fonts: &[BackendFontInfo]) {
        let font = resolve_font(&self.state.font_key, fonts).unwrap_or(&self.fallback_font);
        let composite = font.is_composite();

        for code in font.glyphs(bytes) {
            let st = &self.state;
            let size = st.font_size;
            let width = code.width * size * st.horiz_scale;
            let rendering = multiply(&st.text_matrix, &self.ctm);

            if !code.text.is_empty() {
                let y0 = st.text_rise - GLYPH_DESCENT * size;
                let y1 = y0 + size;
                let corners = [
                    apply(&rendering, 0.0, y0),
                    apply(&rendering, width, y0),
                    apply(&rendering, 0.0, y1),
                    apply(&rendering, width, y1),
                ];
                let (min_x, max_x, min_y, max_y) = corners.iter().fold(
                    (f32::MAX, f32::MIN, f32::MAX, f32::MIN),
                    |(x0, x1, y0, y1), &(x, y)| (x0.min(x), x1.max(x), y0.min(y), y1.max(y)),
                );
                let vertical_scale = (rendering[2].powi(2) + rendering[3].powi(2)).sqrt();

                self.glyphs.push(Glyph {
                    text: code.text.clone(),
                    bbox: Rect::new(min_x, min_y, max_x, max_y),
                    baseline: apply(&rendering, 0.0, st.text_rise).1,
                    font_size: (size * vertical_scale).abs(),
                });
            }

            let mut advance = code.width * size + st.char_spacing;
            if code.is_word_space(composite) {
                advance += st.word_spacing;
            }
            let advance = advance * st.horiz_scale;
            self.state.advance_x(advance);
        }
    }

    /// Process a `TJ` array: strings to show and kerning adjustments in
    /// thousandths of a text-space unit.
    fn show_array(&mut self, elements: &[PdfValue], fonts: &[BackendFontInfo]) {
        for element in elements {
            match element {
                PdfValue::Str(bytes) => self.show(bytes, fonts),
                other => {
                    if let Some(adj) = get_number_from_value(other) {
                        let dx = -adj / 1000.0 * self.state.font_size * self.state.horiz_scale;
                        self.state.advance_x(dx);
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Public API: glyph extraction
// ---------------------------------------------------------------------------

/// Walk a single page's content stream and collect its glyphs in drawing
/// order.
///
/// | Operator | Action |
/// |----------|--------|
/// | `q` `Q` `cm` | Save, restore and concatenate the graphics matrix |
/// | `Do`     | Draw a form XObject |
/// | `BT`     | Begin text object -- reset matrices |
/// | `Tf`     | Set font and size |
/// | `Tm` `Td` `TD` `T*` | Position text |
/// | `TL` `Tc` `Tw` `Tz` `Ts` | Text state parameters |
/// | `Tj` `TJ` `'` `"` | Show text |
pub fn extract_page_glyphs(
    backend: &dyn PdfBackend,
    page_id: PageId,
) -> Result<Vec<Glyph>, PdfError> {
    let raw_content = backend.page_content(page_id)?;
    let ops = backend.decode_content(&raw_content)?;
    let fonts = backend.page_fonts(page_id).unwrap_or_default();

    let mut interpreter = Interpreter::new(backend, page_id);
    interpreter.run(&ops, &fonts, false)?;
    Ok(interpreter.glyphs)
}

// ---------------------------------------------------------------------------
// Public API: glyph -> line grouping
// ---------------------------------------------------------------------------

/// Group glyphs into lines.
///
/// Glyphs whose baselines are within [`Y_TOLERANCE`] of each other form a
/// row; a row is split wherever the horizontal gap exceeds
/// [`LINE_SPLIT_FACTOR`] times the font size, so that columns sharing a
/// baseline stay apart. Lines are returned top to bottom, then left to right.
pub fn group_glyphs_into_lines(mut glyphs: Vec<Glyph>) -> Vec<GlyphLine> {
    glyphs.sort_by(|a, b| {
        b.baseline
            .total_cmp(&a.baseline)
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });

    let mut rows: Vec<Vec<Glyph>> = Vec::new();
    for glyph in glyphs {
        let same_row = rows
            .last()
            .is_some_and(|row| (row[0].baseline - glyph.baseline).abs() <= Y_TOLERANCE);
        match rows.last_mut() {
            Some(row) if same_row => row.push(glyph),
            _ => rows.push(vec![glyph]),
        }
    }

    let mut lines = Vec::new();
    for mut row in rows {
        row.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));

        let mut current: Vec<Glyph> = Vec::new();
        for glyph in row {
            if let Some(prev) = current.last() {
                let gap = glyph.bbox.x0 - prev.bbox.x1;
                if gap > LINE_SPLIT_FACTOR * prev.font_size.max(glyph.font_size) {
                    lines.push(assemble_line(std::mem::take(&mut current)));
                }
            }
            current.push(glyph);
        }
        if !current.is_empty() {
            lines.push(assemble_line(current));
        }
    }

    lines
}

/// Build a [`GlyphLine`] from glyphs already sorted left to right.
fn assemble_line(glyphs: Vec<Glyph>) -> GlyphLine {
    let bbox = glyphs
        .iter()
        .map(|g| g.bbox)
        .reduce(|acc, b| acc.union(&b))
        .unwrap_or(Rect::new(0.0, 0.0, 0.0, 0.0));
    let baseline = glyphs.first().map(|g| g.baseline).unwrap_or(0.0);
    let font_size = glyphs.iter().map(|g| g.font_size).fold(0.0, f32::max);

    GlyphLine {
        glyphs,
        bbox,
        baseline,
        font_size,
    }
}

/// Whether an inferred space belongs between two adjacent glyphs.
///
/// Needed when the gap exceeds [`WORD_GAP_FACTOR`] times the font size,
/// unless either glyph is itself whitespace or both come from scripts
/// written without spaces.
fn needs_space(prev: &Glyph, next: &Glyph) -> bool {
    let gap = next.bbox.x0 - prev.bbox.x1;
    if gap <= WORD_GAP_FACTOR * prev.font_size.max(next.font_size) {
        return false;
    }
    if prev.is_whitespace() || next.is_whitespace() {
        return false;
    }
    let last = prev.text.chars().next_back();
    let first = next.text.chars().next();
    !matches!(
        (last, first),
        (Some(l), Some(f)) if is_spaceless_script_char(l) && is_spaceless_script_char(f)
    )
}

// ---------------------------------------------------------------------------
// Public API: line -> box grouping
// ---------------------------------------------------------------------------

/// Group lines into text boxes.
///
/// A line joins the most recent box whose last line sits at most
/// [`BLOCK_GAP_FACTOR`] times the font size above it and overlaps it
/// horizontally; otherwise it starts a new box.
pub fn group_lines_into_boxes(lines: Vec<GlyphLine>) -> Vec<TextBox> {
    let mut boxes: Vec<TextBox> = Vec::new();

    for line in lines {
        let target = boxes.iter().rposition(|b| {
            b.lines.last().is_some_and(|last| {
                let drop = last.baseline - line.baseline;
                let overlaps = line.bbox.x0 < last.bbox.x1 && last.bbox.x0 < line.bbox.x1;
                let limit = BLOCK_GAP_FACTOR * last.font_size.max(line.font_size);
                drop > 0.0 && drop <= limit && overlaps
            })
        });

        match target {
            Some(i) => {
                let text_box = &mut boxes[i];
                text_box.bbox = text_box.bbox.union(&line.bbox);
                text_box.lines.push(line);
            }
            None => boxes.push(TextBox {
                bbox: line.bbox,
                lines: vec![line],
            }),
        }
    }

    boxes
}

// ---------------------------------------------------------------------------
// Public API: full pipeline
// ---------------------------------------------------------------------------

/// Build the primitive tree for a page's glyphs.
///
/// ```text
/// Container(page)
/// └── TextGroup(box)
///     └── Container(line): Char | Whitespace(" ") ... Whitespace("\n")
/// ```
pub fn build_page_tree(glyphs: Vec<Glyph>) -> LayoutItem {
    let boxes = group_lines_into_boxes(group_glyphs_into_lines(glyphs));

    LayoutItem::Container(
        boxes
            .into_iter()
            .map(|text_box| LayoutItem::TextGroup {
                bbox: text_box.bbox,
                children: text_box.lines.iter().map(line_items).collect(),
            })
            .collect(),
    )
}

fn line_items(line: &GlyphLine) -> LayoutItem {
    let mut items = Vec::with_capacity(line.glyphs.len() + 1);
    let mut prev: Option<&Glyph> = None;

    for glyph in &line.glyphs {
        if prev.is_some_and(|p| needs_space(p, glyph)) {
            items.push(LayoutItem::space());
        }
        items.push(LayoutItem::char(glyph.bbox, glyph.text.clone()));
        prev = Some(glyph);
    }
    items.push(LayoutItem::newline());

    LayoutItem::Container(items)
}

/// Interpret a page and lay out its text.
pub fn page_layout(backend: &dyn PdfBackend, page_id: PageId) -> Result<LayoutItem, PdfError> {
    let glyphs = extract_page_glyphs(backend, page_id)?;
    log::debug!("page {:?}: {} glyph(s)", page_id, glyphs.len());
    Ok(build_page_tree(glyphs))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pdfannots_core::RawAnnotation;

    use super::*;
    use crate::parser::backend::FormXObject;
    use crate::parser::font::Widths;

    // -- Mock backend -------------------------------------------------------

    struct MockBackend {
        fonts: Vec<BackendFontInfo>,
        ops: Vec<ContentOp>,
        form: Option<(Vec<u8>, FormXObject, Vec<ContentOp>)>,
    }

    impl MockBackend {
        fn new(ops: Vec<ContentOp>) -> Self {
            Self {
                fonts: plain_font(),
                ops,
                form: None,
            }
        }
    }

    impl PdfBackend for MockBackend {
        fn pages(&self) -> BTreeMap<u32, PageId> {
            BTreeMap::from([(1, (1, 0))])
        }

        fn page_media_box(&self, _page: PageId) -> Result<[f32; 4], PdfError> {
            Ok([0.0, 0.0, 600.0, 800.0])
        }

        fn page_fonts(&self, _page: PageId) -> Result<Vec<BackendFontInfo>, PdfError> {
            Ok(self.fonts.clone())
        }

        fn page_content(&self, _page: PageId) -> Result<Vec<u8>, PdfError> {
            // The page stream is empty; the form's content is a marker.
            Ok(vec![])
        }

        fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError> {
            match &self.form {
                Some((_, form, ops)) if !data.is_empty() && data == form.content.as_slice() => {
                    Ok(ops.clone())
                }
                _ => Ok(self.ops.clone()),
            }
        }

        fn form_xobject(&self, _page: PageId, name: &[u8]) -> Option<FormXObject> {
            self.form
                .as_ref()
                .filter(|(n, _, _)| n == name)
                .map(|(_, form, _)| form.clone())
        }

        fn page_annotations(&self, _page: PageId) -> Result<Vec<RawAnnotation>, PdfError> {
            Ok(vec![])
        }
    }

    fn plain_font() -> Vec<BackendFontInfo> {
        vec![BackendFontInfo {
            name: b"F1".to_vec(),
            ..Default::default()
        }]
    }

    fn make_op(operator: &str, operands: Vec<PdfValue>) -> ContentOp {
        ContentOp {
            operator: operator.to_string(),
            operands,
        }
    }

    fn reals(values: &[f32]) -> Vec<PdfValue> {
        values.iter().map(|&v| PdfValue::Real(v)).collect()
    }

    fn bt_op() -> ContentOp {
        make_op("BT", vec![])
    }

    fn et_op() -> ContentOp {
        make_op("ET", vec![])
    }

    fn tf_op(font: &[u8], size: f32) -> ContentOp {
        make_op("Tf", vec![PdfValue::Name(font.to_vec()), PdfValue::Real(size)])
    }

    fn td_op(tx: f32, ty: f32) -> ContentOp {
        make_op("Td", reals(&[tx, ty]))
    }

    fn tj_op(text: &[u8]) -> ContentOp {
        make_op("Tj", vec![PdfValue::Str(text.to_vec())])
    }

    /// `BT /F1 <size> Tf <x> <y> Td (<text>) Tj ET`
    fn text_at(text: &[u8], x: f32, y: f32, size: f32) -> Vec<ContentOp> {
        vec![bt_op(), tf_op(b"F1", size), td_op(x, y), tj_op(text), et_op()]
    }

    fn glyph(text: &str, x0: f32, x1: f32, baseline: f32) -> Glyph {
        Glyph {
            text: text.to_string(),
            bbox: Rect::new(x0, baseline - 2.0, x1, baseline + 8.0),
            baseline,
            font_size: 10.0,
        }
    }

    fn word_glyphs(text: &str, x: f32, baseline: f32) -> Vec<Glyph> {
        text.chars()
            .enumerate()
            .map(|(i, c)| {
                let x0 = x + i as f32 * 5.0;
                glyph(&c.to_string(), x0, x0 + 5.0, baseline)
            })
            .collect()
    }

    fn assert_rect(actual: Rect, expected: [f32; 4]) {
        let got = [actual.x0, actual.y0, actual.x1, actual.y1];
        for (g, e) in got.iter().zip(expected.iter()) {
            assert!((g - e).abs() < 0.01, "expected {:?}, got {:?}", expected, got);
        }
    }

    // -- Interpreter --------------------------------------------------------

    #[test]
    fn test_extract_simple_tj() {
        let backend = MockBackend::new(text_at(b"Hi", 72.0, 700.0, 10.0));
        let glyphs = extract_page_glyphs(&backend, (1, 0)).unwrap();

        assert_eq!(glyphs.len(), 2);
        assert_eq!(glyphs[0].text, "H");
        assert_rect(glyphs[0].bbox, [72.0, 698.0, 77.0, 708.0]);
        assert_rect(glyphs[1].bbox, [77.0, 698.0, 82.0, 708.0]);
        assert!((glyphs[0].baseline - 700.0).abs() < 0.01);
        assert!((glyphs[0].font_size - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_font_widths_are_used() {
        let mut backend = MockBackend::new(text_at(b"AB", 0.0, 0.0, 10.0));
        backend.fonts[0].widths = Widths::Simple {
            first_char: 65,
            widths: vec![600.0, 700.0],
        };
        let glyphs = extract_page_glyphs(&backend, (1, 0)).unwrap();
        assert_rect(glyphs[0].bbox, [0.0, -2.0, 6.0, 8.0]);
        assert_rect(glyphs[1].bbox, [6.0, -2.0, 13.0, 8.0]);
    }

    #[test]
    fn test_cm_scales_glyphs() {
        let mut ops = vec![
            make_op("q", vec![]),
            make_op("cm", reals(&[2.0, 0.0, 0.0, 2.0, 0.0, 0.0])),
        ];
        ops.extend(text_at(b"A", 10.0, 10.0, 10.0));
        ops.push(make_op("Q", vec![]));
        ops.extend(text_at(b"B", 10.0, 10.0, 10.0));

        let glyphs = extract_page_glyphs(&MockBackend::new(ops), (1, 0)).unwrap();

        assert_rect(glyphs[0].bbox, [20.0, 16.0, 30.0, 36.0]);
        assert!((glyphs[0].font_size - 20.0).abs() < 0.01);
        // Q restored the identity matrix.
        assert_rect(glyphs[1].bbox, [10.0, 8.0, 15.0, 18.0]);
    }

    #[test]
    fn test_tj_array_kerning_moves_right() {
        let ops = vec![
            bt_op(),
            tf_op(b"F1", 10.0),
            td_op(72.0, 700.0),
            make_op(
                "TJ",
                vec![PdfValue::Array(vec![
                    PdfValue::Str(b"A".to_vec()),
                    PdfValue::Integer(-1000),
                    PdfValue::Str(b"B".to_vec()),
                ])],
            ),
            et_op(),
        ];
        let glyphs = extract_page_glyphs(&MockBackend::new(ops), (1, 0)).unwrap();
        assert!((glyphs[1].bbox.x0 - 87.0).abs() < 0.01);
    }

    #[test]
    fn test_word_spacing_applies_to_spaces() {
        let ops = vec![
            bt_op(),
            tf_op(b"F1", 10.0),
            make_op("Tw", reals(&[3.0])),
            tj_op(b"a b"),
            et_op(),
        ];
        let glyphs = extract_page_glyphs(&MockBackend::new(ops), (1, 0)).unwrap();
        // a: 0..5, space: 5..10 then +3, b starts at 13.
        assert!((glyphs[2].bbox.x0 - 13.0).abs() < 0.01);
    }

    #[test]
    fn test_text_rise_and_leading() {
        let ops = vec![
            bt_op(),
            tf_op(b"F1", 10.0),
            make_op("TL", reals(&[12.0])),
            td_op(0.0, 100.0),
            make_op("T*", vec![]),
            make_op("Ts", reals(&[3.0])),
            tj_op(b"x"),
            et_op(),
        ];
        let glyphs = extract_page_glyphs(&MockBackend::new(ops), (1, 0)).unwrap();
        assert!((glyphs[0].baseline - 91.0).abs() < 0.01);
    }

    #[test]
    fn test_unknown_font_uses_fallback() {
        let ops = vec![bt_op(), tf_op(b"F9", 10.0), tj_op(b"z"), et_op()];
        let glyphs = extract_page_glyphs(&MockBackend::new(ops), (1, 0)).unwrap();
        assert_eq!(glyphs[0].text, "z");
        assert_rect(glyphs[0].bbox, [0.0, -2.0, 5.0, 8.0]);
    }

    #[test]
    fn test_form_xobject_is_drawn_with_its_matrix() {
        let mut backend = MockBackend::new(vec![
            make_op("cm", reals(&[1.0, 0.0, 0.0, 1.0, 100.0, 0.0])),
            make_op("Do", vec![PdfValue::Name(b"Fm0".to_vec())]),
        ]);
        backend.form = Some((
            b"Fm0".to_vec(),
            FormXObject {
                content: b"form".to_vec(),
                matrix: [1.0, 0.0, 0.0, 1.0, 0.0, 50.0],
                fonts: vec![],
            },
            text_at(b"F", 0.0, 0.0, 10.0),
        ));

        let glyphs = extract_page_glyphs(&backend, (1, 0)).unwrap();
        assert_eq!(glyphs.len(), 1);
        assert_rect(glyphs[0].bbox, [100.0, 48.0, 105.0, 58.0]);
    }

    // -- Grouping -----------------------------------------------------------

    #[test]
    fn test_lines_top_to_bottom() {
        let mut glyphs = word_glyphs("low", 0.0, 100.0);
        glyphs.extend(word_glyphs("high", 0.0, 200.0));
        let lines = group_glyphs_into_lines(glyphs);
        assert_eq!(lines.len(), 2);
        assert!((lines[0].baseline - 200.0).abs() < 0.01);
        assert_eq!(lines[0].glyphs.len(), 4);
    }

    #[test]
    fn test_baseline_tolerance_and_x_order() {
        let glyphs = vec![glyph("b", 5.0, 10.0, 100.5), glyph("a", 0.0, 5.0, 100.0)];
        let lines = group_glyphs_into_lines(glyphs);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].glyphs[0].text, "a");
    }

    #[test]
    fn test_wide_gap_splits_columns() {
        let mut glyphs = word_glyphs("left", 0.0, 100.0);
        glyphs.extend(word_glyphs("right", 300.0, 100.0));
        let lines = group_glyphs_into_lines(glyphs);
        assert_eq!(lines.len(), 2);
        assert!((lines[1].bbox.x0 - 300.0).abs() < 0.01);
    }

    #[test]
    fn test_needs_space() {
        let a = glyph("a", 0.0, 5.0, 0.0);
        assert!(!needs_space(&a, &glyph("b", 5.0, 10.0, 0.0)));
        assert!(needs_space(&a, &glyph("b", 8.0, 13.0, 0.0)));
        assert!(!needs_space(&a, &glyph(" ", 8.0, 13.0, 0.0)));
        assert!(!needs_space(
            &glyph("\u{4E2D}", 0.0, 5.0, 0.0),
            &glyph("\u{6587}", 8.0, 13.0, 0.0)
        ));
    }

    #[test]
    fn test_boxes_join_close_lines() {
        let mut glyphs = word_glyphs("one", 0.0, 200.0);
        glyphs.extend(word_glyphs("two", 0.0, 188.0));
        glyphs.extend(word_glyphs("far", 0.0, 100.0));
        let boxes = group_lines_into_boxes(group_glyphs_into_lines(glyphs));
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].lines.len(), 2);
        assert_rect(boxes[0].bbox, [0.0, 186.0, 15.0, 208.0]);
    }

    #[test]
    fn test_two_columns_form_separate_boxes() {
        let mut glyphs = word_glyphs("l1", 0.0, 200.0);
        glyphs.extend(word_glyphs("r1", 300.0, 200.0));
        glyphs.extend(word_glyphs("l2", 0.0, 188.0));
        glyphs.extend(word_glyphs("r2", 300.0, 188.0));
        let boxes = group_lines_into_boxes(group_glyphs_into_lines(glyphs));
        assert_eq!(boxes.len(), 2);
        assert_eq!(
            boxes[0].lines.iter().map(|l| l.glyphs[1].text.as_str()).collect::<Vec<_>>(),
            vec!["1", "2"]
        );
        assert!((boxes[1].bbox.x0 - 300.0).abs() < 0.01);
    }

    #[test]
    fn test_build_page_tree_text() {
        let mut glyphs = word_glyphs("ab", 0.0, 200.0);
        glyphs.extend(word_glyphs("cd", 20.0, 200.0));
        glyphs.extend(word_glyphs("ef", 0.0, 188.0));
        let tree = build_page_tree(glyphs);

        assert_eq!(tree.text(), "ab cd\nef\n");
        match &tree {
            LayoutItem::Container(children) => {
                assert_eq!(children.len(), 1);
                assert!(matches!(children[0], LayoutItem::TextGroup { .. }));
            }
            other => panic!("expected Container, got {:?}", other),
        }
    }

    #[test]
    fn test_page_layout_end_to_end() {
        let mut ops = text_at(b"systems are", 72.0, 700.0, 10.0);
        ops.extend(text_at(b"hard", 72.0, 688.0, 10.0));
        let tree = page_layout(&MockBackend::new(ops), (1, 0)).unwrap();
        assert_eq!(tree.text(), "systems are\nhard\n");
    }
}
