use std::collections::BTreeMap;

use lopdf::{self, content::Content};
use pdfannots_core::RawAnnotation;
use unicode_normalization::UnicodeNormalization;

use super::encoding::SimpleEncoding;
use super::font::{parse_cid_widths, parse_to_unicode, BackendFontInfo, Widths, DEFAULT_CID_WIDTH};
use super::outline::{read_outlines, OutlineTarget};
use crate::PdfError;

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

/// A page identifier mirroring `lopdf::ObjectId`: (object number, generation number).
pub type PageId = (u32, u16);

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// A simplified, lopdf-independent representation of a PDF value.
///
/// The content-stream interpreter works on these so it can be driven by a
/// mock backend in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Dict(Vec<(Vec<u8>, PdfValue)>),
    Reference(PageId),
}

/// A single content-stream operation (operator + operands).
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

/// A form XObject drawn from a page with `Do`.
#[derive(Debug, Clone)]
pub struct FormXObject {
    /// Decompressed content stream.
    pub content: Vec<u8>,
    /// The form's `/Matrix`, identity when absent.
    pub matrix: [f32; 6],
    /// Fonts from the form's own resources; empty means the page's apply.
    pub fonts: Vec<BackendFontInfo>,
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Extract an `f32` from a [`PdfValue`], accepting both `Integer` and `Real`.
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(f) => Some(*f),
        _ => None,
    }
}

/// Convert a `lopdf::Object` into a [`PdfValue`].
///
/// References are preserved. Stream dictionaries are converted but their
/// bytes are dropped.
pub fn convert_object(obj: &lopdf::Object) -> PdfValue {
    match obj {
        lopdf::Object::Null => PdfValue::Null,
        lopdf::Object::Boolean(b) => PdfValue::Bool(*b),
        lopdf::Object::Integer(i) => PdfValue::Integer(*i),
        lopdf::Object::Real(f) => PdfValue::Real(*f),
        lopdf::Object::Name(n) => PdfValue::Name(n.clone()),
        lopdf::Object::String(s, _) => PdfValue::Str(s.clone()),
        lopdf::Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        lopdf::Object::Dictionary(dict) => PdfValue::Dict(
            dict.iter()
                .map(|(k, v)| (k.clone(), convert_object(v)))
                .collect(),
        ),
        lopdf::Object::Stream(stream) => PdfValue::Dict(
            stream
                .dict
                .iter()
                .map(|(k, v)| (k.clone(), convert_object(v)))
                .collect(),
        ),
        lopdf::Object::Reference(id) => PdfValue::Reference(*id),
    }
}

/// Best-effort decoding of raw PDF string bytes into a Rust `String`.
///
/// 1. UTF-16BE with BOM (`\xFE\xFF` prefix).
/// 2. Valid UTF-8.
/// 3. Latin-1, each byte mapped to its code point.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if let Some(payload) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let code_units: Vec<u16> = payload
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&code_units);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    bytes.iter().map(|&b| b as char).collect()
}

/// Decode a PDF text string (comments, authors, titles) and normalize it
/// to NFC.
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    decode_text_simple(bytes).nfc().collect()
}

// ---------------------------------------------------------------------------
// PdfBackend trait
// ---------------------------------------------------------------------------

/// Abstraction over a PDF parsing backend (currently backed by `lopdf`).
///
/// The layout interpreter only talks to this trait so it can be tested
/// against mock implementations.
pub trait PdfBackend {
    /// Return a mapping from 1-based page number to [`PageId`].
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// The page's media box `[x0, y0, x1, y1]`, inherited if needed.
    fn page_media_box(&self, page: PageId) -> Result<[f32; 4], PdfError>;

    /// Return font information for every font referenced by the given page.
    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>, PdfError>;

    /// Return the decompressed content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError>;

    /// Decode raw content-stream bytes into a sequence of [`ContentOp`]s.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError>;

    /// Look up a form XObject by its resource name on the given page.
    fn form_xobject(&self, page: PageId, name: &[u8]) -> Option<FormXObject>;

    /// Every annotation dictionary on the page, in `/Annots` order.
    fn page_annotations(&self, page: PageId) -> Result<Vec<RawAnnotation>, PdfError>;
}

// ---------------------------------------------------------------------------
// LopdfBackend
// ---------------------------------------------------------------------------

/// Concrete [`PdfBackend`] implementation backed by [`lopdf::Document`].
pub struct LopdfBackend {
    doc: lopdf::Document,
}

impl LopdfBackend {
    /// Parse a PDF from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self, PdfError> {
        let doc = lopdf::Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            return Err(PdfError::Encrypted);
        }

        Ok(Self { doc })
    }

    /// Total number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Every positioned bookmark, in document order.
    pub fn outlines(&self) -> Vec<OutlineTarget> {
        read_outlines(&self.doc)
    }

    /// Extract metadata from the PDF trailer's Info dictionary.
    pub fn metadata(&self) -> BTreeMap<String, String> {
        let mut meta = BTreeMap::new();

        let Some(info_dict) = self
            .doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|obj| self.resolve(obj).as_dict().ok())
        else {
            return meta;
        };

        let keys: &[&[u8]] = &[b"Title", b"Author", b"Creator", b"Producer", b"Subject"];
        for key in keys {
            if let Ok(obj) = info_dict.get(key) {
                let value = match self.resolve(obj) {
                    lopdf::Object::String(bytes, _) => decode_pdf_string(bytes),
                    lopdf::Object::Name(bytes) => String::from_utf8_lossy(bytes).into_owned(),
                    _ => continue,
                };
                meta.insert(String::from_utf8_lossy(key).into_owned(), value);
            }
        }

        meta
    }

    // -- private helpers ----------------------------------------------------

    /// Follow one level of indirection.
    fn resolve<'a>(&'a self, obj: &'a lopdf::Object) -> &'a lopdf::Object {
        match obj {
            lopdf::Object::Reference(id) => self.doc.get_object(*id).unwrap_or(obj),
            other => other,
        }
    }

    fn page_dict(&self, page: PageId) -> Result<&lopdf::Dictionary, PdfError> {
        self.doc
            .get_object(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page object: {}", e)))?
            .as_dict()
            .map_err(|e| PdfError::Parse(format!("page object is not a dictionary: {}", e)))
    }

    /// Walk up the page tree to find the MediaBox array.
    fn find_media_box(&self, dict: &lopdf::Dictionary) -> Option<Vec<lopdf::Object>> {
        if let Ok(arr) = dict.get(b"MediaBox").map(|o| self.resolve(o)).and_then(|o| o.as_array()) {
            return Some(arr.clone());
        }

        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        let parent_dict = self.doc.get_object(parent).ok()?.as_dict().ok()?;
        self.find_media_box(parent_dict)
    }

    /// Convert a slice of lopdf objects to `f32` values.
    fn array_to_f32s(&self, objects: &[lopdf::Object]) -> Result<Vec<f32>, PdfError> {
        objects
            .iter()
            .map(|obj| match self.resolve(obj) {
                lopdf::Object::Integer(i) => Ok(*i as f32),
                lopdf::Object::Real(f) => Ok(*f),
                other => Err(PdfError::Parse(format!(
                    "expected number in array, got {:?}",
                    other
                ))),
            })
            .collect()
    }

    fn numbers(&self, dict: &lopdf::Dictionary, key: &[u8]) -> Option<Vec<f32>> {
        let arr = self.resolve(dict.get(key).ok()?).as_array().ok()?;
        self.array_to_f32s(arr).ok()
    }

    fn name(&self, dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
        match self.resolve(dict.get(key).ok()?) {
            lopdf::Object::Name(n) => Some(String::from_utf8_lossy(n).into_owned()),
            _ => None,
        }
    }

    fn text(&self, dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
        match self.resolve(dict.get(key).ok()?) {
            lopdf::Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
            _ => None,
        }
    }

    fn stream_bytes(stream: &lopdf::Stream) -> Vec<u8> {
        stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone())
    }

    /// Read a font dictionary into a [`BackendFontInfo`].
    fn font_info(&self, name: &[u8], dict: &lopdf::Dictionary) -> BackendFontInfo {
        let subtype = self.name(dict, b"Subtype");
        let composite = subtype.as_deref() == Some("Type0");

        let widths = if composite {
            self.cid_widths(dict)
        } else {
            match (
                dict.get(b"FirstChar").ok().map(|o| self.resolve(o)),
                self.numbers(dict, b"Widths"),
            ) {
                (Some(lopdf::Object::Integer(first)), Some(widths)) => Widths::Simple {
                    first_char: u32::try_from(*first).unwrap_or(0),
                    widths,
                },
                _ => Widths::Unknown,
            }
        };

        let to_unicode = match dict.get(b"ToUnicode").map(|o| self.resolve(o)) {
            Ok(lopdf::Object::Stream(stream)) => parse_to_unicode(&Self::stream_bytes(stream)),
            _ => None,
        };

        BackendFontInfo {
            name: name.to_vec(),
            subtype,
            encoding: (!composite).then(|| self.simple_encoding(dict)),
            widths,
            to_unicode,
        }
    }

    /// The `/Encoding` of a simple font with its `/Differences` applied.
    /// Fonts without one use `StandardEncoding`.
    fn simple_encoding(&self, dict: &lopdf::Dictionary) -> SimpleEncoding {
        let named = |name: &[u8]| {
            let name = String::from_utf8_lossy(name);
            SimpleEncoding::named(&name).unwrap_or_else(|| {
                log::warn!("unsupported font encoding {}, using StandardEncoding", name);
                SimpleEncoding::standard()
            })
        };

        match dict.get(b"Encoding").map(|o| self.resolve(o)) {
            Ok(lopdf::Object::Name(name)) => named(name.as_slice()),
            Ok(lopdf::Object::Dictionary(enc)) => {
                let mut encoding = match enc.get(b"BaseEncoding").map(|o| self.resolve(o)) {
                    Ok(lopdf::Object::Name(name)) => named(name.as_slice()),
                    _ => SimpleEncoding::standard(),
                };
                if let Ok(lopdf::Object::Array(diffs)) =
                    enc.get(b"Differences").map(|o| self.resolve(o))
                {
                    let values: Vec<PdfValue> =
                        diffs.iter().map(|o| convert_object(self.resolve(o))).collect();
                    encoding.apply_differences(&values);
                }
                encoding
            }
            _ => SimpleEncoding::standard(),
        }
    }

    /// Widths of a `Type0` font, read from its first descendant.
    fn cid_widths(&self, dict: &lopdf::Dictionary) -> Widths {
        let descendant = dict
            .get(b"DescendantFonts")
            .ok()
            .and_then(|o| self.resolve(o).as_array().ok())
            .and_then(|arr| arr.first())
            .and_then(|o| self.resolve(o).as_dict().ok());

        let Some(descendant) = descendant else {
            return Widths::Unknown;
        };

        let default = match descendant.get(b"DW").map(|o| self.resolve(o)) {
            Ok(lopdf::Object::Integer(i)) => *i as f32,
            Ok(lopdf::Object::Real(f)) => *f,
            _ => DEFAULT_CID_WIDTH,
        };

        let widths = descendant
            .get(b"W")
            .ok()
            .and_then(|o| self.resolve(o).as_array().ok())
            .map(|arr| {
                let values: Vec<PdfValue> =
                    arr.iter().map(|o| convert_object(self.resolve(o))).collect();
                parse_cid_widths(&values)
            })
            .unwrap_or_default();

        Widths::Cid { default, widths }
    }

    /// Fonts declared in a resources dictionary.
    fn resource_fonts(&self, resources: &lopdf::Dictionary) -> Vec<BackendFontInfo> {
        let Some(fonts) = resources
            .get(b"Font")
            .ok()
            .and_then(|o| self.resolve(o).as_dict().ok())
        else {
            return Vec::new();
        };

        fonts
            .iter()
            .filter_map(|(name, obj)| {
                let dict = self.resolve(obj).as_dict().ok()?;
                Some(self.font_info(name, dict))
            })
            .collect()
    }

    /// The page's resources dictionary, inherited through the page tree.
    fn page_resources(&self, page: PageId) -> Option<&lopdf::Dictionary> {
        let mut dict = self.page_dict(page).ok()?;
        loop {
            if let Ok(res) = dict.get(b"Resources") {
                return self.resolve(res).as_dict().ok();
            }
            let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
            dict = self.doc.get_object(parent).ok()?.as_dict().ok()?;
        }
    }

    fn read_annotation(&self, dict: &lopdf::Dictionary) -> Option<RawAnnotation> {
        let subtype = self.name(dict, b"Subtype")?;
        let rect = self
            .numbers(dict, b"Rect")
            .and_then(|v| <[f32; 4]>::try_from(v).ok());

        Some(RawAnnotation {
            subtype,
            quad_points: self.numbers(dict, b"QuadPoints"),
            rect,
            contents: self.text(dict, b"Contents"),
            author: self.text(dict, b"T"),
        })
    }
}

// ---------------------------------------------------------------------------
// PdfBackend implementation for LopdfBackend
// ---------------------------------------------------------------------------

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_media_box(&self, page: PageId) -> Result<[f32; 4], PdfError> {
        let media_box = self
            .find_media_box(self.page_dict(page)?)
            .ok_or_else(|| PdfError::Parse("MediaBox not found for page".into()))?;

        let nums = self.array_to_f32s(&media_box)?;
        match nums[..] {
            [x0, y0, x1, y1, ..] => Ok([x0, y0, x1, y1]),
            _ => Err(PdfError::Parse(format!(
                "MediaBox has {} elements, expected 4",
                nums.len()
            ))),
        }
    }

    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>, PdfError> {
        let fonts_map = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page fonts: {}", e)))?;

        Ok(fonts_map
            .iter()
            .map(|(name, dict)| self.font_info(name, dict))
            .collect())
    }

    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError> {
        self.doc
            .get_page_content(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page content: {}", e)))
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError> {
        let content = Content::decode(data)
            .map_err(|e| PdfError::Parse(format!("content stream decode error: {}", e)))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }

    fn form_xobject(&self, page: PageId, name: &[u8]) -> Option<FormXObject> {
        let xobjects = self
            .page_resources(page)?
            .get(b"XObject")
            .ok()
            .and_then(|o| self.resolve(o).as_dict().ok())?;

        let lopdf::Object::Stream(stream) = self.resolve(xobjects.get(name).ok()?) else {
            return None;
        };
        if self.name(&stream.dict, b"Subtype").as_deref() != Some("Form") {
            return None;
        }

        let matrix = self
            .numbers(&stream.dict, b"Matrix")
            .and_then(|v| <[f32; 6]>::try_from(v).ok())
            .unwrap_or([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

        let fonts = stream
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|o| self.resolve(o).as_dict().ok())
            .map(|res| self.resource_fonts(res))
            .unwrap_or_default();

        Some(FormXObject {
            content: Self::stream_bytes(stream),
            matrix,
            fonts,
        })
    }

    fn page_annotations(&self, page: PageId) -> Result<Vec<RawAnnotation>, PdfError> {
        let Ok(annots) = self.page_dict(page)?.get(b"Annots") else {
            return Ok(Vec::new());
        };

        let Ok(annots) = self.resolve(annots).as_array() else {
            log::warn!("page {:?}: /Annots is not an array; ignoring it", page);
            return Ok(Vec::new());
        };

        Ok(annots
            .iter()
            .filter_map(|entry| match self.resolve(entry).as_dict() {
                Ok(dict) => {
                    let annotation = self.read_annotation(dict);
                    if annotation.is_none() {
                        log::warn!("page {:?}: skipping annotation without /Subtype", page);
                    }
                    annotation
                }
                Err(_) => {
                    log::warn!("page {:?}: skipping malformed /Annots entry {:?}", page, entry);
                    None
                }
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
