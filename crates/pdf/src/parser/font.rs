//! Font metrics and character-code decoding.
//!
//! Simple fonts use one byte per character code and take their widths from
//! `/FirstChar` + `/Widths`. Composite (`Type0`) fonts are read as two-byte
//! codes (the Identity CMaps) with widths from the descendant's `/W` and
//! `/DW`. Text comes from the `/ToUnicode` CMap when present, else from
//! the simple font's encoding.

use std::collections::HashMap;

use super::backend::{decode_text_simple, get_number_from_value, PdfValue};
use super::encoding::SimpleEncoding;

/// Advance width, as a fraction of the font size, used when the font does
/// not say.
pub const DEFAULT_GLYPH_WIDTH: f32 = 0.5;

/// `/DW` default for CID fonts, in glyph units.
pub const DEFAULT_CID_WIDTH: f32 = 1000.0;

/// Longest `c_first c_last w` range accepted in a `/W` array.
pub const MAX_CID_RANGE: u32 = 0xFFFF;

/// Glyph advance widths in glyph units (1/1000 of the font size).
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Widths {
    #[default]
    Unknown,
    Simple {
        first_char: u32,
        widths: Vec<f32>,
    },
    Cid {
        default: f32,
        widths: HashMap<u32, f32>,
    },
}

impl Widths {
    /// Advance width of `code` as a fraction of the font size.
    pub fn width(&self, code: u32) -> f32 {
        let units = match self {
            Widths::Unknown => None,
            Widths::Simple { first_char, widths } => code
                .checked_sub(*first_char)
                .and_then(|i| widths.get(i as usize))
                .copied(),
            Widths::Cid { default, widths } => Some(widths.get(&code).copied().unwrap_or(*default)),
        };
        match units {
            Some(w) if w > 0.0 => w / 1000.0,
            _ => DEFAULT_GLYPH_WIDTH,
        }
    }
}

/// Parse a CID font `/W` array.
///
/// Two forms may be mixed: `c [w1 w2 ...]` gives consecutive widths
/// starting at `c`; `c_first c_last w` gives one width to a whole range.
/// Codes past `u32::MAX` and ranges that are reversed or longer than
/// [`MAX_CID_RANGE`] are skipped.
pub fn parse_cid_widths(values: &[PdfValue]) -> HashMap<u32, f32> {
    let mut widths = HashMap::new();
    let mut i = 0;

    while i < values.len() {
        let Some(first) = get_number_from_value(&values[i]).map(|v| v as u32) else {
            i += 1;
            continue;
        };
        match values.get(i + 1) {
            Some(PdfValue::Array(run)) => {
                for (offset, w) in run.iter().filter_map(get_number_from_value).enumerate() {
                    let Some(code) = u32::try_from(offset)
                        .ok()
                        .and_then(|o| first.checked_add(o))
                    else {
                        log::warn!("ignoring /W widths past code {}", u32::MAX);
                        break;
                    };
                    widths.insert(code, w);
                }
                i += 2;
            }
            Some(last) => {
                let last = get_number_from_value(last).map(|v| v as u32);
                let w = values.get(i + 2).and_then(get_number_from_value);
                match (last, w) {
                    (Some(last), Some(w)) if last >= first && last - first <= MAX_CID_RANGE => {
                        for code in first..=last {
                            widths.insert(code, w);
                        }
                    }
                    (Some(last), Some(_)) => {
                        log::warn!("ignoring /W range {}..={}", first, last);
                    }
                    _ => {}
                }
                i += 3;
            }
            None => break,
        }
    }

    widths
}

/// Build a code-to-text table from the bytes of a `/ToUnicode` CMap.
///
/// Returns `None` when the CMap cannot be parsed. Mappings that are not
/// valid UTF-16BE are skipped.
pub fn parse_to_unicode(cmap: &[u8]) -> Option<HashMap<u32, String>> {
    let raw = match adobe_cmap_parser::get_unicode_map(cmap) {
        Ok(raw) => raw,
        Err(e) => {
            log::warn!("ignoring unparsable ToUnicode CMap: {:?}", e);
            return None;
        }
    };

    let map = raw
        .into_iter()
        .filter_map(|(code, bytes)| {
            if bytes.len() % 2 != 0 {
                return None;
            }
            let units: Vec<u16> = bytes
                .chunks(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            String::from_utf16(&units).ok().map(|s| (code, s))
        })
        .collect();

    Some(map)
}

/// Everything the interpreter needs to know about one font resource.
#[derive(Debug, Clone, Default)]
pub struct BackendFontInfo {
    /// The font name key as it appears in the resource dictionary (e.g. `b"F1"`).
    pub name: Vec<u8>,
    /// Font subtype (e.g. `Type1`, `TrueType`, `Type0`).
    pub subtype: Option<String>,
    /// Encoding of a simple font; composite fonts have none.
    pub encoding: Option<SimpleEncoding>,
    pub widths: Widths,
    pub to_unicode: Option<HashMap<u32, String>>,
}

/// One decoded character code.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphCode {
    pub code: u32,
    pub text: String,
    /// Advance width as a fraction of the font size.
    pub width: f32,
}

impl GlyphCode {
    /// Word spacing applies to the single-byte code 32 only.
    pub fn is_word_space(&self, composite: bool) -> bool {
        !composite && self.code == 32
    }
}

impl BackendFontInfo {
    /// `Type0` fonts use two-byte codes.
    pub fn is_composite(&self) -> bool {
        self.subtype.as_deref() == Some("Type0")
    }

    /// Split the bytes of a shown string into character codes.
    pub fn glyphs(&self, bytes: &[u8]) -> Vec<GlyphCode> {
        if self.is_composite() {
            bytes
                .chunks(2)
                .map(|c| {
                    let code = match c {
                        [hi, lo] => u32::from(u16::from_be_bytes([*hi, *lo])),
                        [single] => u32::from(*single),
                        _ => 0,
                    };
                    self.glyph(code)
                })
                .collect()
        } else {
            bytes.iter().map(|&b| self.glyph(u32::from(b))).collect()
        }
    }

    fn glyph(&self, code: u32) -> GlyphCode {
        GlyphCode {
            code,
            text: self.code_text(code),
            width: self.widths.width(code),
        }
    }

    fn code_text(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.as_ref().and_then(|m| m.get(&code)) {
            return text.clone();
        }
        if self.is_composite() {
            // Identity-encoded CIDs often coincide with Unicode code points.
            return char::from_u32(code)
                .filter(|c| !c.is_control())
                .map(String::from)
                .unwrap_or_default();
        }
        if let Some(encoding) = &self.encoding {
            return encoding
                .text(code)
                .filter(|text| !text.chars().any(char::is_control))
                .map(str::to_string)
                .unwrap_or_default();
        }
        match u8::try_from(code) {
            Ok(b) if b >= 0x20 => decode_text_simple(&[b]),
            _ => String::new(),
        }
    }
}
