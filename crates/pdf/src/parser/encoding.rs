//! Single-byte encodings of simple fonts.
//!
//! The predefined base encodings come from lopdf's tables; `/Differences`
//! entries are resolved from their glyph names.

use lopdf::{dictionary, Object};
use unicode_normalization::UnicodeNormalization;

use super::backend::PdfValue;

/// Glyph names that are not spelled as their own character.
const GLYPH_NAMES: &[(&str, &str)] = &[
    ("space", " "),
    ("nbspace", "\u{A0}"),
    ("exclam", "!"),
    ("quotedbl", "\""),
    ("numbersign", "#"),
    ("dollar", "$"),
    ("percent", "%"),
    ("ampersand", "&"),
    ("quotesingle", "'"),
    ("parenleft", "("),
    ("parenright", ")"),
    ("asterisk", "*"),
    ("plus", "+"),
    ("comma", ","),
    ("hyphen", "-"),
    ("sfthyphen", "\u{AD}"),
    ("period", "."),
    ("slash", "/"),
    ("zero", "0"),
    ("one", "1"),
    ("two", "2"),
    ("three", "3"),
    ("four", "4"),
    ("five", "5"),
    ("six", "6"),
    ("seven", "7"),
    ("eight", "8"),
    ("nine", "9"),
    ("colon", ":"),
    ("semicolon", ";"),
    ("less", "<"),
    ("equal", "="),
    ("greater", ">"),
    ("question", "?"),
    ("at", "@"),
    ("bracketleft", "["),
    ("backslash", "\\"),
    ("bracketright", "]"),
    ("asciicircum", "^"),
    ("underscore", "_"),
    ("braceleft", "{"),
    ("bar", "|"),
    ("braceright", "}"),
    ("asciitilde", "~"),
    ("quoteleft", "\u{2018}"),
    ("quoteright", "\u{2019}"),
    ("quotesinglbase", "\u{201A}"),
    ("quotedblleft", "\u{201C}"),
    ("quotedblright", "\u{201D}"),
    ("quotedblbase", "\u{201E}"),
    ("guilsinglleft", "\u{2039}"),
    ("guilsinglright", "\u{203A}"),
    ("guillemotleft", "\u{AB}"),
    ("guillemotright", "\u{BB}"),
    ("endash", "\u{2013}"),
    ("emdash", "\u{2014}"),
    ("ellipsis", "\u{2026}"),
    ("bullet", "\u{2022}"),
    ("periodcentered", "\u{B7}"),
    ("dagger", "\u{2020}"),
    ("daggerdbl", "\u{2021}"),
    ("perthousand", "\u{2030}"),
    ("trademark", "\u{2122}"),
    ("copyright", "\u{A9}"),
    ("registered", "\u{AE}"),
    ("section", "\u{A7}"),
    ("paragraph", "\u{B6}"),
    ("degree", "\u{B0}"),
    ("plusminus", "\u{B1}"),
    ("multiply", "\u{D7}"),
    ("divide", "\u{F7}"),
    ("minus", "\u{2212}"),
    ("fraction", "\u{2044}"),
    ("logicalnot", "\u{AC}"),
    ("brokenbar", "\u{A6}"),
    ("mu", "\u{B5}"),
    ("exclamdown", "\u{A1}"),
    ("questiondown", "\u{BF}"),
    ("cent", "\u{A2}"),
    ("sterling", "\u{A3}"),
    ("currency", "\u{A4}"),
    ("yen", "\u{A5}"),
    ("Euro", "\u{20AC}"),
    ("florin", "\u{192}"),
    ("onequarter", "\u{BC}"),
    ("onehalf", "\u{BD}"),
    ("threequarters", "\u{BE}"),
    ("ordfeminine", "\u{AA}"),
    ("ordmasculine", "\u{BA}"),
    ("germandbls", "\u{DF}"),
    ("ae", "\u{E6}"),
    ("AE", "\u{C6}"),
    ("oe", "\u{153}"),
    ("OE", "\u{152}"),
    ("oslash", "\u{F8}"),
    ("Oslash", "\u{D8}"),
    ("eth", "\u{F0}"),
    ("Eth", "\u{D0}"),
    ("thorn", "\u{FE}"),
    ("Thorn", "\u{DE}"),
    ("dotlessi", "\u{131}"),
    ("lslash", "\u{142}"),
    ("Lslash", "\u{141}"),
    ("ff", "\u{FB00}"),
    ("fi", "\u{FB01}"),
    ("fl", "\u{FB02}"),
    ("ffi", "\u{FB03}"),
    ("ffl", "\u{FB04}"),
    ("grave", "`"),
    ("acute", "\u{B4}"),
    ("circumflex", "\u{2C6}"),
    ("tilde", "\u{2DC}"),
    ("dieresis", "\u{A8}"),
    ("ring", "\u{2DA}"),
    ("cedilla", "\u{B8}"),
    ("caron", "\u{2C7}"),
    ("macron", "\u{AF}"),
    ("breve", "\u{2D8}"),
    ("ogonek", "\u{2DB}"),
    ("dotaccent", "\u{2D9}"),
    ("hungarumlaut", "\u{2DD}"),
];

/// Accent suffixes of composed glyph names such as `eacute`.
const ACCENTS: &[(&str, char)] = &[
    ("acute", '\u{301}'),
    ("grave", '\u{300}'),
    ("circumflex", '\u{302}'),
    ("tilde", '\u{303}'),
    ("macron", '\u{304}'),
    ("breve", '\u{306}'),
    ("dotaccent", '\u{307}'),
    ("dieresis", '\u{308}'),
    ("ring", '\u{30A}'),
    ("hungarumlaut", '\u{30B}'),
    ("caron", '\u{30C}'),
    ("cedilla", '\u{327}'),
    ("ogonek", '\u{328}'),
];

/// Code-to-text table of a simple font, indexed by the one-byte code.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleEncoding {
    codes: Vec<Option<String>>,
}

impl SimpleEncoding {
    /// One of the predefined encodings, e.g. `WinAnsiEncoding`.
    pub fn named(name: &str) -> Option<Self> {
        let font = dictionary! {
            "Type" => "Font",
            "Encoding" => Object::Name(name.as_bytes().to_vec()),
        };
        let encoding = font.get_font_encoding(&lopdf::Document::new()).ok()?;
        if !matches!(encoding, lopdf::Encoding::OneByteEncoding(_)) {
            return None;
        }

        let codes = (0..=u8::MAX)
            .map(|b| encoding.bytes_to_string(&[b]).ok().filter(|s| !s.is_empty()))
            .collect();
        Some(SimpleEncoding { codes })
    }

    /// `StandardEncoding`, used when a font names no encoding.
    pub fn standard() -> Self {
        Self::named("StandardEncoding").unwrap_or_else(Self::latin1)
    }

    fn latin1() -> Self {
        SimpleEncoding {
            codes: (0..=u8::MAX)
                .map(|b| (b >= 0x20).then(|| char::from(b).to_string()))
                .collect(),
        }
    }

    /// Apply a `/Differences` array: each code is followed by the glyph
    /// names of consecutive codes. Unknown glyph names keep the base entry.
    pub fn apply_differences(&mut self, differences: &[PdfValue]) {
        let mut code: Option<usize> = None;
        for value in differences {
            match value {
                PdfValue::Integer(n) => code = usize::try_from(*n).ok(),
                PdfValue::Name(name) => {
                    let Some(current) = code else {
                        continue;
                    };
                    let name = String::from_utf8_lossy(name);
                    match (self.codes.get_mut(current), glyph_name_to_text(&name)) {
                        (Some(slot), Some(text)) => *slot = Some(text),
                        (Some(_), None) => log::debug!("unknown glyph name /{}", name),
                        (None, _) => {}
                    }
                    code = Some(current + 1);
                }
                _ => {}
            }
        }
    }

    /// Text of `code`, if the encoding maps it.
    pub fn text(&self, code: u32) -> Option<&str> {
        self.codes.get(usize::try_from(code).ok()?)?.as_deref()
    }
}

/// Text for an Adobe glyph name.
///
/// Handles the common names, `uniXXXX` and `uXXXX` forms, ligatures
/// spelled with `_`, variant suffixes after `.`, and accented letters.
pub fn glyph_name_to_text(name: &str) -> Option<String> {
    let base = name.split_once('.').map_or(name, |(base, _)| base);
    if base.is_empty() {
        return None;
    }
    if base.contains('_') {
        return base.split('_').map(glyph_component).collect();
    }
    glyph_component(base)
}

fn glyph_component(name: &str) -> Option<String> {
    if let Some((_, text)) = GLYPH_NAMES.iter().find(|(n, _)| *n == name) {
        return Some(text.to_string());
    }

    name.strip_prefix("uni")
        .and_then(uni_sequence)
        .or_else(|| name.strip_prefix('u').and_then(code_point))
        .or_else(|| single_letter(name))
        .or_else(|| accented(name))
}

/// `uni` followed by groups of four hex digits.
fn uni_sequence(hex: &str) -> Option<String> {
    if hex.is_empty() || hex.len() % 4 != 0 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    (0..hex.len())
        .step_by(4)
        .map(|i| {
            u32::from_str_radix(&hex[i..i + 4], 16)
                .ok()
                .and_then(char::from_u32)
        })
        .collect()
}

/// `u` followed by four to six hex digits.
fn code_point(hex: &str) -> Option<String> {
    if !(4..=6).contains(&hex.len()) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let c = char::from_u32(u32::from_str_radix(hex, 16).ok()?)?;
    Some(c.to_string())
}

fn single_letter(name: &str) -> Option<String> {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Some(c.to_string()),
        _ => None,
    }
}

fn accented(name: &str) -> Option<String> {
    ACCENTS.iter().find_map(|(suffix, mark)| {
        let letter = single_letter(name.strip_suffix(suffix)?)?;
        Some(letter.chars().chain(std::iter::once(*mark)).nfc().collect())
    })
}
