//! Font metrics and character decoding for fonts found in page resources.
//!
//! Simple fonts map one byte to one glyph; text comes from `/ToUnicode`, the
//! `/Differences` glyph names or WinAnsi, in that order. Type0 fonts are read
//! with two-byte codes (Identity-H and friends) and need `/ToUnicode` to yield
//! text. Widths are in thousandths of text space units.

use lopdf::{Dictionary, Document, Object};
use std::collections::HashMap;

use super::cmap::ToUnicodeMap;
use super::document::{number, resolve};
use super::encoding::{glyph_name_to_text, win_ansi_decode};

const DEFAULT_ASCENT: f32 = 750.0;
const DEFAULT_DESCENT: f32 = -250.0;
const DEFAULT_CID_WIDTH: f32 = 1000.0;

/// Helvetica widths by WinAnsi code, from the Adobe core font metrics
#[rustfmt::skip]
static HELVETICA_WIDTHS: [u16; 256] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, 0,
    556, 0, 222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0,
    0, 222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 0, 500, 667,
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
];

/// Width of a code in one of the standard 14 fonts. Courier is monospaced;
/// everything else is approximated with Helvetica.
pub fn standard_width(base_font: &str, code: u8) -> f32 {
    if base_font.starts_with("Courier") {
        600.0
    } else {
        HELVETICA_WIDTHS[code as usize] as f32
    }
}

/// One decoded character code of a shown string
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedGlyph {
    /// Raw code bytes as they appear in the string operand
    pub code: Vec<u8>,
    /// Unicode text, possibly several characters for ligatures
    pub text: String,
    /// Horizontal displacement `w0` in glyph space units
    pub width: f32,
}

impl DecodedGlyph {
    /// Word spacing applies to the single-byte code 32 only
    pub fn is_word_space(&self) -> bool {
        self.code.as_slice() == [32]
    }
}

#[derive(Debug, Clone)]
enum FontKind {
    Simple {
        first_char: u32,
        widths: Vec<f32>,
        missing_width: f32,
        differences: HashMap<u8, String>,
        standard: bool,
    },
    Composite {
        widths: HashMap<u32, f32>,
        default_width: f32,
    },
}

/// What the interpreter needs to know about a font
#[derive(Debug, Clone)]
pub struct FontInfo {
    /// BaseFont without a subset tag
    pub base_font: String,
    pub ascent: f32,
    pub descent: f32,
    kind: FontKind,
    to_unicode: Option<ToUnicodeMap>,
}

impl FontInfo {
    /// Read a font dictionary. Missing entries fall back to Helvetica metrics
    /// so that a broken font never stops a page from being read.
    pub fn load(doc: &Document, font: &Dictionary) -> Self {
        let base_font = font
            .get(b"BaseFont")
            .ok()
            .and_then(|o| name_of(doc, o))
            .map(|n| strip_subset_tag(&n).to_string())
            .unwrap_or_else(|| "Helvetica".to_string());
        let to_unicode = font
            .get(b"ToUnicode")
            .ok()
            .and_then(|o| stream_bytes(doc, o))
            .map(|data| ToUnicodeMap::parse(&data));
        let subtype = font.get(b"Subtype").ok().and_then(|o| name_of(doc, o)).unwrap_or_default();

        if subtype == "Type0" {
            let descendant = font
                .get(b"DescendantFonts")
                .ok()
                .and_then(|o| match resolve(doc, o) {
                    Object::Array(items) => items.first().map(|first| resolve(doc, first)),
                    _ => None,
                })
                .and_then(|o| o.as_dict().ok());
            let (widths, default_width, descriptor) = match descendant {
                Some(cid_font) => (
                    cid_font.get(b"W").ok().map(|w| cid_widths(doc, w)).unwrap_or_default(),
                    cid_font.get(b"DW").ok().and_then(|o| number(doc, o)).unwrap_or(DEFAULT_CID_WIDTH),
                    descriptor_of(doc, cid_font),
                ),
                None => (HashMap::new(), DEFAULT_CID_WIDTH, None),
            };
            let (ascent, descent) = vertical_metrics(doc, descriptor);
            return Self {
                base_font,
                ascent,
                descent,
                kind: FontKind::Composite { widths, default_width },
                to_unicode,
            };
        }

        let first_char = font
            .get(b"FirstChar")
            .ok()
            .and_then(|o| number(doc, o))
            .map(|n| n.max(0.0) as u32)
            .unwrap_or(0);
        let widths: Vec<f32> = match font.get(b"Widths").map(|o| resolve(doc, o)) {
            Ok(Object::Array(items)) => items.iter().map(|i| number(doc, i).unwrap_or(0.0)).collect(),
            _ => Vec::new(),
        };
        let descriptor = descriptor_of(doc, font);
        let missing_width = descriptor
            .and_then(|d| d.get(b"MissingWidth").ok())
            .and_then(|o| number(doc, o))
            .unwrap_or(0.0);
        let differences = font
            .get(b"Encoding")
            .ok()
            .map(|e| differences(doc, e))
            .unwrap_or_default();
        let (ascent, descent) = vertical_metrics(doc, descriptor);

        Self {
            base_font,
            ascent,
            descent,
            kind: FontKind::Simple {
                first_char,
                standard: widths.is_empty(),
                widths,
                missing_width,
                differences,
            },
            to_unicode,
        }
    }

    /// Helvetica with WinAnsi, used when a font resource is missing
    pub fn fallback() -> Self {
        Self {
            base_font: "Helvetica".to_string(),
            ascent: DEFAULT_ASCENT,
            descent: DEFAULT_DESCENT,
            kind: FontKind::Simple {
                first_char: 0,
                widths: Vec::new(),
                missing_width: 0.0,
                differences: HashMap::new(),
                standard: true,
            },
            to_unicode: None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.kind, FontKind::Composite { .. })
    }

    /// Split a string operand into character codes with text and widths
    pub fn decode(&self, bytes: &[u8]) -> Vec<DecodedGlyph> {
        match &self.kind {
            FontKind::Simple { .. } => bytes
                .iter()
                .map(|&b| DecodedGlyph {
                    code: vec![b],
                    text: self.simple_text(b),
                    width: self.simple_width(b),
                })
                .collect(),
            FontKind::Composite { widths, default_width } => {
                let code_bytes = match self.to_unicode.as_ref().map(ToUnicodeMap::code_bytes) {
                    Some(1) => 1,
                    _ => 2,
                };
                bytes
                    .chunks(code_bytes)
                    .map(|chunk| {
                        let code = chunk.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32);
                        let text = self
                            .to_unicode
                            .as_ref()
                            .and_then(|m| m.get(code))
                            .map(str::to_string)
                            .unwrap_or_else(|| "\u{FFFD}".to_string());
                        DecodedGlyph {
                            code: chunk.to_vec(),
                            text,
                            width: widths.get(&code).copied().unwrap_or(*default_width),
                        }
                    })
                    .collect()
            }
        }
    }

    fn simple_text(&self, code: u8) -> String {
        if let Some(text) = self.to_unicode.as_ref().and_then(|m| m.get(code as u32)) {
            return text.to_string();
        }
        if let FontKind::Simple { differences, .. } = &self.kind {
            if let Some(text) = differences.get(&code).and_then(|name| glyph_name_to_text(name)) {
                return text;
            }
        }
        win_ansi_decode(code).map(String::from).unwrap_or_default()
    }

    fn simple_width(&self, code: u8) -> f32 {
        let FontKind::Simple {
            first_char,
            widths,
            missing_width,
            standard,
            ..
        } = &self.kind
        else {
            return 0.0;
        };
        if *standard {
            return standard_width(&self.base_font, code);
        }
        (code as u32)
            .checked_sub(*first_char)
            .and_then(|index| widths.get(index as usize))
            .copied()
            .unwrap_or(*missing_width)
    }
}

/// Fonts of one resource dictionary, keyed by resource name
#[derive(Debug, Default)]
pub struct FontCache {
    fonts: HashMap<Vec<u8>, FontInfo>,
}

impl FontCache {
    pub fn from_resources(doc: &Document, resources: &Dictionary) -> Self {
        let mut fonts = HashMap::new();
        if let Ok(Object::Dictionary(entries)) = resources.get(b"Font").map(|f| resolve(doc, f)) {
            for (name, value) in entries.iter() {
                if let Ok(font) = resolve(doc, value).as_dict() {
                    fonts.insert(name.clone(), FontInfo::load(doc, font));
                }
            }
        }
        Self { fonts }
    }

    pub fn get(&self, name: &[u8]) -> Option<&FontInfo> {
        self.fonts.get(name)
    }
}

/// "ABCDEF+Arial" → "Arial"
pub fn strip_subset_tag(name: &str) -> &str {
    match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.chars().all(|c| c.is_ascii_uppercase()) => rest,
        _ => name,
    }
}

fn name_of(doc: &Document, object: &Object) -> Option<String> {
    match resolve(doc, object) {
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

fn stream_bytes(doc: &Document, object: &Object) -> Option<Vec<u8>> {
    match resolve(doc, object) {
        Object::Stream(stream) if stream.dict.has(b"Filter") => stream.decompressed_content().ok(),
        Object::Stream(stream) => Some(stream.content.clone()),
        _ => None,
    }
}

fn descriptor_of<'a>(doc: &'a Document, font: &'a Dictionary) -> Option<&'a Dictionary> {
    font.get(b"FontDescriptor")
        .ok()
        .and_then(|o| resolve(doc, o).as_dict().ok())
}

fn vertical_metrics(doc: &Document, descriptor: Option<&Dictionary>) -> (f32, f32) {
    let read = |key: &[u8]| {
        descriptor
            .and_then(|d| d.get(key).ok())
            .and_then(|o| number(doc, o))
    };
    let ascent = read(b"Ascent").filter(|a| *a > 0.0).unwrap_or(DEFAULT_ASCENT);
    let descent = read(b"Descent").filter(|d| *d < 0.0).unwrap_or(DEFAULT_DESCENT);
    (ascent, descent)
}

/// Parse a CIDFont `/W` array: `c [w1 w2 ...]` and `c_first c_last w` forms
fn cid_widths(doc: &Document, w: &Object) -> HashMap<u32, f32> {
    let mut widths = HashMap::new();
    let Object::Array(items) = resolve(doc, w) else {
        return widths;
    };
    let mut i = 0;
    while i < items.len() {
        let Some(first) = number(doc, &items[i]) else {
            i += 1;
            continue;
        };
        let first = first.max(0.0) as u32;
        match items.get(i + 1).map(|o| resolve(doc, o)) {
            Some(Object::Array(list)) => {
                for (offset, value) in list.iter().enumerate() {
                    if let Some(width) = number(doc, value) {
                        widths.insert(first + offset as u32, width);
                    }
                }
                i += 2;
            }
            Some(last) => {
                let last = number(doc, last).map(|l| l.max(0.0) as u32).unwrap_or(first);
                let width = items.get(i + 2).and_then(|o| number(doc, o)).unwrap_or(DEFAULT_CID_WIDTH);
                for cid in first..=last.min(first.saturating_add(0xFFFF)) {
                    widths.insert(cid, width);
                }
                i += 3;
            }
            None => break,
        }
    }
    widths
}

/// Glyph names from an encoding dictionary's `/Differences`
fn differences(doc: &Document, encoding: &Object) -> HashMap<u8, String> {
    let mut names = HashMap::new();
    let Object::Dictionary(dict) = resolve(doc, encoding) else {
        return names;
    };
    let Ok(Object::Array(items)) = dict.get(b"Differences").map(|d| resolve(doc, d)) else {
        return names;
    };
    let mut code: u32 = 0;
    for item in items {
        match resolve(doc, item) {
            Object::Integer(n) => code = (*n).max(0) as u32,
            Object::Name(name) => {
                if code <= 255 {
                    names.insert(code as u8, String::from_utf8_lossy(name).into_owned());
                }
                code += 1;
            }
            _ => {}
        }
    }
    names
}
