//! Fonts used to write translated text.
//!
//! A substitute TrueType/OpenType font is embedded once per document as a
//! Type0 font over a CIDFontType2 descendant with Identity-H encoding, so a
//! shown code is directly a glyph id. Widths and the ToUnicode map cover only
//! the glyphs that were actually used and are written by `finalize`.
//! Without a substitute font, the standard Helvetica font with WinAnsi
//! encoding is used.

use log::{debug, warn};
use lopdf::{dictionary, Dictionary, Object, ObjectId, Stream, StringFormat};
use rustybuzz::ttf_parser::GlyphId;
use rustybuzz::Face;
use std::collections::BTreeMap;
use std::path::Path;

use super::document::PdfDocument;
use super::encoding::{win_ansi_encode, win_ansi_encode_lossy};
use super::fonts::standard_width;
use crate::errors::PdfError;

/// A glyph written through an embedded font
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphPlacement {
    pub glyph_id: u16,
    /// Difference between the shaped advance and the font's default advance,
    /// in thousandths of an em, as a `TJ` adjustment
    pub adjustment: f32,
}

/// A substitute font embedded in the document
#[derive(Debug)]
pub struct EmbeddedFont {
    name: String,
    source: String,
    data: Vec<u8>,
    units_per_em: f32,
    ascent: f32,
    descent: f32,
    font_id: Option<ObjectId>,
    /// Glyph id to (width in 1/1000 em, text it stands for)
    used: BTreeMap<u16, (f32, String)>,
    missing_glyphs: usize,
}

impl EmbeddedFont {
    /// Load and validate a font file
    pub fn from_file(path: &Path) -> Result<Self, PdfError> {
        let data = std::fs::read(path).map_err(|e| PdfError::FontEmbedding {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Embedded".to_string());
        Self::from_bytes(data, &stem, &path.display().to_string())
    }

    /// Validate font bytes; `name` becomes the PDF BaseFont
    pub fn from_bytes(data: Vec<u8>, name: &str, source: &str) -> Result<Self, PdfError> {
        let (units_per_em, ascent, descent) = {
            let face = Face::from_slice(&data, 0).ok_or_else(|| PdfError::FontEmbedding {
                path: source.to_string(),
                reason: "not a TrueType or OpenType font".to_string(),
            })?;
            (
                face.units_per_em().max(1) as f32,
                face.ascender() as f32,
                face.descender() as f32,
            )
        };
        let name: String = name.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '-').collect();

        Ok(Self {
            name: if name.is_empty() { "Embedded".to_string() } else { name },
            source: source.to_string(),
            data,
            units_per_em,
            ascent,
            descent,
            font_id: None,
            used: BTreeMap::new(),
            missing_glyphs: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parsed face; parsing is lazy and cheap
    pub fn face(&self) -> Result<Face<'_>, PdfError> {
        Face::from_slice(&self.data, 0).ok_or_else(|| PdfError::FontEmbedding {
            path: self.source.clone(),
            reason: "font data became unreadable".to_string(),
        })
    }

    pub fn units_per_em(&self) -> f32 {
        self.units_per_em
    }

    /// Add the font objects to the document. Calling it again reuses the
    /// objects created the first time.
    pub fn embed(&mut self, doc: &mut PdfDocument) -> Result<ObjectId, PdfError> {
        if let Some(id) = self.font_id {
            return Ok(id);
        }
        let face = self.face()?;
        let scale = 1000.0 / self.units_per_em;
        let bbox = face.global_bounding_box();
        let font_bbox: Vec<Object> = [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max]
            .iter()
            .map(|v| Object::Integer((*v as f32 * scale).round() as i64))
            .collect();
        let ascent = (self.ascent * scale).round() as i64;
        let descent = (self.descent * scale).round() as i64;

        let inner = doc.inner_mut();
        let file_id = inner.add_object(Stream::new(
            dictionary! { "Length1" => Object::Integer(self.data.len() as i64) },
            self.data.clone(),
        ));
        let descriptor_id = inner.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => Object::Name(self.name.clone().into_bytes()),
            "Flags" => Object::Integer(4),
            "FontBBox" => font_bbox,
            "ItalicAngle" => Object::Integer(0),
            "Ascent" => Object::Integer(ascent),
            "Descent" => Object::Integer(descent),
            "CapHeight" => Object::Integer(ascent),
            "StemV" => Object::Integer(80),
            "FontFile2" => Object::Reference(file_id),
        });
        let cid_font_id = inner.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => Object::Name(self.name.clone().into_bytes()),
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => Object::Integer(0),
            },
            "FontDescriptor" => Object::Reference(descriptor_id),
            "DW" => Object::Integer(1000),
            "CIDToGIDMap" => "Identity",
        });
        let font_id = inner.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => Object::Name(self.name.clone().into_bytes()),
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(cid_font_id)],
        });
        debug!("Embedded font {} ({} bytes) as {:?}", self.name, self.data.len(), font_id);
        self.font_id = Some(font_id);
        Ok(font_id)
    }

    /// Width of unshaped text in text space units at `size`
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let Ok(face) = self.face() else {
            return 0.0;
        };
        let units: f32 = text
            .chars()
            .map(|c| {
                face.glyph_index(c)
                    .and_then(|g| face.glyph_hor_advance(g))
                    .unwrap_or(0) as f32
            })
            .sum();
        units / self.units_per_em * size
    }

    /// Encode unshaped text as two-byte glyph ids, one glyph per character
    pub fn encode_text(&mut self, text: &str) -> Result<Vec<u8>, PdfError> {
        let face = Face::from_slice(&self.data, 0).ok_or_else(|| PdfError::FontEmbedding {
            path: self.source.clone(),
            reason: "font data became unreadable".to_string(),
        })?;
        let scale = 1000.0 / self.units_per_em;
        let mut bytes = Vec::with_capacity(text.len() * 2);
        for c in text.chars() {
            let glyph = match face.glyph_index(c) {
                Some(g) => g,
                None => {
                    self.missing_glyphs += 1;
                    GlyphId(0)
                }
            };
            let width = face.glyph_hor_advance(glyph).unwrap_or(0) as f32 * scale;
            self.used
                .entry(glyph.0)
                .or_insert_with(|| (width, c.to_string()));
            bytes.extend_from_slice(&glyph.0.to_be_bytes());
        }
        Ok(bytes)
    }

    /// Record shaped glyphs and return their placements.
    ///
    /// `glyphs` holds `(glyph id, shaped advance in font units, text)`.
    pub fn place_shaped(&mut self, glyphs: &[(u16, i32, String)]) -> Result<Vec<GlyphPlacement>, PdfError> {
        let face = Face::from_slice(&self.data, 0).ok_or_else(|| PdfError::FontEmbedding {
            path: self.source.clone(),
            reason: "font data became unreadable".to_string(),
        })?;
        let scale = 1000.0 / self.units_per_em;
        Ok(glyphs
            .iter()
            .map(|(glyph_id, advance, text)| {
                let width = face.glyph_hor_advance(GlyphId(*glyph_id)).unwrap_or(0) as f32 * scale;
                let entry = self
                    .used
                    .entry(*glyph_id)
                    .or_insert_with(|| (width, String::new()));
                if entry.1.is_empty() {
                    entry.1 = text.clone();
                }
                GlyphPlacement {
                    glyph_id: *glyph_id,
                    adjustment: width - *advance as f32 * scale,
                }
            })
            .collect())
    }

    /// Characters of `text` the font has no glyph for, each listed once
    pub fn uncovered_chars(&self, text: &str) -> Vec<char> {
        let Ok(face) = self.face() else {
            return Vec::new();
        };
        let mut missing = Vec::new();
        for c in text.chars().filter(|c| needs_glyph(*c)) {
            if face.glyph_index(c).is_none() && !missing.contains(&c) {
                missing.push(c);
            }
        }
        missing
    }

    /// Characters that had no glyph and were drawn as `.notdef`
    pub fn missing_glyphs(&self) -> usize {
        self.missing_glyphs
    }

    pub fn used_glyphs(&self) -> usize {
        self.used.len()
    }

    /// Write the `/W` array and the ToUnicode map for every glyph used so far
    pub fn finalize(&self, doc: &mut PdfDocument) -> Result<(), PdfError> {
        let Some(font_id) = self.font_id else {
            return Ok(());
        };
        if self.missing_glyphs > 0 {
            warn!(
                "{} character(s) have no glyph in {} and were drawn as blanks",
                self.missing_glyphs, self.name
            );
        }

        let widths = self.widths_array();
        let to_unicode_id = doc
            .inner_mut()
            .add_object(Stream::new(Dictionary::new(), self.to_unicode_cmap().into_bytes()));

        let inner = doc.inner_mut();
        let cid_font_id = inner
            .get_dictionary(font_id)
            .and_then(|d| d.get(b"DescendantFonts"))
            .and_then(Object::as_array)
            .ok()
            .and_then(|fonts| fonts.first())
            .and_then(|f| f.as_reference().ok())
            .ok_or_else(|| PdfError::FontEmbedding {
                path: self.source.clone(),
                reason: "descendant font is missing".to_string(),
            })?;

        let embedding_error = |e: lopdf::Error| PdfError::FontEmbedding {
            path: self.source.clone(),
            reason: e.to_string(),
        };
        inner
            .get_object_mut(cid_font_id)
            .and_then(Object::as_dict_mut)
            .map_err(embedding_error)?
            .set("W", Object::Array(widths));
        inner
            .get_object_mut(font_id)
            .and_then(Object::as_dict_mut)
            .map_err(embedding_error)?
            .set("ToUnicode", Object::Reference(to_unicode_id));

        debug!("Finalized font {} with {} glyph(s)", self.name, self.used.len());
        Ok(())
    }

    fn widths_array(&self) -> Vec<Object> {
        let mut array = Vec::new();
        let mut run_start: Option<u16> = None;
        let mut run: Vec<Object> = Vec::new();
        let mut previous: Option<u16> = None;

        for (&glyph, (width, _)) in &self.used {
            let consecutive = previous.is_some_and(|p| p.checked_add(1) == Some(glyph));
            if !consecutive {
                if let Some(start) = run_start.take() {
                    array.push(Object::Integer(start as i64));
                    array.push(Object::Array(std::mem::take(&mut run)));
                }
                run_start = Some(glyph);
            }
            run.push(Object::Integer(width.round() as i64));
            previous = Some(glyph);
        }
        if let Some(start) = run_start {
            array.push(Object::Integer(start as i64));
            array.push(Object::Array(run));
        }
        array
    }

    fn to_unicode_cmap(&self) -> String {
        let mut cmap = String::from(
            "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
             /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
             /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n\
             1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
        );
        let mapped: Vec<(u16, &str)> = self
            .used
            .iter()
            .filter(|(_, (_, text))| !text.is_empty())
            .map(|(glyph, (_, text))| (*glyph, text.as_str()))
            .collect();
        for chunk in mapped.chunks(100) {
            cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
            for (glyph, text) in chunk {
                let utf16: String = text.encode_utf16().map(|u| format!("{:04X}", u)).collect();
                cmap.push_str(&format!("<{:04X}> <{}>\n", glyph, utf16));
            }
            cmap.push_str("endbfchar\n");
        }
        cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
        cmap
    }
}

/// Whitespace and invisible formatting marks (ZWNJ, bidi controls) are
/// never drawn, so no font needs a glyph for them
fn needs_glyph(c: char) -> bool {
    !(c.is_whitespace()
        || c.is_control()
        || matches!(c, '\u{200B}'..='\u{200F}' | '\u{2028}'..='\u{202E}' | '\u{2060}'..='\u{206F}' | '\u{FEFF}'))
}

/// Helvetica with WinAnsi encoding, always available
#[derive(Debug, Default)]
pub struct StandardFont {
    font_id: Option<ObjectId>,
}

impl StandardFont {
    pub fn embed(&mut self, doc: &mut PdfDocument) -> ObjectId {
        if let Some(id) = self.font_id {
            return id;
        }
        let id = doc.inner_mut().add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        self.font_id = Some(id);
        id
    }

    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let (bytes, _) = win_ansi_encode_lossy(text);
        bytes.iter().map(|b| standard_width("Helvetica", *b)).sum::<f32>() / 1000.0 * size
    }

    /// Characters of `text` WinAnsi cannot express, each listed once
    pub fn uncovered_chars(&self, text: &str) -> Vec<char> {
        let mut missing = Vec::new();
        for c in text.chars().filter(|c| needs_glyph(*c)) {
            if win_ansi_encode(c).is_none() && !missing.contains(&c) {
                missing.push(c);
            }
        }
        missing
    }

    /// Encode text in WinAnsi. Invisible marks WinAnsi lacks are dropped;
    /// any other character it cannot express fails the whole string.
    pub fn encode_text(&self, text: &str) -> Result<Vec<u8>, PdfError> {
        let mut bytes = Vec::with_capacity(text.len());
        for c in text.chars() {
            match win_ansi_encode(c) {
                Some(byte) => bytes.push(byte),
                None if !needs_glyph(c) => {}
                None => {
                    return Err(PdfError::FontEmbedding {
                        path: "Helvetica".to_string(),
                        reason: format!("no WinAnsi code for {:?}", c),
                    })
                }
            }
        }
        Ok(bytes)
    }
}

/// The font the reinsertion engine writes with
#[derive(Debug)]
pub enum PdfFont {
    Embedded(EmbeddedFont),
    Standard(StandardFont),
}

impl PdfFont {
    /// Resource name preferred on each page
    pub fn resource_name(&self) -> &'static str {
        match self {
            Self::Embedded(_) => "FTr",
            Self::Standard(_) => "FHelv",
        }
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, Self::Embedded(_))
    }

    pub fn embed(&mut self, doc: &mut PdfDocument) -> Result<ObjectId, PdfError> {
        match self {
            Self::Embedded(font) => font.embed(doc),
            Self::Standard(font) => Ok(font.embed(doc)),
        }
    }

    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        match self {
            Self::Embedded(font) => font.text_width(text, size),
            Self::Standard(font) => font.text_width(text, size),
        }
    }

    /// Characters of `text` this font cannot draw. Text with any such
    /// character must not replace the original.
    pub fn uncovered_chars(&self, text: &str) -> Vec<char> {
        match self {
            Self::Embedded(font) => font.uncovered_chars(text),
            Self::Standard(font) => font.uncovered_chars(text),
        }
    }

    /// Distance from the baseline to the top of the em box, as a share of the size
    pub fn ascent_ratio(&self) -> f32 {
        match self {
            Self::Embedded(font) => (font.ascent / font.units_per_em).clamp(0.5, 1.2),
            Self::Standard(_) => 0.718,
        }
    }

    /// Encode plain text for a `Tj` operand
    pub fn encode_text(&mut self, text: &str) -> Result<Object, PdfError> {
        match self {
            Self::Embedded(font) => Ok(Object::String(font.encode_text(text)?, StringFormat::Hexadecimal)),
            Self::Standard(font) => Ok(Object::String(font.encode_text(text)?, StringFormat::Literal)),
        }
    }

    pub fn finalize(&self, doc: &mut PdfDocument) -> Result<(), PdfError> {
        match self {
            Self::Embedded(font) => font.finalize(doc),
            Self::Standard(_) => Ok(()),
        }
    }
}
