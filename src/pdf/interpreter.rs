//! Content stream interpreter.
//!
//! Walks the decoded operations of a page, tracking the graphics state (CTM),
//! the text state and the text matrices, and records every text showing
//! operator together with the glyphs it placed. Both block extraction and
//! redaction work from the same `InterpretedPage`, so the boxes they see are
//! always identical.
//!
//! Form XObjects are not entered: their text is neither extracted nor
//! redacted.

use log::trace;
use lopdf::content::{Content, Operation};
use lopdf::{Object, ObjectId};

use super::document::{PageGeometry, PdfDocument};
use super::fonts::{DecodedGlyph, FontCache, FontInfo};
use super::geometry::{BoundingBox, Matrix};
use crate::errors::PdfError;

/// A glyph painted by a text showing operator
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedGlyph {
    pub code: Vec<u8>,
    pub text: String,
    /// Glyph box in top-left page coordinates
    pub bbox: BoundingBox,
    /// Baseline origin in top-left page coordinates
    pub origin: (f32, f32),
    /// Font size as it appears on the page
    pub size: f32,
    /// Displacement of this glyph expressed as a negated TJ adjustment,
    /// i.e. in thousandths of text space including character and word spacing
    pub tj_units: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShowElement {
    Glyph(PlacedGlyph),
    /// A TJ number, kept as written
    Adjust(f32),
}

/// One `Tj`, `TJ`, `'` or `"` operation and what it drew
#[derive(Debug, Clone, PartialEq)]
pub struct TextShow {
    /// Index into `InterpretedPage::operations`
    pub op_index: usize,
    pub operator: String,
    pub elements: Vec<ShowElement>,
}

impl TextShow {
    pub fn glyphs(&self) -> impl Iterator<Item = &PlacedGlyph> {
        self.elements.iter().filter_map(|e| match e {
            ShowElement::Glyph(g) => Some(g),
            ShowElement::Adjust(_) => None,
        })
    }
}

/// Where a glyph sits in an `InterpretedPage`: the show and the element in it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlyphRef {
    pub show: usize,
    pub element: usize,
}

/// Decoded operations of a page plus the text shows found in them
#[derive(Debug, Clone)]
pub struct InterpretedPage {
    pub page_id: ObjectId,
    pub geometry: PageGeometry,
    pub operations: Vec<Operation>,
    pub shows: Vec<TextShow>,
}

impl InterpretedPage {
    pub fn glyph_count(&self) -> usize {
        self.shows.iter().map(|s| s.glyphs().count()).sum()
    }

    /// Every glyph in drawing order, with its position
    pub fn placed_glyphs(&self) -> impl Iterator<Item = (GlyphRef, &PlacedGlyph)> {
        self.shows.iter().enumerate().flat_map(|(show, text_show)| {
            text_show
                .elements
                .iter()
                .enumerate()
                .filter_map(move |(element, item)| match item {
                    ShowElement::Glyph(glyph) => Some((GlyphRef { show, element }, glyph)),
                    ShowElement::Adjust(_) => None,
                })
        })
    }
}

#[derive(Debug, Clone)]
struct TextParams {
    font: Option<Vec<u8>>,
    size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for TextParams {
    fn default() -> Self {
        Self {
            font: None,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct GraphicsState {
    ctm: Matrix,
    text: TextParams,
}

struct Interpreter {
    fonts: FontCache,
    fallback: FontInfo,
    geometry: PageGeometry,
    stack: Vec<GraphicsState>,
    state: GraphicsState,
    text_matrix: Matrix,
    line_matrix: Matrix,
    shows: Vec<TextShow>,
    page: u32,
}

/// Decode and interpret the content of one page.
///
/// `page_number` is only used for error messages.
pub fn interpret_page(doc: &PdfDocument, page_number: u32) -> Result<InterpretedPage, PdfError> {
    let page_id = doc.page_id(page_number).map_err(|e| PdfError::Extraction {
        page: page_number,
        reason: e.to_string(),
    })?;
    let bytes = doc.page_content(page_id).map_err(|e| PdfError::Extraction {
        page: page_number,
        reason: e.to_string(),
    })?;
    let content = Content::decode(&bytes).map_err(|e| PdfError::Extraction {
        page: page_number,
        reason: format!("unparseable content stream: {}", e),
    })?;

    let geometry = doc.page_geometry(page_id);
    let resources = doc.page_resources(page_id);
    let mut interpreter = Interpreter {
        fonts: FontCache::from_resources(doc.inner(), &resources),
        fallback: FontInfo::fallback(),
        geometry,
        stack: Vec::new(),
        state: GraphicsState::default(),
        text_matrix: Matrix::identity(),
        line_matrix: Matrix::identity(),
        shows: Vec::new(),
        page: page_number,
    };
    for (index, operation) in content.operations.iter().enumerate() {
        interpreter.apply(index, operation);
    }

    Ok(InterpretedPage {
        page_id,
        geometry,
        shows: interpreter.shows,
        operations: content.operations,
    })
}

fn operand(operands: &[Object], index: usize) -> Option<f32> {
    match operands.get(index)? {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn operands6(operands: &[Object]) -> Option<Matrix> {
    Some(Matrix::new(
        operand(operands, 0)?,
        operand(operands, 1)?,
        operand(operands, 2)?,
        operand(operands, 3)?,
        operand(operands, 4)?,
        operand(operands, 5)?,
    ))
}

impl Interpreter {
    fn apply(&mut self, index: usize, op: &Operation) {
        let operands = op.operands.as_slice();
        match op.operator.as_str() {
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if let Some(saved) = self.stack.pop() {
                    self.state = saved;
                }
            }
            "cm" => {
                if let Some(m) = operands6(operands) {
                    self.state.ctm = m.multiply(&self.state.ctm);
                }
            }
            "BT" => {
                self.text_matrix = Matrix::identity();
                self.line_matrix = Matrix::identity();
            }
            "ET" => {}
            "Tf" => {
                if let Some(Object::Name(name)) = operands.first() {
                    self.state.text.font = Some(name.clone());
                }
                if let Some(size) = operand(operands, 1) {
                    self.state.text.size = size;
                }
            }
            "Tc" => self.set_param(operands, |t, v| t.char_spacing = v),
            "Tw" => self.set_param(operands, |t, v| t.word_spacing = v),
            "Tz" => self.set_param(operands, |t, v| t.horizontal_scale = v / 100.0),
            "TL" => self.set_param(operands, |t, v| t.leading = v),
            "Ts" => self.set_param(operands, |t, v| t.rise = v),
            "Td" => {
                if let (Some(tx), Some(ty)) = (operand(operands, 0), operand(operands, 1)) {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (operand(operands, 0), operand(operands, 1)) {
                    self.state.text.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = operands6(operands) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    let elements = self.show_string(bytes);
                    self.record(index, "Tj", elements);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    let mut elements = Vec::new();
                    for item in items {
                        match item {
                            Object::String(bytes, _) => elements.extend(self.show_string(bytes)),
                            Object::Integer(n) => {
                                self.adjust(*n as f32);
                                elements.push(ShowElement::Adjust(*n as f32));
                            }
                            Object::Real(n) => {
                                self.adjust(*n);
                                elements.push(ShowElement::Adjust(*n));
                            }
                            _ => {}
                        }
                    }
                    self.record(index, "TJ", elements);
                }
            }
            "'" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.first() {
                    let elements = self.show_string(bytes);
                    self.record(index, "'", elements);
                }
            }
            "\"" => {
                if let (Some(aw), Some(ac)) = (operand(operands, 0), operand(operands, 1)) {
                    self.state.text.word_spacing = aw;
                    self.state.text.char_spacing = ac;
                }
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    let elements = self.show_string(bytes);
                    self.record(index, "\"", elements);
                }
            }
            _ => {}
        }
    }

    fn set_param(&mut self, operands: &[Object], set: impl FnOnce(&mut TextParams, f32)) {
        if let Some(value) = operand(operands, 0) {
            set(&mut self.state.text, value);
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translate(tx, ty).multiply(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.state.text.leading;
        self.move_line(0.0, -leading);
    }

    fn record(&mut self, op_index: usize, operator: &str, elements: Vec<ShowElement>) {
        if elements.is_empty() {
            return;
        }
        trace!(
            "Page {}: {} at op {} placed {} element(s)",
            self.page,
            operator,
            op_index,
            elements.len()
        );
        self.shows.push(TextShow {
            op_index,
            operator: operator.to_string(),
            elements,
        });
    }

    fn current_font(&self) -> &FontInfo {
        self.state
            .text
            .font
            .as_deref()
            .and_then(|name| self.fonts.get(name))
            .unwrap_or(&self.fallback)
    }

    /// TJ numbers move the pen left by `n/1000` text space units
    fn adjust(&mut self, n: f32) {
        let t = &self.state.text;
        let tx = -n / 1000.0 * t.size * t.horizontal_scale;
        self.text_matrix = Matrix::translate(tx, 0.0).multiply(&self.text_matrix);
    }

    fn show_string(&mut self, bytes: &[u8]) -> Vec<ShowElement> {
        let font = self.current_font();
        let decoded: Vec<DecodedGlyph> = font.decode(bytes);
        let (ascent, descent) = (font.ascent / 1000.0, font.descent / 1000.0);
        let t = self.state.text.clone();
        let geometry = self.geometry;
        let mut elements = Vec::with_capacity(decoded.len());

        for glyph in decoded {
            let word_spacing = if glyph.is_word_space() { t.word_spacing } else { 0.0 };
            let glyph_width = glyph.width / 1000.0 * t.size * t.horizontal_scale;
            let advance = glyph_width + (t.char_spacing + word_spacing) * t.horizontal_scale;

            let to_page = self.text_matrix.multiply(&self.state.ctm);
            let bottom = t.rise + descent * t.size;
            let top = t.rise + ascent * t.size;
            let points: Vec<(f32, f32)> = [(0.0, bottom), (glyph_width, bottom), (0.0, top), (glyph_width, top)]
                .iter()
                .map(|&(x, y)| {
                    let (px, py) = to_page.transform_point(x, y);
                    geometry.to_top_left(px, py)
                })
                .collect();
            let bbox = BoundingBox::from_points(&points).unwrap_or_default();
            let (ox, oy) = to_page.transform_point(0.0, t.rise);

            let tj_units = if t.size.abs() > f32::EPSILON {
                glyph.width + (t.char_spacing + word_spacing) * 1000.0 / t.size
            } else {
                glyph.width
            };

            elements.push(ShowElement::Glyph(PlacedGlyph {
                code: glyph.code,
                text: glyph.text,
                bbox,
                origin: geometry.to_top_left(ox, oy),
                size: t.size.abs() * to_page.vertical_scale(),
                tj_units,
            }));
            self.text_matrix = Matrix::translate(advance, 0.0).multiply(&self.text_matrix);
        }
        elements
    }
}
