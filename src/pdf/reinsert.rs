//! Writing translated text back into redacted boxes.
//!
//! Every box of a page is drawn into one content stream appended after the
//! page's existing content, wrapped in `q`/`Q`. A failure in one box never
//! affects the others.

use log::{debug, warn};
use lopdf::content::{Content, Operation};
use lopdf::{Object, StringFormat};

use super::document::{PageGeometry, PdfDocument};
use super::embed::PdfFont;
use super::geometry::BoundingBox;
use super::layout::{fit_text, FittedText, LayoutOptions};
use super::shaping::{join_arabic, shape_line, shaped_width, visual_order, Direction, ShapedGlyph};
use crate::errors::PdfError;

/// How translated text is laid out in its box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutStrategy {
    /// Plain text, shrunk until it fits
    ShrinkToFit,
    /// Shaped text with the embedded font, shrunk the same way
    StyledBox,
}

/// One box to fill with translated text
#[derive(Debug, Clone, PartialEq)]
pub struct RenderDirective {
    /// Index of the source block on its page
    pub block: usize,
    pub bbox: BoundingBox,
    pub text: String,
    pub direction: Direction,
    pub strategy: LayoutStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReinsertOptions {
    pub layout: LayoutOptions,
    /// RGB colour of the inserted text
    pub text_color: [f32; 3],
}

impl Default for ReinsertOptions {
    fn default() -> Self {
        Self {
            layout: LayoutOptions::default(),
            text_color: [0.0, 0.0, 0.0],
        }
    }
}

/// Result of drawing one box
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBox {
    pub block: usize,
    pub size: f32,
    /// Lines as drawn, in visual order
    pub lines: Vec<String>,
    pub overflow: bool,
    pub strategy: LayoutStrategy,
}

/// Draws text with one font for the whole document
#[derive(Debug)]
pub struct Reinserter {
    font: PdfFont,
    options: ReinsertOptions,
}

impl Reinserter {
    pub fn new(font: PdfFont, options: ReinsertOptions) -> Self {
        Self { font, options }
    }

    pub fn font(&self) -> &PdfFont {
        &self.font
    }

    pub fn options(&self) -> &ReinsertOptions {
        &self.options
    }

    /// Draw every directive of one page. The outer error is for the page as
    /// a whole; inner errors belong to single boxes.
    pub fn insert_page(
        &mut self,
        doc: &mut PdfDocument,
        page_number: u32,
        directives: &[RenderDirective],
    ) -> Vec<Result<RenderedBox, PdfError>> {
        if directives.is_empty() {
            return Vec::new();
        }
        match self.prepare_page(doc, page_number) {
            Ok((page_id, font_name, geometry)) => {
                let mut operations = vec![Operation::new("q", vec![])];
                let mut results = Vec::with_capacity(directives.len());
                for directive in directives {
                    match self.render(directive, &font_name, &geometry) {
                        Ok((ops, rendered)) => {
                            operations.extend(ops);
                            results.push(Ok(rendered));
                        }
                        Err(reason) => {
                            warn!(
                                "Page {}, block {}: text insertion failed: {}",
                                page_number, directive.block, reason
                            );
                            results.push(Err(PdfError::Insertion {
                                page: page_number,
                                block: directive.block,
                                reason,
                            }));
                        }
                    }
                }
                operations.push(Operation::new("Q", vec![]));

                let written = Content { operations }
                    .encode()
                    .map_err(|e| e.to_string())
                    .and_then(|bytes| doc.append_page_content(page_id, bytes).map_err(|e| e.to_string()));
                match written {
                    Ok(()) => results,
                    Err(reason) => fail_all(page_number, directives, &reason),
                }
            }
            Err(reason) => fail_all(page_number, directives, &reason),
        }
    }

    /// Write font data that depends on every page drawn so far
    pub fn finish(&self, doc: &mut PdfDocument) -> Result<(), PdfError> {
        self.font.finalize(doc)
    }

    fn prepare_page(
        &mut self,
        doc: &mut PdfDocument,
        page_number: u32,
    ) -> Result<(lopdf::ObjectId, String, PageGeometry), String> {
        let page_id = doc.page_id(page_number).map_err(|e| e.to_string())?;
        let font_id = self.font.embed(doc).map_err(|e| e.to_string())?;
        let name = doc
            .register_page_font(page_id, self.font.resource_name(), font_id)
            .map_err(|e| e.to_string())?;
        Ok((page_id, name, doc.page_geometry(page_id)))
    }

    fn render(
        &mut self,
        directive: &RenderDirective,
        font_name: &str,
        geometry: &PageGeometry,
    ) -> Result<(Vec<Operation>, RenderedBox), String> {
        if directive.text.trim().is_empty() {
            return Ok((
                Vec::new(),
                RenderedBox {
                    block: directive.block,
                    size: 0.0,
                    lines: Vec::new(),
                    overflow: false,
                    strategy: directive.strategy,
                },
            ));
        }
        match directive.strategy {
            LayoutStrategy::ShrinkToFit => self.render_plain(directive, font_name, geometry),
            LayoutStrategy::StyledBox => self.render_styled(directive, font_name, geometry),
        }
    }

    fn render_plain(
        &mut self,
        directive: &RenderDirective,
        font_name: &str,
        geometry: &PageGeometry,
    ) -> Result<(Vec<Operation>, RenderedBox), String> {
        let rtl = directive.direction.is_rtl();
        let logical = if rtl {
            join_arabic(&directive.text)
        } else {
            directive.text.clone()
        };
        let bbox = directive.bbox;
        let fitted = {
            let font = &self.font;
            fit_text(&logical, bbox.width(), bbox.height(), &self.options.layout, &|text, size| {
                font.text_width(text, size)
            })
        };

        let mut operations = Vec::new();
        let mut drawn = Vec::with_capacity(fitted.lines.len());
        for (index, line) in fitted.lines.iter().enumerate() {
            let visual = if rtl {
                visual_order(line, Direction::Rtl)
            } else {
                line.clone()
            };
            let width = self.font.text_width(&visual, fitted.size);
            let x = if rtl { bbox.x1 - width } else { bbox.x0 };
            let encoded = self.font.encode_text(&visual).map_err(|e| e.to_string())?;
            operations.extend(self.line_operations(font_name, &fitted, index, x, &bbox, geometry, vec![encoded], "Tj"));
            drawn.push(visual);
        }

        debug!(
            "Block {}: {} line(s) at {}pt{}",
            directive.block,
            drawn.len(),
            fitted.size,
            if fitted.overflow { " (overflowing)" } else { "" }
        );
        Ok((
            operations,
            RenderedBox {
                block: directive.block,
                size: fitted.size,
                lines: drawn,
                overflow: fitted.overflow,
                strategy: LayoutStrategy::ShrinkToFit,
            },
        ))
    }

    fn render_styled(
        &mut self,
        directive: &RenderDirective,
        font_name: &str,
        geometry: &PageGeometry,
    ) -> Result<(Vec<Operation>, RenderedBox), String> {
        let PdfFont::Embedded(font) = &self.font else {
            return Err("styled layout needs an embedded font".to_string());
        };
        let bbox = directive.bbox;
        let direction = directive.direction;
        let units_per_em = font.units_per_em();

        // Fit and shape while the face is borrowed, then record glyph use
        let (fitted, shaped_lines) = {
            let face = font.face().map_err(|e| e.to_string())?;
            let fitted = fit_text(
                &directive.text,
                bbox.width(),
                bbox.height(),
                &self.options.layout,
                &|text, size| shaped_width(&shape_line(&face, text, direction), units_per_em, size),
            );
            let shaped: Vec<Vec<ShapedGlyph>> = fitted
                .lines
                .iter()
                .map(|line| shape_line(&face, line, direction))
                .collect();
            (fitted, shaped)
        };

        let mut operations = Vec::new();
        let mut drawn = Vec::with_capacity(shaped_lines.len());
        for (index, glyphs) in shaped_lines.iter().enumerate() {
            let width = shaped_width(glyphs, units_per_em, fitted.size);
            let x = if direction.is_rtl() { bbox.x1 - width } else { bbox.x0 };
            let records: Vec<(u16, i32, String)> = glyphs
                .iter()
                .map(|g| (g.glyph_id, g.x_advance, g.text.clone()))
                .collect();
            let PdfFont::Embedded(font) = &mut self.font else {
                return Err("styled layout needs an embedded font".to_string());
            };
            let placements = font.place_shaped(&records).map_err(|e| e.to_string())?;

            let mut array = Vec::with_capacity(placements.len() * 2);
            for placement in placements {
                array.push(Object::String(
                    placement.glyph_id.to_be_bytes().to_vec(),
                    StringFormat::Hexadecimal,
                ));
                if placement.adjustment.abs() > 0.01 {
                    array.push(Object::Real(placement.adjustment));
                }
            }
            operations.extend(self.line_operations(
                font_name,
                &fitted,
                index,
                x,
                &bbox,
                geometry,
                vec![Object::Array(array)],
                "TJ",
            ));
            drawn.push(glyphs.iter().map(|g| g.text.as_str()).collect::<String>());
        }

        Ok((
            operations,
            RenderedBox {
                block: directive.block,
                size: fitted.size,
                lines: drawn,
                overflow: fitted.overflow,
                strategy: LayoutStrategy::StyledBox,
            },
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn line_operations(
        &self,
        font_name: &str,
        fitted: &FittedText,
        index: usize,
        x: f32,
        bbox: &BoundingBox,
        geometry: &PageGeometry,
        operands: Vec<Object>,
        operator: &str,
    ) -> Vec<Operation> {
        let size = fitted.size;
        let baseline = bbox.y0
            + size * self.font.ascent_ratio()
            + index as f32 * size * self.options.layout.line_height;
        let (ux, uy) = geometry.to_user_space(x, baseline);
        let [r, g, b] = self.options.text_color;
        vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(font_name.as_bytes().to_vec()), Object::Real(size)],
            ),
            Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
            Operation::new(
                "Tm",
                vec![
                    Object::Integer(1),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(1),
                    Object::Real(ux),
                    Object::Real(uy),
                ],
            ),
            Operation::new(operator, operands),
            Operation::new("ET", vec![]),
        ]
    }
}

fn fail_all(page: u32, directives: &[RenderDirective], reason: &str) -> Vec<Result<RenderedBox, PdfError>> {
    warn!("Page {}: text insertion failed for the whole page: {}", page, reason);
    directives
        .iter()
        .map(|d| {
            Err(PdfError::Insertion {
                page,
                block: d.block,
                reason: reason.to_string(),
            })
        })
        .collect()
}
