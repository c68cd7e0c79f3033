//! Text block extraction.
//!
//! Glyphs are taken in content stream order and grouped into lines, then
//! consecutive lines are grouped into rectangular blocks. The grouping never
//! sorts, so blocks come out in the document's native order.

use log::debug;

use super::document::PdfDocument;
use super::geometry::BoundingBox;
use super::interpreter::{interpret_page, GlyphRef, InterpretedPage, PlacedGlyph};
use crate::errors::PdfError;

/// A rectangular run of text on a page
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Top-left origin page coordinates
    pub bbox: BoundingBox,
    /// Lines separated by `\n`
    pub text: String,
    /// Largest font size seen in the block
    pub font_size: f32,
    /// Glyphs the block was built from. Redaction removes exactly these,
    /// so text of another block drawn inside this box is never touched.
    pub glyphs: Vec<GlyphRef>,
}

/// Grouping thresholds, all relative to the font size
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    /// Horizontal gap that becomes a space between words
    pub space_gap: f32,
    /// Horizontal gap that ends a line
    pub line_break_gap: f32,
    /// Baseline shift that ends a line
    pub baseline_tolerance: f32,
    /// Largest vertical gap between two lines of one block
    pub block_line_gap: f32,
    /// Largest size ratio between two lines of one block
    pub size_ratio: f32,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            space_gap: 0.2,
            line_break_gap: 3.0,
            baseline_tolerance: 0.5,
            block_line_gap: 0.9,
            size_ratio: 1.3,
        }
    }
}

#[derive(Debug, Clone)]
struct Line {
    bbox: BoundingBox,
    text: String,
    size: f32,
    glyphs: Vec<GlyphRef>,
}

#[derive(Debug, Clone, Default)]
pub struct BlockExtractor {
    options: ExtractOptions,
}

impl BlockExtractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    /// Extract the blocks of one page (1-based) of the current document.
    ///
    /// This only reads the document: calling it twice on an unmodified page
    /// returns identical blocks.
    pub fn extract_page(&self, doc: &PdfDocument, page_number: u32) -> Result<Vec<Block>, PdfError> {
        let page = interpret_page(doc, page_number)?;
        let blocks = self.blocks_from(&page);
        debug!(
            "Page {}: {} glyphs grouped into {} block(s)",
            page_number,
            page.glyph_count(),
            blocks.len()
        );
        Ok(blocks)
    }

    /// Group the glyphs of an interpreted page into blocks
    pub fn blocks_from(&self, page: &InterpretedPage) -> Vec<Block> {
        let glyphs = page
            .placed_glyphs()
            .filter(|(_, g)| !g.text.is_empty() && !g.bbox.is_empty());
        let lines = self.group_lines(glyphs);
        self.group_blocks(lines)
    }

    fn group_lines<'a>(&self, glyphs: impl Iterator<Item = (GlyphRef, &'a PlacedGlyph)>) -> Vec<Line> {
        let mut lines: Vec<Line> = Vec::new();
        let mut last: Option<&PlacedGlyph> = None;

        for (at, glyph) in glyphs {
            let size = glyph.size.max(1.0);
            let continues = last.is_some_and(|prev| {
                let baseline_shift = (glyph.origin.1 - prev.origin.1).abs();
                let gap = glyph.bbox.x0 - prev.bbox.x1;
                baseline_shift <= self.options.baseline_tolerance * size
                    && gap >= -0.5 * size
                    && gap <= self.options.line_break_gap * size
            });

            match (lines.last_mut(), last) {
                (Some(line), Some(prev)) if continues => {
                    let gap = glyph.bbox.x0 - prev.bbox.x1;
                    let needs_space = gap > self.options.space_gap * size
                        && !line.text.ends_with(char::is_whitespace)
                        && !glyph.text.starts_with(char::is_whitespace);
                    if needs_space {
                        line.text.push(' ');
                    }
                    line.text.push_str(&glyph.text);
                    line.bbox = line.bbox.union(&glyph.bbox);
                    line.size = line.size.max(glyph.size);
                    line.glyphs.push(at);
                }
                _ => lines.push(Line {
                    bbox: glyph.bbox,
                    text: glyph.text.clone(),
                    size: glyph.size,
                    glyphs: vec![at],
                }),
            }
            last = Some(glyph);
        }

        for line in &mut lines {
            line.text = line.text.trim().to_string();
        }
        lines.retain(|l| !l.text.is_empty());
        lines
    }

    fn group_blocks(&self, lines: Vec<Line>) -> Vec<Block> {
        let mut blocks: Vec<Block> = Vec::new();
        let mut last_line: Option<Line> = None;

        for line in lines {
            let joins = match (&last_line, blocks.last()) {
                (Some(prev), Some(block)) => {
                    let size = prev.size.max(line.size).max(1.0);
                    let vertical_gap = line.bbox.y0 - prev.bbox.y1;
                    let ratio = prev.size.max(line.size) / prev.size.min(line.size).max(0.1);
                    vertical_gap >= -0.5 * size
                        && vertical_gap <= self.options.block_line_gap * size
                        && line.bbox.horizontal_overlap(&block.bbox) > 0.0
                        && ratio <= self.options.size_ratio
                }
                _ => false,
            };

            match blocks.last_mut() {
                Some(block) if joins => {
                    block.text.push('\n');
                    block.text.push_str(&line.text);
                    block.bbox = block.bbox.union(&line.bbox);
                    block.font_size = block.font_size.max(line.size);
                    block.glyphs.extend_from_slice(&line.glyphs);
                }
                _ => blocks.push(Block {
                    bbox: line.bbox,
                    text: line.text.clone(),
                    font_size: line.size,
                    glyphs: line.glyphs.clone(),
                }),
            }
            last_line = Some(line);
        }

        blocks.retain(|b| !b.text.trim().is_empty());
        blocks
    }
}
