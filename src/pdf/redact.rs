//! Removal of the text layer under rectangles.
//!
//! All boxes of a page are applied in one rewrite of the page content:
//! every text showing operator that paints a glyph inside a box is turned
//! into a `TJ` whose removed glyphs are replaced by equivalent spacing, so
//! the glyphs that remain do not move. Paths, images and XObjects are left
//! untouched. The rewritten content is wrapped in `q`/`Q` and followed by
//! the optional fill rectangles.
//!
//! Blocks can also be redacted by ownership: only the glyphs a block was
//! extracted from are removed, and the fill leaves holes over the blocks
//! that stay, so a block drawn inside another block's box survives.

use log::{debug, warn};
use lopdf::content::{Content, Operation};
use lopdf::{Object, StringFormat};

use std::collections::HashMap;

use super::document::{PageGeometry, PdfDocument};
use super::extract::Block;
use super::geometry::BoundingBox;
use super::interpreter::{interpret_page, GlyphRef, PlacedGlyph, ShowElement, TextShow};
use crate::errors::PdfError;

/// How redactions are drawn and matched
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RedactionOptions {
    /// RGB fill painted over each redacted box, `None` for no fill
    pub fill: Option<[f32; 3]>,
    /// Share of a glyph's area that must lie in a box for it to be removed
    pub min_overlap: f32,
}

impl Default for RedactionOptions {
    fn default() -> Self {
        Self {
            fill: Some([1.0, 1.0, 1.0]),
            min_overlap: 0.5,
        }
    }
}

/// What happened on one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RedactionOutcome {
    /// One entry per requested box; `false` when the box covered no glyph
    pub applied: Vec<bool>,
    pub glyphs_removed: usize,
}

impl RedactionOutcome {
    pub fn failed_boxes(&self) -> impl Iterator<Item = usize> + '_ {
        self.applied
            .iter()
            .enumerate()
            .filter(|(_, applied)| !**applied)
            .map(|(index, _)| index)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Redactor {
    options: RedactionOptions,
}

impl Redactor {
    pub fn new(options: RedactionOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RedactionOptions {
        &self.options
    }

    /// Remove the text under `boxes` (top-left page coordinates) from one
    /// page. The page is rewritten at most once; when no box covers any
    /// glyph the page is left as it was.
    pub fn redact_page(
        &self,
        doc: &mut PdfDocument,
        page_number: u32,
        boxes: &[BoundingBox],
    ) -> Result<RedactionOutcome, PdfError> {
        self.apply(doc, page_number, boxes, &[], |_, glyph| self.covering_boxes(glyph, boxes))
    }

    /// Remove the blocks at `targets`, indexes into `blocks`, which must be
    /// the blocks extracted from the page as it is now.
    ///
    /// A glyph that belongs to a block goes only with that block. Glyphs no
    /// block claims (blank or unmapped ones) go with any target box that
    /// covers them.
    pub fn redact_blocks(
        &self,
        doc: &mut PdfDocument,
        page_number: u32,
        blocks: &[Block],
        targets: &[usize],
    ) -> Result<RedactionOutcome, PdfError> {
        let mut owners: HashMap<GlyphRef, Option<usize>> = HashMap::new();
        for block in blocks {
            for at in &block.glyphs {
                owners.insert(*at, None);
            }
        }
        let mut boxes = Vec::with_capacity(targets.len());
        for (slot, &index) in targets.iter().enumerate() {
            let Some(block) = blocks.get(index) else {
                return Err(PdfError::Redaction {
                    page: page_number,
                    block: Some(index),
                    reason: "no such block on the page".to_string(),
                });
            };
            for at in &block.glyphs {
                owners.insert(*at, Some(slot));
            }
            boxes.push(block.bbox);
        }
        let kept: Vec<BoundingBox> = blocks
            .iter()
            .enumerate()
            .filter(|(index, _)| !targets.contains(index))
            .map(|(_, block)| block.bbox)
            .collect();

        self.apply(doc, page_number, &boxes, &kept, |at, glyph| match owners.get(&at) {
            Some(Some(slot)) => vec![*slot],
            Some(None) => Vec::new(),
            None => self.covering_boxes(glyph, &boxes),
        })
    }

    /// Rewrite the page without the glyphs `removed_by` assigns to a box
    fn apply<F>(
        &self,
        doc: &mut PdfDocument,
        page_number: u32,
        boxes: &[BoundingBox],
        kept: &[BoundingBox],
        removed_by: F,
    ) -> Result<RedactionOutcome, PdfError>
    where
        F: Fn(GlyphRef, &PlacedGlyph) -> Vec<usize>,
    {
        let page_error = |reason: String| PdfError::Redaction {
            page: page_number,
            block: None,
            reason,
        };
        let page = interpret_page(doc, page_number).map_err(|e| page_error(e.to_string()))?;

        let mut applied = vec![false; boxes.len()];
        let mut removed_per_show: Vec<Vec<bool>> = Vec::with_capacity(page.shows.len());
        let mut glyphs_removed = 0;

        for (show_index, show) in page.shows.iter().enumerate() {
            let mask: Vec<bool> = show
                .elements
                .iter()
                .enumerate()
                .map(|(element, item)| match item {
                    ShowElement::Glyph(glyph) => {
                        let at = GlyphRef {
                            show: show_index,
                            element,
                        };
                        let hits = removed_by(at, glyph);
                        for &index in &hits {
                            if let Some(slot) = applied.get_mut(index) {
                                *slot = true;
                            }
                        }
                        !hits.is_empty()
                    }
                    ShowElement::Adjust(_) => false,
                })
                .collect();
            glyphs_removed += mask.iter().filter(|m| **m).count();
            removed_per_show.push(mask);
        }

        for (index, ok) in applied.iter().enumerate() {
            if !ok {
                warn!(
                    "Page {}: redaction box {} covers no text and was skipped",
                    page_number, index
                );
            }
        }

        if glyphs_removed == 0 {
            return Ok(RedactionOutcome {
                applied,
                glyphs_removed,
            });
        }

        let mut operations = Vec::with_capacity(page.operations.len() + 4);
        operations.push(Operation::new("q", vec![]));
        let mut shows = page.shows.iter().zip(&removed_per_show).peekable();
        for (index, operation) in page.operations.iter().enumerate() {
            match shows.peek() {
                Some((show, mask)) if show.op_index == index => {
                    if mask.iter().any(|m| *m) {
                        operations.extend(rewrite_show(show, mask, operation));
                    } else {
                        operations.push(operation.clone());
                    }
                    shows.next();
                }
                _ => operations.push(operation.clone()),
            }
        }
        operations.push(Operation::new("Q", vec![]));

        if let Some(fill) = self.options.fill {
            let covered: Vec<BoundingBox> = boxes
                .iter()
                .zip(&applied)
                .filter(|(_, ok)| **ok)
                .map(|(bbox, _)| *bbox)
                .collect();
            operations.extend(fill_operations(&page.geometry, &covered, kept, fill));
        }

        let content = Content { operations }
            .encode()
            .map_err(|e| page_error(format!("failed to encode content: {}", e)))?;
        doc.set_page_content(page.page_id, content)
            .map_err(|e| page_error(e.to_string()))?;

        debug!(
            "Page {}: removed {} glyph(s) under {} box(es)",
            page_number,
            glyphs_removed,
            applied.iter().filter(|a| **a).count()
        );
        Ok(RedactionOutcome {
            applied,
            glyphs_removed,
        })
    }

    fn covering_boxes(&self, glyph: &PlacedGlyph, boxes: &[BoundingBox]) -> Vec<usize> {
        let area = glyph.bbox.area();
        boxes
            .iter()
            .enumerate()
            .filter(|(_, bbox)| {
                if area <= f32::EPSILON {
                    let (cx, cy) = glyph.bbox.center();
                    return bbox.contains_point(cx, cy);
                }
                glyph
                    .bbox
                    .intersection(bbox)
                    .is_some_and(|overlap| overlap.area() / area >= self.options.min_overlap)
            })
            .map(|(index, _)| index)
            .collect()
    }
}

/// Replace a show operation by a `TJ` keeping the surviving glyphs in place.
/// `'` and `"` keep their line move and spacing side effects.
fn rewrite_show(show: &TextShow, removed: &[bool], original: &Operation) -> Vec<Operation> {
    let mut array: Vec<Object> = Vec::new();
    let mut pending = Vec::new();
    let mut spacing = 0.0f32;

    let flush_spacing = |array: &mut Vec<Object>, spacing: &mut f32| {
        if *spacing != 0.0 {
            array.push(Object::Real(*spacing));
            *spacing = 0.0;
        }
    };

    for (element, gone) in show.elements.iter().zip(removed) {
        match element {
            ShowElement::Glyph(glyph) if *gone => {
                if !pending.is_empty() {
                    array.push(Object::String(std::mem::take(&mut pending), StringFormat::Hexadecimal));
                }
                spacing -= glyph.tj_units;
            }
            ShowElement::Glyph(glyph) => {
                flush_spacing(&mut array, &mut spacing);
                pending.extend_from_slice(&glyph.code);
            }
            ShowElement::Adjust(n) => {
                if !pending.is_empty() {
                    array.push(Object::String(std::mem::take(&mut pending), StringFormat::Hexadecimal));
                }
                spacing += n;
            }
        }
    }
    if !pending.is_empty() {
        array.push(Object::String(pending, StringFormat::Hexadecimal));
    }
    flush_spacing(&mut array, &mut spacing);

    let mut operations = Vec::with_capacity(4);
    match show.operator.as_str() {
        "'" => operations.push(Operation::new("T*", vec![])),
        "\"" => {
            let mut operands = original.operands.iter();
            if let (Some(aw), Some(ac)) = (operands.next(), operands.next()) {
                operations.push(Operation::new("Tw", vec![aw.clone()]));
                operations.push(Operation::new("Tc", vec![ac.clone()]));
            }
            operations.push(Operation::new("T*", vec![]));
        }
        _ => {}
    }
    operations.push(Operation::new("TJ", vec![Object::Array(array)]));
    operations
}

/// Paint each box; where a kept block overlaps it, the overlap is cut out
/// with the even-odd rule so the kept text stays visible
fn fill_operations(
    geometry: &PageGeometry,
    boxes: &[BoundingBox],
    kept: &[BoundingBox],
    fill: [f32; 3],
) -> Vec<Operation> {
    if boxes.is_empty() {
        return Vec::new();
    }
    let rect = |bbox: &BoundingBox| {
        let (x, y, w, h) = geometry.to_user_rect(bbox);
        Operation::new(
            "re",
            vec![Object::Real(x), Object::Real(y), Object::Real(w), Object::Real(h)],
        )
    };
    let mut operations = vec![
        Operation::new("q", vec![]),
        Operation::new(
            "rg",
            fill.iter().map(|c| Object::Real(c.clamp(0.0, 1.0))).collect(),
        ),
    ];
    for bbox in boxes {
        operations.push(rect(bbox));
        let holes: Vec<BoundingBox> = kept.iter().filter_map(|k| bbox.intersection(k)).collect();
        if holes.is_empty() {
            operations.push(Operation::new("f", vec![]));
        } else {
            operations.extend(holes.iter().map(rect));
            operations.push(Operation::new("f*", vec![]));
        }
    }
    operations.push(Operation::new("Q", vec![]));
    operations
}
