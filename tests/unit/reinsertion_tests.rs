/*!
 * Tests for drawing translated text back into boxes
 */

use lopdf::Object;
use yaptwai::errors::PdfError;
use yaptwai::pdf::embed::{EmbeddedFont, PdfFont, StandardFont};
use yaptwai::pdf::layout::LayoutOptions;
use yaptwai::pdf::shaping::{join_arabic, visual_order};
use yaptwai::pdf::{
    BlockExtractor, BoundingBox, Direction, LayoutStrategy, PdfDocument, Redactor, ReinsertOptions, Reinserter,
    RenderDirective,
};
use crate::common;

fn helvetica() -> Reinserter {
    Reinserter::new(PdfFont::Standard(StandardFont::default()), ReinsertOptions::default())
}

fn directive(bbox: BoundingBox, text: &str, direction: Direction, strategy: LayoutStrategy) -> RenderDirective {
    RenderDirective {
        block: 0,
        bbox,
        text: text.to_string(),
        direction,
        strategy,
    }
}

/// Test that text replaces a redacted block and reads back
#[test]
fn test_insert_page_afterRedaction_shouldReplaceText() {
    let pdf = common::pdf_with_pages(&["Hello"]);
    let mut doc = PdfDocument::from_bytes(&pdf).unwrap();
    let bbox = BlockExtractor::default().extract_page(&doc, 1).unwrap()[0].bbox;
    Redactor::default().redact_page(&mut doc, 1, &[bbox]).unwrap();

    let mut reinserter = helvetica();
    let results = reinserter.insert_page(
        &mut doc,
        1,
        &[directive(bbox, "Hola", Direction::Ltr, LayoutStrategy::ShrinkToFit)],
    );
    reinserter.finish(&mut doc).unwrap();

    assert_eq!(results.len(), 1);
    let rendered = results[0].as_ref().unwrap();
    let options = LayoutOptions::default();
    assert!(rendered.size <= (bbox.height() - options.box_margin).floor());
    assert!(rendered.size >= options.min_font_size);
    assert_eq!(rendered.lines, vec!["Hola"]);
    assert!(!rendered.overflow);

    let bytes = doc.to_bytes().unwrap();
    assert_eq!(common::block_texts(&bytes, 1), vec!["Hola"]);
}

/// Test that long text in a tiny box is written at the minimum size
#[test]
fn test_insert_page_withTooMuchText_shouldOverflowAtMinimumSize() {
    let pdf = common::pdf_with_pages(&[""]);
    let mut doc = PdfDocument::from_bytes(&pdf).unwrap();
    let bbox = BoundingBox::new(72.0, 72.0, 112.0, 80.0);
    let text = "This sentence is far too long to ever fit inside such a small box";

    let results = helvetica().insert_page(
        &mut doc,
        1,
        &[directive(bbox, text, Direction::Ltr, LayoutStrategy::ShrinkToFit)],
    );

    let rendered = results[0].as_ref().unwrap();
    assert!(rendered.overflow);
    assert_eq!(rendered.size, LayoutOptions::default().min_font_size);
}

/// Test that plain right-to-left text is joined, reordered and right aligned
#[test]
fn test_insert_page_withRtlText_shouldAlignRight() {
    let pdf = common::pdf_with_pages(&[""]);
    let mut doc = PdfDocument::from_bytes(&pdf).unwrap();
    let bbox = BoundingBox::new(100.0, 100.0, 400.0, 130.0);
    let text = "سلام";

    let mut reinserter = dejavu();
    let results = reinserter.insert_page(
        &mut doc,
        1,
        &[directive(bbox, text, Direction::Rtl, LayoutStrategy::ShrinkToFit)],
    );
    reinserter.finish(&mut doc).unwrap();

    let rendered = results[0].as_ref().unwrap();
    assert_eq!(rendered.lines, vec![visual_order(&join_arabic(text), Direction::Rtl)]);
    assert_ne!(rendered.lines[0], text);

    let bytes = doc.to_bytes().unwrap();
    let reread = PdfDocument::from_bytes(&bytes).unwrap();
    let blocks = BlockExtractor::default().extract_page(&reread, 1).unwrap();
    assert_eq!(blocks.len(), 1);
    assert!((blocks[0].bbox.x1 - bbox.x1).abs() < 0.5);
}

/// Test that styled layout refuses to draw without an embedded font
#[test]
fn test_insert_page_withStyledLayoutAndStandardFont_shouldFailBlock() {
    let pdf = common::pdf_with_pages(&[""]);
    let mut doc = PdfDocument::from_bytes(&pdf).unwrap();
    let bbox = BoundingBox::new(72.0, 72.0, 300.0, 100.0);

    let results = helvetica().insert_page(
        &mut doc,
        1,
        &[directive(bbox, "Hola", Direction::Ltr, LayoutStrategy::StyledBox)],
    );

    assert!(matches!(results[0], Err(PdfError::Insertion { page: 1, block: 0, .. })));
}

/// Test that blank translations draw nothing
#[test]
fn test_insert_page_withBlankText_shouldDrawNothing() {
    let pdf = common::pdf_with_pages(&[""]);
    let mut doc = PdfDocument::from_bytes(&pdf).unwrap();
    let bbox = BoundingBox::new(72.0, 72.0, 300.0, 100.0);

    let results = helvetica().insert_page(
        &mut doc,
        1,
        &[directive(bbox, "   ", Direction::Ltr, LayoutStrategy::ShrinkToFit)],
    );

    let rendered = results[0].as_ref().unwrap();
    assert!(rendered.lines.is_empty());
    assert!(common::block_texts(&doc.to_bytes().unwrap(), 1).is_empty());
}

/// Test that an unknown page fails every directive
#[test]
fn test_insert_page_withMissingPage_shouldFailEveryDirective() {
    let pdf = common::pdf_with_pages(&[""]);
    let mut doc = PdfDocument::from_bytes(&pdf).unwrap();
    let bbox = BoundingBox::new(72.0, 72.0, 300.0, 100.0);
    let directives = [
        directive(bbox, "One", Direction::Ltr, LayoutStrategy::ShrinkToFit),
        directive(bbox, "Two", Direction::Ltr, LayoutStrategy::ShrinkToFit),
    ];

    let results = helvetica().insert_page(&mut doc, 2, &directives);

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.is_err()));
}

fn dejavu() -> Reinserter {
    let font = EmbeddedFont::from_file(&common::test_font_path()).unwrap();
    Reinserter::new(PdfFont::Embedded(font), ReinsertOptions::default())
}

fn sorted_letters(text: &str) -> Vec<char> {
    let mut letters: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    letters.sort_unstable();
    letters
}

/// Test that shaped right-to-left text is embedded, right aligned and
/// reads back through the ToUnicode map
#[test]
fn test_insert_page_withStyledRtlText_shouldAlignRightAndReadBack() {
    let pdf = common::pdf_with_pages(&[""]);
    let mut doc = PdfDocument::from_bytes(&pdf).unwrap();
    let bbox = BoundingBox::new(100.0, 100.0, 400.0, 130.0);
    let text = "سلام دنیا";

    let mut reinserter = dejavu();
    let results = reinserter.insert_page(
        &mut doc,
        1,
        &[directive(bbox, text, Direction::Rtl, LayoutStrategy::StyledBox)],
    );
    reinserter.finish(&mut doc).unwrap();

    let rendered = results[0].as_ref().unwrap();
    assert_eq!(rendered.strategy, LayoutStrategy::StyledBox);
    assert!(!rendered.overflow);
    assert_eq!(rendered.lines.len(), 1);
    let PdfFont::Embedded(font) = reinserter.font() else {
        panic!("expected the embedded font");
    };
    assert_eq!(font.missing_glyphs(), 0);
    assert!(font.used_glyphs() > 0);

    let bytes = doc.to_bytes().unwrap();
    let reread = PdfDocument::from_bytes(&bytes).unwrap();
    let blocks = BlockExtractor::default().extract_page(&reread, 1).unwrap();
    assert_eq!(blocks.len(), 1);
    assert!((blocks[0].bbox.x1 - bbox.x1).abs() < 1.0);
    assert!(blocks[0].bbox.x0 > bbox.x0);
    assert_eq!(sorted_letters(&blocks[0].text), sorted_letters(text));
}

/// Test that styled left-to-right text starts at the left edge and keeps
/// its characters
#[test]
fn test_insert_page_withStyledCyrillicText_shouldRoundTrip() {
    let pdf = common::pdf_with_pages(&[""]);
    let mut doc = PdfDocument::from_bytes(&pdf).unwrap();
    let bbox = BoundingBox::new(72.0, 200.0, 400.0, 224.0);

    let mut reinserter = dejavu();
    let results = reinserter.insert_page(
        &mut doc,
        1,
        &[directive(bbox, "Привет мир", Direction::Ltr, LayoutStrategy::StyledBox)],
    );
    reinserter.finish(&mut doc).unwrap();
    assert!(results[0].is_ok());

    // one Type0 font carrying its widths and ToUnicode map
    let type0: Vec<_> = doc
        .inner()
        .objects
        .values()
        .filter_map(|o| o.as_dict().ok())
        .filter(|d| matches!(d.get(b"Subtype"), Ok(Object::Name(n)) if n.as_slice() == b"Type0"))
        .collect();
    assert_eq!(type0.len(), 1);
    assert!(type0[0].has(b"ToUnicode"));

    let bytes = doc.to_bytes().unwrap();
    let reread = PdfDocument::from_bytes(&bytes).unwrap();
    let blocks = BlockExtractor::default().extract_page(&reread, 1).unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].text, "Привет мир");
    assert!((blocks[0].bbox.x0 - bbox.x0).abs() < 1.0);
}

/// Test that the embedded font reports characters it has no glyph for
#[test]
fn test_embedded_font_uncovered_chars_shouldListMissingGlyphs() {
    let font = PdfFont::Embedded(EmbeddedFont::from_file(&common::test_font_path()).unwrap());
    assert!(font.uncovered_chars("Hola سلام Привет\u{200C}").is_empty());
    assert_eq!(font.uncovered_chars("日本"), vec!['日', '本']);
}
