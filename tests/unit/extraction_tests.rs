/*!
 * Tests for text block extraction
 */

use yaptwai::pdf::{BlockExtractor, PdfDocument};
use crate::common;

fn extract(streams: &[String], page: u32) -> Vec<yaptwai::pdf::Block> {
    let pdf = common::pdf_with_streams(streams);
    let doc = PdfDocument::from_bytes(&pdf).unwrap();
    BlockExtractor::default().extract_page(&doc, page).unwrap()
}

/// Test that one shown string becomes one block with a top-left bbox
#[test]
fn test_extract_page_withSingleLine_shouldReturnOneBlock() {
    let blocks = extract(&[common::text_line(72.0, 720.0, 12.0, "Hello world")], 1);

    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].text, "Hello world");
    assert_eq!(blocks[0].font_size, 12.0);
    let bbox = blocks[0].bbox;
    assert!((bbox.x0 - 72.0).abs() < 0.01);
    // baseline at 792 - 720 = 72 from the top
    assert!(bbox.y0 < 72.0 && bbox.y1 > 72.0);
    assert!(bbox.width() > 50.0 && bbox.height() < 14.0);
}

/// Test that close lines are merged and distant lines are split
#[test]
fn test_extract_page_withParagraphAndHeading_shouldGroupLines() {
    let content = [
        common::text_line(72.0, 720.0, 12.0, "First line"),
        common::text_line(72.0, 706.0, 12.0, "Second line"),
        common::text_line(72.0, 500.0, 12.0, "Far away"),
    ]
    .concat();
    let blocks = extract(&[content], 1);

    let texts: Vec<&str> = blocks.iter().map(|b| b.text.as_str()).collect();
    assert_eq!(texts, vec!["First line\nSecond line", "Far away"]);
}

/// Test that blocks keep content stream order rather than reading order
#[test]
fn test_extract_page_withLowerBlockFirst_shouldKeepNativeOrder() {
    let content = [
        common::text_line(72.0, 300.0, 12.0, "Bottom"),
        common::text_line(72.0, 700.0, 12.0, "Top"),
    ]
    .concat();
    let texts: Vec<String> = extract(&[content], 1).into_iter().map(|b| b.text).collect();
    assert_eq!(texts, vec!["Bottom", "Top"]);
}

/// Test that kerned TJ arrays still read as one word
#[test]
fn test_extract_page_withKernedArray_shouldJoinPieces() {
    let content = "BT /F1 12 Tf 72 720 Td [(Hel) -20 (lo)] TJ ET".to_string();
    let blocks = extract(&[content], 1);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].text, "Hello");
}

/// Test that extracting twice gives identical blocks
#[test]
fn test_extract_page_calledTwice_shouldBeIdempotent() {
    let pdf = common::pdf_with_pages(&["Repeatable text"]);
    let doc = PdfDocument::from_bytes(&pdf).unwrap();
    let extractor = BlockExtractor::default();
    assert_eq!(extractor.extract_page(&doc, 1).unwrap(), extractor.extract_page(&doc, 1).unwrap());
}

/// Test that a page without text has no blocks
#[test]
fn test_extract_page_withBlankPage_shouldReturnNoBlocks() {
    let pdf = common::pdf_with_pages(&["", "Text"]);
    assert!(common::block_texts(&pdf, 1).is_empty());
    assert_eq!(common::block_texts(&pdf, 2), vec!["Text"]);
}

/// Test that a missing page is an error
#[test]
fn test_extract_page_withMissingPage_shouldFail() {
    let pdf = common::pdf_with_pages(&["Only page"]);
    let doc = PdfDocument::from_bytes(&pdf).unwrap();
    assert!(BlockExtractor::default().extract_page(&doc, 2).is_err());
}
