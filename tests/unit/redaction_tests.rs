/*!
 * Tests for text removal under boxes
 */

use lopdf::content::Content;
use yaptwai::pdf::{BlockExtractor, BoundingBox, PdfDocument, RedactionOptions, Redactor};
use crate::common;

fn operators(doc: &PdfDocument, page: u32) -> Vec<String> {
    let page_id = doc.page_id(page).unwrap();
    let content = Content::decode(&doc.page_content(page_id).unwrap()).unwrap();
    content.operations.into_iter().map(|op| op.operator).collect()
}

/// Test that redacting a block removes its text and paints the box
#[test]
fn test_redact_page_withBlockBox_shouldRemoveText() {
    let pdf = common::pdf_with_pages(&["Hello"]);
    let mut doc = PdfDocument::from_bytes(&pdf).unwrap();
    let blocks = BlockExtractor::default().extract_page(&doc, 1).unwrap();
    assert_eq!(blocks.len(), 1);

    let outcome = Redactor::default()
        .redact_page(&mut doc, 1, &[blocks[0].bbox])
        .unwrap();

    assert_eq!(outcome.applied, vec![true]);
    assert_eq!(outcome.glyphs_removed, 5);
    assert_eq!(outcome.failed_boxes().count(), 0);
    assert!(BlockExtractor::default().extract_page(&doc, 1).unwrap().is_empty());

    let ops = operators(&doc, 1);
    assert!(ops.iter().any(|op| op == "re"));
    assert!(ops.iter().any(|op| op == "f"));
}

/// Test that only the covered block disappears
#[test]
fn test_redact_page_withOneOfTwoBlocks_shouldKeepTheOther() {
    let content = [
        common::text_line(72.0, 720.0, 12.0, "Remove me"),
        common::text_line(72.0, 400.0, 12.0, "Keep me"),
    ]
    .concat();
    let pdf = common::pdf_with_streams(&[content]);
    let mut doc = PdfDocument::from_bytes(&pdf).unwrap();
    let blocks = BlockExtractor::default().extract_page(&doc, 1).unwrap();
    assert_eq!(blocks.len(), 2);

    Redactor::default().redact_page(&mut doc, 1, &[blocks[0].bbox]).unwrap();

    let remaining: Vec<String> = BlockExtractor::default()
        .extract_page(&doc, 1)
        .unwrap()
        .into_iter()
        .map(|b| b.text)
        .collect();
    assert_eq!(remaining, vec!["Keep me"]);
}

/// Test that a box over blank space is reported and leaves the page alone
#[test]
fn test_redact_page_withEmptyArea_shouldReportUnappliedBox() {
    let pdf = common::pdf_with_pages(&["Hello"]);
    let mut doc = PdfDocument::from_bytes(&pdf).unwrap();
    let page_id = doc.page_id(1).unwrap();
    let before = doc.page_content(page_id).unwrap();

    let outcome = Redactor::default()
        .redact_page(&mut doc, 1, &[BoundingBox::new(300.0, 500.0, 400.0, 520.0)])
        .unwrap();

    assert_eq!(outcome.applied, vec![false]);
    assert_eq!(outcome.glyphs_removed, 0);
    assert_eq!(outcome.failed_boxes().collect::<Vec<_>>(), vec![0]);
    assert_eq!(doc.page_content(page_id).unwrap(), before);
}

/// Test that no fill rectangle is drawn when fill is off
#[test]
fn test_redact_page_withoutFill_shouldNotPaint() {
    let pdf = common::pdf_with_pages(&["Hello"]);
    let mut doc = PdfDocument::from_bytes(&pdf).unwrap();
    let bbox = BlockExtractor::default().extract_page(&doc, 1).unwrap()[0].bbox;
    let redactor = Redactor::new(RedactionOptions {
        fill: None,
        ..RedactionOptions::default()
    });

    let outcome = redactor.redact_page(&mut doc, 1, &[bbox]).unwrap();

    assert_eq!(outcome.applied, vec![true]);
    assert!(!operators(&doc, 1).iter().any(|op| op == "f"));
}

/// Test that an unknown page is an error rather than a silent no-op
#[test]
fn test_redact_page_withMissingPage_shouldFail() {
    let pdf = common::pdf_with_pages(&["Hello"]);
    let mut doc = PdfDocument::from_bytes(&pdf).unwrap();
    let result = Redactor::default().redact_page(&mut doc, 3, &[BoundingBox::new(0.0, 0.0, 10.0, 10.0)]);
    assert!(result.is_err());
}

/// Page with a two-line block, a distant block and a small block drawn
/// last inside the first block's box
fn nested_blocks_page() -> Vec<u8> {
    let content = [
        common::text_line(72.0, 720.0, 12.0, "Alpha line one is long"),
        common::text_line(72.0, 706.0, 12.0, "Beta line two"),
        common::text_line(72.0, 500.0, 12.0, "Far away"),
        common::text_line(150.0, 713.0, 6.0, "Inner"),
    ]
    .concat();
    common::pdf_with_streams(&[content])
}

/// Test that redacting a block leaves a block drawn inside its box
#[test]
fn test_redact_blocks_withBlockInsideTarget_shouldKeepInnerBlock() {
    let pdf = nested_blocks_page();
    let mut doc = PdfDocument::from_bytes(&pdf).unwrap();
    let blocks = BlockExtractor::default().extract_page(&doc, 1).unwrap();
    let texts: Vec<&str> = blocks.iter().map(|b| b.text.as_str()).collect();
    assert_eq!(texts, vec!["Alpha line one is long\nBeta line two", "Far away", "Inner"]);
    assert!(blocks[0].bbox.intersects(&blocks[2].bbox));

    let outcome = Redactor::default().redact_blocks(&mut doc, 1, &blocks, &[0, 1]).unwrap();

    assert_eq!(outcome.applied, vec![true, true]);
    assert_eq!(common::block_texts(&doc.to_bytes().unwrap(), 1), vec!["Inner"]);
    // the fill over the first block leaves a hole where "Inner" is
    assert!(operators(&doc, 1).iter().any(|op| op == "f*"));
}

/// Test that a plain rectangle still takes everything under it
#[test]
fn test_redact_page_withBlockInsideBox_shouldRemoveBoth() {
    let pdf = nested_blocks_page();
    let mut doc = PdfDocument::from_bytes(&pdf).unwrap();
    let blocks = BlockExtractor::default().extract_page(&doc, 1).unwrap();

    Redactor::default().redact_page(&mut doc, 1, &[blocks[0].bbox]).unwrap();

    assert_eq!(common::block_texts(&doc.to_bytes().unwrap(), 1), vec!["Far away"]);
}

/// Test that an unknown block index is rejected
#[test]
fn test_redact_blocks_withUnknownIndex_shouldFail() {
    let pdf = common::pdf_with_pages(&["Hello"]);
    let mut doc = PdfDocument::from_bytes(&pdf).unwrap();
    let blocks = BlockExtractor::default().extract_page(&doc, 1).unwrap();
    assert!(Redactor::default().redact_blocks(&mut doc, 1, &blocks, &[4]).is_err());
}

/// Test that paths and images under a redacted block survive
#[test]
fn test_redact_blocks_withPathAndImageUnderText_shouldKeepThem() {
    let content = format!(
        "0.5 g 60 700 200 40 re f\n{}q 50 0 0 50 100 600 cm /Im1 Do Q\n",
        common::text_line(72.0, 720.0, 12.0, "Hello")
    );
    let pdf = common::pdf_with_streams(&[content]);
    let mut doc = PdfDocument::from_bytes(&pdf).unwrap();
    let blocks = BlockExtractor::default().extract_page(&doc, 1).unwrap();

    let outcome = Redactor::default().redact_blocks(&mut doc, 1, &blocks, &[0]).unwrap();
    assert_eq!(outcome.applied, vec![true]);

    let page_id = doc.page_id(1).unwrap();
    let content = Content::decode(&doc.page_content(page_id).unwrap()).unwrap();
    let background = content
        .operations
        .iter()
        .find(|op| op.operator == "re")
        .expect("background rectangle kept");
    let operands: Vec<f32> = background.operands.iter().map(|o| o.as_float().unwrap()).collect();
    assert_eq!(operands, vec![60.0, 700.0, 200.0, 40.0]);
    assert!(content.operations.iter().any(|op| op.operator == "Do"));
    assert!(content.operations.iter().any(|op| op.operator == "cm"));
    assert!(common::block_texts(&doc.to_bytes().unwrap(), 1).is_empty());
}
