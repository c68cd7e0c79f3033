/*!
 * Tests for page range validation and selection
 */

use yaptwai::errors::PdfError;
use yaptwai::pdf::{PageRange, PdfDocument};
use crate::common;

/// Test the accepted bounds
#[test]
fn test_page_range_withValidBounds_shouldResolve() {
    let range = PageRange::resolve(None, None, 5).unwrap();
    assert_eq!((range.start(), range.end(), range.len()), (1, 5, 5));

    let range = PageRange::resolve(Some(2), Some(4), 5).unwrap();
    assert_eq!(range.pages().collect::<Vec<_>>(), vec![2, 3, 4]);
    assert_eq!(range.original_page(1), 2);
    assert_eq!(range.original_page(3), 4);
    assert!(range.contains(3) && !range.contains(5));
}

/// Test every rejected combination
#[test]
fn test_page_range_withInvalidBounds_shouldFail() {
    assert!(matches!(
        PageRange::new(3, 2, 5),
        Err(PdfError::InvalidRange { start: 3, end: 2, total: 5 })
    ));
    assert!(PageRange::new(0, 2, 5).is_err());
    assert!(PageRange::new(1, 6, 5).is_err());
    assert!(PageRange::resolve(Some(6), None, 5).is_err());
}

/// Test that selection keeps exactly the requested pages in order
#[test]
fn test_select_pages_withMiddleRange_shouldKeepOnlyThosePages() {
    let pdf = common::pdf_with_pages(&["One", "Two", "Three", "Four"]);
    let mut doc = PdfDocument::from_bytes(&pdf).unwrap();
    let range = PageRange::new(2, 3, doc.page_count()).unwrap();

    doc.select_pages(&range).unwrap();
    let saved = doc.to_bytes().unwrap();

    assert_eq!(common::page_count(&saved), 2);
    assert_eq!(common::block_texts(&saved, 1), vec!["Two"]);
    assert_eq!(common::block_texts(&saved, 2), vec!["Three"]);
}

/// Test that selecting the full range changes nothing
#[test]
fn test_select_pages_withFullRange_shouldKeepAllPages() {
    let pdf = common::pdf_with_pages(&["One", "Two"]);
    let mut doc = PdfDocument::from_bytes(&pdf).unwrap();
    let range = PageRange::resolve(None, None, 2).unwrap();
    doc.select_pages(&range).unwrap();
    assert_eq!(doc.page_count(), 2);
}
