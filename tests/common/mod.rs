/*!
 * Common test utilities for the yaptwai test suite
 */

use anyhow::Result;
use lopdf::{dictionary, Object, Stream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use yaptwai::pdf::{BlockExtractor, PdfDocument};
use yaptwai::providers::mock::MockProvider;
use yaptwai::translation::{RetryPolicy, TranslationService};

/// Route library logs through env_logger; safe to call from every test
pub fn init_test_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Writes bytes to `dir/filename` and returns the path
pub fn write_test_file(dir: &Path, filename: &str, content: &[u8]) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    std::fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Service over a mock provider with `retry_count` retries and no waiting
pub fn mock_service(provider: MockProvider, retry_count: u32) -> TranslationService {
    TranslationService::with_provider(Arc::new(provider))
        .with_retry_policy(RetryPolicy::new(retry_count, 0))
        .with_rate_limit_delay(Duration::ZERO)
}

/// DejaVu Sans, covering Latin, Cyrillic and Arabic
pub fn test_font_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/DejaVuSans.ttf")
}

/// Show one line of Helvetica text with its baseline at (x, y)
pub fn text_line(x: f32, y: f32, size: f32, text: &str) -> String {
    format!("BT /F1 {} Tf {} {} Td ({}) Tj ET\n", size, x, y, text)
}

/// Build a document whose pages carry the given content streams, all
/// sharing one Helvetica font under `/F1`
pub fn pdf_with_streams(streams: &[String]) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let pages_id = doc.new_object_id();

    let mut kids = Vec::with_capacity(streams.len());
    for content in streams {
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! {
                "Font" => dictionary! {
                    "F1" => Object::Reference(font_id),
                },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(streams.len() as i64),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Multi-page document with a single 12pt line of text per page; an empty
/// string makes a blank page
pub fn pdf_with_pages(texts: &[&str]) -> Vec<u8> {
    let streams: Vec<String> = texts
        .iter()
        .map(|text| {
            if text.is_empty() {
                String::new()
            } else {
                text_line(72.0, 720.0, 12.0, text)
            }
        })
        .collect();
    pdf_with_streams(&streams)
}

/// Block texts of one page of a document
pub fn block_texts(pdf: &[u8], page: u32) -> Vec<String> {
    let doc = PdfDocument::from_bytes(pdf).unwrap();
    BlockExtractor::default()
        .extract_page(&doc, page)
        .unwrap()
        .into_iter()
        .map(|b| b.text)
        .collect()
}

pub fn page_count(pdf: &[u8]) -> u32 {
    PdfDocument::from_bytes(pdf).unwrap().page_count()
}
