/*!
 * End-to-end tests of the translation pipeline on in-memory documents
 */

use std::sync::{Arc, Mutex};

use yaptwai::app_config::LayoutPolicy;
use yaptwai::errors::{AppError, FailureKind, PdfError};
use yaptwai::pdf::{BlockExtractor, PdfDocument};
use yaptwai::providers::mock::MockProvider;
use yaptwai::{PdfTranslationPipeline, PipelineConfig};
use crate::common;

fn progress_recorder() -> (Arc<Mutex<Vec<u8>>>, impl Fn(u8) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let seen = Arc::clone(&seen);
        move |percent| seen.lock().unwrap().push(percent)
    };
    (seen, sink)
}

/// Test that a page range keeps only the selected pages, translated
#[tokio::test]
async fn test_run_withFirstPageOnly_shouldTranslateOnePage() {
    common::init_test_logger();
    let pdf = common::pdf_with_pages(&["Hello", "World"]);
    let provider = MockProvider::dictionary([("Hello", "Hola"), ("World", "Mundo")]);
    let pipeline = PdfTranslationPipeline::new(
        common::mock_service(provider.clone(), 0),
        PipelineConfig::new("en", "es").with_page_range(Some(1), Some(1)),
    );

    let output = pipeline.run(&pdf).await.unwrap();

    assert_eq!(common::page_count(&output.pdf), 1);
    assert_eq!(common::block_texts(&output.pdf, 1), vec!["Hola"]);
    assert_eq!(output.report.pages, 1);
    assert_eq!(output.report.blocks, 1);
    assert_eq!(output.report.translated, 1);
    assert!(output.report.is_clean());
    assert_eq!(provider.request_count(), 1);
}

/// Test that a reversed range is rejected before any request
#[tokio::test]
async fn test_run_withReversedRange_shouldFailWithInvalidRange() {
    let pdf = common::pdf_with_pages(&["A", "B", "C", "D", "E"]);
    let provider = MockProvider::working();
    let pipeline = PdfTranslationPipeline::new(
        common::mock_service(provider.clone(), 0),
        PipelineConfig::new("en", "es").with_page_range(Some(3), Some(2)),
    );

    let result = pipeline.run(&pdf).await;

    assert!(matches!(
        result,
        Err(AppError::Pdf(PdfError::InvalidRange { start: 3, end: 2, total: 5 }))
    ));
    assert_eq!(provider.request_count(), 0);
}

/// Test that bytes that are not a PDF fail to load
#[tokio::test]
async fn test_run_withGarbageInput_shouldFailToLoad() {
    let pipeline = PdfTranslationPipeline::new(
        common::mock_service(MockProvider::working(), 0),
        PipelineConfig::new("en", "es"),
    );
    let result = pipeline.run(b"definitely not a pdf").await;
    assert!(matches!(result, Err(AppError::Pdf(PdfError::Load(_)))));
}

/// Test that a block whose translation keeps failing stays in the original
/// language and is reported with its input page number
#[tokio::test]
async fn test_run_withFailingProvider_shouldKeepOriginalAndReport() {
    common::init_test_logger();
    let pdf = common::pdf_with_pages(&["Intro", "Hello"]);
    let provider = MockProvider::failing();
    let pipeline = PdfTranslationPipeline::new(
        common::mock_service(provider.clone(), 3),
        PipelineConfig::new("en", "es").with_page_range(Some(2), Some(2)),
    );

    let output = pipeline.run(&pdf).await.unwrap();

    assert_eq!(output.report.failure_count(), 1);
    assert_eq!(output.report.count(FailureKind::Translation), 1);
    assert_eq!(output.report.failures[0].page, 2);
    assert_eq!(output.report.failures[0].block, 0);
    assert_eq!(output.report.translated, 0);
    assert_eq!(provider.request_count(), 4);
    assert_eq!(common::block_texts(&output.pdf, 1), vec!["Hello"]);
    assert!(output.report.issues().contains("translation"));
}

/// Test that progress only grows and ends at 100
#[tokio::test]
async fn test_run_withProgressSink_shouldReportMonotonicProgress() {
    let pdf = common::pdf_with_pages(&["One", "Two", "Three"]);
    let (seen, sink) = progress_recorder();
    let pipeline = PdfTranslationPipeline::new(
        common::mock_service(MockProvider::working(), 0),
        PipelineConfig::new("en", "es"),
    )
    .with_progress(sink);

    pipeline.run(&pdf).await.unwrap();

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.first(), Some(&0));
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
    assert!(seen.len() > 2);
}

/// Test that a document without text still completes
#[tokio::test]
async fn test_run_withBlankPages_shouldFinishWithoutRequests() {
    let pdf = common::pdf_with_pages(&["", ""]);
    let provider = MockProvider::working();
    let (seen, sink) = progress_recorder();
    let pipeline = PdfTranslationPipeline::new(
        common::mock_service(provider.clone(), 0),
        PipelineConfig::new("en", "es"),
    )
    .with_progress(sink);

    let output = pipeline.run(&pdf).await.unwrap();

    assert_eq!(common::page_count(&output.pdf), 2);
    assert_eq!(output.report.blocks, 0);
    assert!(output.report.is_clean());
    assert_eq!(provider.request_count(), 0);
    assert_eq!(seen.lock().unwrap().last(), Some(&100));
}

/// Test that concurrent requests still write blocks in page order
#[tokio::test]
async fn test_run_withConcurrentRequests_shouldKeepBlockOrder() {
    let content = [
        common::text_line(72.0, 720.0, 12.0, "One"),
        common::text_line(72.0, 600.0, 12.0, "Two"),
        common::text_line(72.0, 480.0, 12.0, "Three"),
    ]
    .concat();
    let pdf = common::pdf_with_streams(&[content]);
    let provider = MockProvider::dictionary([("One", "Uno"), ("Two", "Dos"), ("Three", "Tres")]);
    let pipeline = PdfTranslationPipeline::new(
        common::mock_service(provider, 0),
        PipelineConfig::new("en", "es").with_concurrent_requests(3),
    );

    let output = pipeline.run(&pdf).await.unwrap();

    assert_eq!(common::block_texts(&output.pdf, 1), vec!["Uno", "Dos", "Tres"]);
    assert_eq!(output.report.translated, 3);
}

/// Test that repeated text is answered from the cache
#[tokio::test]
async fn test_run_withRepeatedText_shouldCountCacheHits() {
    let pdf = common::pdf_with_pages(&["Same words", "Same words"]);
    let provider = MockProvider::working();
    let pipeline = PdfTranslationPipeline::new(
        common::mock_service(provider.clone(), 0),
        PipelineConfig::new("en", "es"),
    );

    let output = pipeline.run(&pdf).await.unwrap();

    assert_eq!(output.report.translated, 2);
    assert_eq!(output.report.cache_hits, 1);
    assert_eq!(provider.request_count(), 1);
}

/// Test that an RTL target without a font cannot use the styled layout
#[tokio::test]
async fn test_run_withRtlStyledAndNoFont_shouldFailBeforeTranslating() {
    let pdf = common::pdf_with_pages(&["Hello"]);
    let provider = MockProvider::working();
    let pipeline = PdfTranslationPipeline::new(
        common::mock_service(provider.clone(), 0),
        PipelineConfig::new("en", "fa").with_font_path(None),
    );

    let result = pipeline.run(&pdf).await;

    assert!(matches!(result, Err(AppError::Pdf(PdfError::FontEmbedding { .. }))));
    assert_eq!(provider.request_count(), 0);
}

/// Test that Helvetica is refused for an RTL target even with shrink-to-fit
#[tokio::test]
async fn test_run_withRtlShrinkLayoutAndNoFont_shouldFailBeforeTranslating() {
    let pdf = common::pdf_with_pages(&["Hello"]);
    let provider = MockProvider::dictionary([("Hello", "سلام")]);
    let pipeline = PdfTranslationPipeline::new(
        common::mock_service(provider.clone(), 0),
        PipelineConfig::new("en", "fa")
            .with_font_path(None)
            .with_layout(LayoutPolicy::Shrink),
    );

    let result = pipeline.run(&pdf).await;

    assert!(matches!(result, Err(AppError::Pdf(PdfError::FontEmbedding { .. }))));
    assert_eq!(provider.request_count(), 0);
}

/// Test that a Cyrillic target needs a font even though it reads left to right
#[tokio::test]
async fn test_run_withCyrillicTargetAndNoFont_shouldFailBeforeTranslating() {
    let pdf = common::pdf_with_pages(&["Hello"]);
    let provider = MockProvider::dictionary([("Hello", "Привет")]);
    let pipeline = PdfTranslationPipeline::new(
        common::mock_service(provider.clone(), 0),
        PipelineConfig::new("en", "ru").with_font_path(None),
    );

    let result = pipeline.run(&pdf).await;

    assert!(matches!(result, Err(AppError::Pdf(PdfError::FontEmbedding { .. }))));
    assert_eq!(provider.request_count(), 0);
}

/// Test that a translation the font cannot draw keeps the original text
#[tokio::test]
async fn test_run_withTextOutsideFontCoverage_shouldKeepOriginalAndReport() {
    let pdf = common::pdf_with_pages(&["Hello"]);
    let pipeline = PdfTranslationPipeline::new(
        common::mock_service(MockProvider::dictionary([("Hello", "Привет")]), 0),
        PipelineConfig::new("en", "es").with_font_path(None),
    );

    let output = pipeline.run(&pdf).await.unwrap();

    assert!(!output.report.is_clean());
    assert_eq!(output.report.count(FailureKind::Insertion), 1);
    assert_eq!(output.report.translated, 0);
    assert!(output.report.failures[0].reason.contains("no glyphs"));
    assert_eq!(common::block_texts(&output.pdf, 1), vec!["Hello"]);
}

/// Test that a Cyrillic target with an embedded font reads back exactly
#[tokio::test]
async fn test_run_withCyrillicTargetAndFont_shouldEmbedText() {
    let pdf = common::pdf_with_pages(&["Hello"]);
    let pipeline = PdfTranslationPipeline::new(
        common::mock_service(MockProvider::dictionary([("Hello", "Привет")]), 0),
        PipelineConfig::new("en", "ru").with_font_path(Some(common::test_font_path())),
    );

    let output = pipeline.run(&pdf).await.unwrap();

    assert!(output.report.is_clean());
    assert_eq!(output.report.translated, 1);
    assert_eq!(common::block_texts(&output.pdf, 1), vec!["Привет"]);
}

/// Test that a Persian target with an embedded font lands inside the
/// original box, aligned to its right edge
#[tokio::test]
async fn test_run_withPersianTargetAndFont_shouldAlignRight() {
    let pdf = common::pdf_with_streams(&[common::text_line(72.0, 720.0, 12.0, "Hello world, good morning")]);
    let source = PdfDocument::from_bytes(&pdf).unwrap();
    let bbox = BlockExtractor::default().extract_page(&source, 1).unwrap()[0].bbox;
    let pipeline = PdfTranslationPipeline::new(
        common::mock_service(MockProvider::dictionary([("Hello world, good morning", "سلام دنیا")]), 0),
        PipelineConfig::new("en", "fa").with_font_path(Some(common::test_font_path())),
    );

    let output = pipeline.run(&pdf).await.unwrap();

    assert!(output.report.is_clean());
    let reread = PdfDocument::from_bytes(&output.pdf).unwrap();
    let blocks = BlockExtractor::default().extract_page(&reread, 1).unwrap();
    assert_eq!(blocks.len(), 1);
    assert!((blocks[0].bbox.x1 - bbox.x1).abs() < 1.0);
    assert!(blocks[0].bbox.x0 >= bbox.x0 - 0.5);
}

/// Test that a failed block nested inside a translated block's box stays
/// on the page
#[tokio::test]
async fn test_run_withFailedBlockInsideTranslatedBox_shouldKeepItsText() {
    let pdf = common::pdf_with_streams(&[[
        common::text_line(72.0, 720.0, 12.0, "Alpha line one is long"),
        common::text_line(72.0, 706.0, 12.0, "Beta line two"),
        common::text_line(72.0, 500.0, 12.0, "Far away"),
        common::text_line(150.0, 713.0, 6.0, "Inner"),
    ]
    .concat()]);
    let provider = MockProvider::dictionary([
        ("Alpha line one is long\nBeta line two", "Uno"),
        ("Far away", "Lejos"),
        ("Inner", ""),
    ]);
    let pipeline = PdfTranslationPipeline::new(common::mock_service(provider, 0), PipelineConfig::new("en", "es"));

    let output = pipeline.run(&pdf).await.unwrap();

    assert_eq!(output.report.translated, 2);
    assert_eq!(output.report.count(FailureKind::Translation), 1);
    assert_eq!(output.report.failures[0].block, 2);
    let text = common::block_texts(&output.pdf, 1).join(" ");
    assert!(text.contains("Inner"));
    assert!(text.contains("Uno"));
    assert!(text.contains("Lejos"));
}

/// Test that a missing LTR font only downgrades the layout
#[tokio::test]
async fn test_run_withMissingFontForLtrTarget_shouldFallBack() {
    let pdf = common::pdf_with_pages(&["Hello"]);
    let pipeline = PdfTranslationPipeline::new(
        common::mock_service(MockProvider::dictionary([("Hello", "Hola")]), 0),
        PipelineConfig::new("en", "es")
            .with_layout(LayoutPolicy::Styled)
            .with_font_path(Some("/nonexistent/font.ttf".into())),
    );

    let output = pipeline.run(&pdf).await.unwrap();

    assert_eq!(common::block_texts(&output.pdf, 1), vec!["Hola"]);
}

/// Test that the summary adds requests and still translates
#[tokio::test]
async fn test_run_withSummary_shouldTranslateWithContext() {
    let pdf = common::pdf_with_pages(&["Hello"]);
    let provider = MockProvider::working();
    let pipeline = PdfTranslationPipeline::new(
        common::mock_service(provider.clone(), 0),
        PipelineConfig::new("en", "es").with_summary(true),
    );

    let output = pipeline.run(&pdf).await.unwrap();

    assert!(output.report.is_clean());
    assert_eq!(output.report.translated, 1);
    assert_eq!(provider.request_count(), 2);
}
