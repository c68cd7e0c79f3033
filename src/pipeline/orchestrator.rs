/*!
 * Pipeline orchestrator for translating a PDF document.
 *
 * A run moves through these states:
 * 1. Range validation: the page range is checked before anything is changed
 * 2. Summary (optional): the whole range is summarized to give context
 * 3. Per page: extraction, translation, redaction, reinsertion
 * 4. Save
 *
 * Each page is a barrier. Every block of a page is translated before the
 * page is redacted, and redaction finishes before text is drawn back.
 * Blocks that cannot be handled are recorded in the report and never abort
 * the run; extraction errors and font errors that make the requested layout
 * impossible do.
 */

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::time::Instant;

use super::progress::{ProgressSink, ProgressTracker};
use super::report::PipelineReport;
use crate::app_config::{Config, LayoutPolicy};
use crate::errors::{AppError, BlockFailure, FailureKind, PdfError, TranslationError};
use crate::language_utils;
use crate::pdf::annotations;
use crate::pdf::embed::{EmbeddedFont, PdfFont, StandardFont};
use crate::pdf::layout::LayoutOptions;
use crate::pdf::{
    Block, BlockExtractor, Direction, LayoutStrategy, PageRange, PdfDocument,
    RedactionOptions, Redactor, ReinsertOptions, Reinserter, RenderDirective,
};
use crate::translation::{DocumentSummarizer, TranslationService};

// Progress weights
const SUMMARY_UNITS: f64 = 5.0;
const EXTRACT_UNITS: f64 = 1.0;
const TRANSLATE_UNITS: f64 = 6.0;
const REDACT_UNITS: f64 = 1.0;
const INSERT_UNITS: f64 = 2.0;
const SAVE_UNITS: f64 = 1.0;

/// Settings of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub source_language: String,
    pub target_language: String,

    /// First page to translate, 1-based; `None` for the first page
    pub start_page: Option<u32>,

    /// Last page to translate, inclusive; `None` for the last page
    pub end_page: Option<u32>,

    pub layout: LayoutPolicy,

    /// Font used for translated text; Helvetica when absent
    pub font_path: Option<PathBuf>,

    pub layout_options: LayoutOptions,

    pub redaction: RedactionOptions,

    pub text_color: [f32; 3],

    /// Summarize the range first and pass the summary as context
    pub summarize: bool,

    pub summary_chunk_chars: usize,

    /// Translation requests in flight at once within a page
    pub concurrent_requests: usize,

    /// Mark blocks whose original text was kept
    pub flag_untranslated: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl PipelineConfig {
    pub fn new(source_language: &str, target_language: &str) -> Self {
        Self {
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            ..Default::default()
        }
    }

    /// Pipeline settings from the application configuration
    pub fn from_config(config: &Config) -> Self {
        let pdf = &config.pdf;
        Self {
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
            start_page: pdf.start_page,
            end_page: pdf.end_page,
            layout: pdf.layout,
            font_path: pdf.font_path.clone(),
            layout_options: LayoutOptions {
                min_font_size: pdf.min_font_size,
                box_margin: pdf.box_margin,
                line_height: pdf.line_height,
            },
            redaction: RedactionOptions {
                fill: pdf.fill_color,
                ..RedactionOptions::default()
            },
            text_color: pdf.text_color,
            summarize: pdf.summarize,
            summary_chunk_chars: pdf.summary_chunk_chars,
            concurrent_requests: config.translation.optimal_concurrent_requests(),
            flag_untranslated: pdf.flag_untranslated,
        }
    }

    pub fn with_page_range(mut self, start_page: Option<u32>, end_page: Option<u32>) -> Self {
        self.start_page = start_page;
        self.end_page = end_page;
        self
    }

    pub fn with_layout(mut self, layout: LayoutPolicy) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_font_path(mut self, font_path: Option<PathBuf>) -> Self {
        self.font_path = font_path;
        self
    }

    pub fn with_summary(mut self, enabled: bool) -> Self {
        self.summarize = enabled;
        self
    }

    pub fn with_concurrent_requests(mut self, concurrent_requests: usize) -> Self {
        self.concurrent_requests = concurrent_requests.max(1);
        self
    }

    /// Writing direction of the target language
    pub fn direction(&self) -> Direction {
        if language_utils::is_rtl_language(&self.target_language) {
            Direction::Rtl
        } else {
            Direction::Ltr
        }
    }

    /// Strategy asked for by the policy, before font availability is known
    pub fn requested_strategy(&self) -> LayoutStrategy {
        match self.layout {
            LayoutPolicy::Auto if self.direction().is_rtl() => LayoutStrategy::StyledBox,
            LayoutPolicy::Auto | LayoutPolicy::Shrink => LayoutStrategy::ShrinkToFit,
            LayoutPolicy::Styled => LayoutStrategy::StyledBox,
        }
    }
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub pdf: Vec<u8>,
    pub report: PipelineReport,
}

/// Translates PDF documents with one translation service
pub struct PdfTranslationPipeline {
    service: TranslationService,
    config: PipelineConfig,
    extractor: BlockExtractor,
    progress: Option<ProgressSink>,
}

impl PdfTranslationPipeline {
    pub fn new(service: TranslationService, config: PipelineConfig) -> Self {
        Self {
            service,
            config,
            extractor: BlockExtractor::default(),
            progress: None,
        }
    }

    /// Report integer percentages while running
    pub fn with_progress<F>(mut self, sink: F) -> Self
    where
        F: Fn(u8) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(sink));
        self
    }

    pub fn with_extractor(mut self, extractor: BlockExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn service(&self) -> &TranslationService {
        &self.service
    }

    /// Pick the font and the layout strategy.
    ///
    /// A font that cannot be loaded is fatal when the target script has no
    /// letters in Helvetica, or when a right-to-left target is laid out as
    /// styled boxes. Otherwise Helvetica is used and a styled layout falls
    /// back to shrink-to-fit.
    pub fn resolve_layout(&self) -> Result<(PdfFont, LayoutStrategy), PdfError> {
        let direction = self.config.direction();
        let requested = self.config.requested_strategy();
        let needs_unicode = language_utils::needs_unicode_font(&self.config.target_language);
        let strict = needs_unicode || (direction.is_rtl() && requested == LayoutStrategy::StyledBox);

        let loaded = match &self.config.font_path {
            Some(path) => EmbeddedFont::from_file(path).map(Some),
            None if strict => Err(PdfError::FontEmbedding {
                path: "<none>".to_string(),
                reason: if needs_unicode {
                    format!(
                        "a font_path is required to write {} text; Helvetica has no glyphs for its script",
                        self.config.target_language
                    )
                } else {
                    format!(
                        "a font_path is required to lay out {} text as styled boxes",
                        self.config.target_language
                    )
                },
            }),
            None => Ok(None),
        };

        match loaded {
            Ok(Some(font)) => {
                info!("Using font {} for translated text", font.name());
                Ok((PdfFont::Embedded(font), requested))
            }
            Ok(None) => {
                if requested == LayoutStrategy::StyledBox {
                    warn!("Styled layout needs an embedded font; using shrink-to-fit with Helvetica");
                }
                Ok((PdfFont::Standard(StandardFont::default()), LayoutStrategy::ShrinkToFit))
            }
            Err(e) if strict => Err(e),
            Err(e) => {
                warn!("{}; falling back to Helvetica", e);
                Ok((PdfFont::Standard(StandardFont::default()), LayoutStrategy::ShrinkToFit))
            }
        }
    }

    /// Translate a whole document held in memory
    pub async fn run(&self, input: &[u8]) -> Result<PipelineOutput, AppError> {
        let started = Instant::now();
        let mut doc = PdfDocument::from_bytes(input)?;
        let range = PageRange::resolve(self.config.start_page, self.config.end_page, doc.page_count())?;
        let (font, strategy) = self.resolve_layout()?;
        let direction = self.config.direction();

        info!(
            "Translating pages {}-{} of {} from {} to {} ({}, {:?})",
            range.start(),
            range.end(),
            doc.page_count(),
            self.config.source_language,
            self.config.target_language,
            direction,
            strategy
        );

        let page_units = EXTRACT_UNITS + TRANSLATE_UNITS + REDACT_UNITS + INSERT_UNITS;
        let total_units = range.len() as f64 * page_units
            + SAVE_UNITS
            + if self.config.summarize { SUMMARY_UNITS } else { 0.0 };
        let mut progress = ProgressTracker::new(total_units, self.progress.as_deref());
        progress.start();

        let context = if self.config.summarize {
            let summary = self.summarize(input, &range).await;
            progress.advance(SUMMARY_UNITS);
            summary
        } else {
            None
        };

        let hits_before = self.service.cache().stats().0;
        doc.select_pages(&range)?;

        let redactor = Redactor::new(self.config.redaction);
        let mut reinserter = Reinserter::new(
            font,
            ReinsertOptions {
                layout: self.config.layout_options,
                text_color: self.config.text_color,
            },
        );
        let mut report = PipelineReport {
            pages: range.len(),
            ..Default::default()
        };

        for index in 1..=range.len() {
            let page = PageJob {
                number: index,
                original: range.original_page(index),
                direction,
                strategy,
            };
            self.process_page(
                &mut doc,
                &page,
                context.as_deref(),
                &redactor,
                &mut reinserter,
                &mut report,
                &mut progress,
            )
            .await?;
        }

        reinserter.finish(&mut doc)?;
        let pdf = doc.to_bytes()?;
        progress.finish();

        report.cache_hits = self.service.cache().stats().0.saturating_sub(hits_before);
        report.elapsed = started.elapsed();
        Ok(PipelineOutput { pdf, report })
    }

    /// Summary of the selected pages, read from a fresh parse of the input.
    /// Any failure leaves translation without context.
    async fn summarize(&self, input: &[u8], range: &PageRange) -> Option<String> {
        let pristine = match PdfDocument::from_bytes(input) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Summary skipped: {}", e);
                return None;
            }
        };
        let mut text = String::new();
        for page in range.pages() {
            match self.extractor.extract_page(&pristine, page) {
                Ok(blocks) => {
                    for block in blocks {
                        text.push_str(&block.text);
                        text.push_str("\n\n");
                    }
                }
                Err(e) => {
                    warn!("Summary skipped: {}", e);
                    return None;
                }
            }
        }

        let summarizer = DocumentSummarizer::new(self.service.clone(), self.config.summary_chunk_chars);
        match summarizer.summarize(&text).await {
            Ok(summary) if summary.trim().is_empty() => None,
            Ok(summary) => {
                debug!("Document summary: {}", summary);
                Some(summary)
            }
            Err(e) => {
                warn!("Summary failed, translating without context: {}", e);
                None
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn process_page(
        &self,
        doc: &mut PdfDocument,
        page: &PageJob,
        context: Option<&str>,
        redactor: &Redactor,
        reinserter: &mut Reinserter,
        report: &mut PipelineReport,
        progress: &mut ProgressTracker<'_>,
    ) -> Result<(), AppError> {
        let blocks = self
            .extractor
            .extract_page(doc, page.number)
            .map_err(|e| renumber(e, page.original))?;
        progress.advance(EXTRACT_UNITS);
        report.blocks += blocks.len();
        debug!("Page {}: {} block(s)", page.original, blocks.len());

        let translations = self.translate_blocks(&blocks, context, progress).await;

        // Text the output font cannot draw stays untranslated rather than
        // replacing the original with placeholder glyphs
        let mut pending: Vec<(usize, String)> = Vec::new();
        for (index, (block, result)) in blocks.iter().zip(translations).enumerate() {
            let (kind, reason) = match result {
                Ok(text) => {
                    let missing = reinserter.font().uncovered_chars(&text);
                    if missing.is_empty() {
                        pending.push((index, text));
                        continue;
                    }
                    let preview: String = missing.iter().take(8).collect();
                    (
                        FailureKind::Insertion,
                        format!("the output font has no glyphs for \"{}\"", preview),
                    )
                }
                Err(e) => (FailureKind::Translation, e.to_string()),
            };
            if self.config.flag_untranslated {
                let note = format!("Not translated: {}", reason);
                if let Err(e) = annotations::flag_block(doc, page.number, &block.bbox, &note) {
                    warn!("Page {}: could not flag block {}: {}", page.original, index, e);
                }
            }
            report.failures.push(failure(page.original, index, block, kind, reason));
        }

        let targets: Vec<usize> = pending.iter().map(|(index, _)| *index).collect();
        let applied: Vec<Result<(), String>> = match redactor.redact_blocks(doc, page.number, &blocks, &targets) {
            Ok(outcome) => outcome
                .applied
                .into_iter()
                .map(|ok| if ok { Ok(()) } else { Err("no text found under the block".to_string()) })
                .collect(),
            Err(e) => {
                warn!("Page {}: redaction failed: {}", page.original, e);
                vec![Err(e.to_string()); targets.len()]
            }
        };
        progress.advance(REDACT_UNITS);

        let mut directives = Vec::with_capacity(pending.len());
        for ((index, text), applied) in pending.into_iter().zip(applied) {
            match applied {
                Ok(()) => directives.push(RenderDirective {
                    block: index,
                    bbox: blocks[index].bbox,
                    text,
                    direction: page.direction,
                    strategy: page.strategy,
                }),
                Err(reason) => report.failures.push(failure(
                    page.original,
                    index,
                    &blocks[index],
                    FailureKind::Redaction,
                    reason,
                )),
            }
        }

        let results = reinserter.insert_page(doc, page.number, &directives);
        for (directive, result) in directives.iter().zip(results) {
            match result {
                Ok(rendered) => {
                    report.translated += 1;
                    if rendered.overflow {
                        report.overflowing += 1;
                    }
                }
                Err(e) => report.failures.push(failure(
                    page.original,
                    directive.block,
                    &blocks[directive.block],
                    FailureKind::Insertion,
                    insertion_reason(e),
                )),
            }
        }
        progress.advance(INSERT_UNITS);
        Ok(())
    }

    /// Translate every block, keeping block order whatever the concurrency
    async fn translate_blocks(
        &self,
        blocks: &[Block],
        context: Option<&str>,
        progress: &mut ProgressTracker<'_>,
    ) -> Vec<Result<String, TranslationError>> {
        if blocks.is_empty() {
            progress.advance(TRANSLATE_UNITS);
            return Vec::new();
        }
        let step = TRANSLATE_UNITS / blocks.len() as f64;
        let source = language_name(&self.config.source_language);
        let target = language_name(&self.config.target_language);
        let (source, target) = (source.as_str(), target.as_str());

        let mut results = Vec::with_capacity(blocks.len());
        let mut translated = stream::iter(blocks.iter().map(|block| {
            let service = &self.service;
            async move { service.translate(&block.text, source, target, context).await }
        }))
        .buffered(self.config.concurrent_requests.max(1));

        while let Some(result) = translated.next().await {
            progress.advance(step);
            results.push(result);
        }
        results
    }
}

/// One page being processed: its number in the output document and in the input
struct PageJob {
    number: u32,
    original: u32,
    direction: Direction,
    strategy: LayoutStrategy,
}

/// English name of a language code for prompts, the code itself when unknown
fn language_name(code: &str) -> String {
    language_utils::get_language_name(code).unwrap_or_else(|_| code.to_string())
}

fn failure(page: u32, block: usize, source: &Block, kind: FailureKind, reason: String) -> BlockFailure {
    BlockFailure {
        page,
        block,
        bbox: source.bbox,
        kind,
        reason,
    }
}

fn insertion_reason(error: PdfError) -> String {
    match error {
        PdfError::Insertion { reason, .. } => reason,
        other => other.to_string(),
    }
}

/// Report extraction errors with the page number of the input document
fn renumber(error: PdfError, original: u32) -> PdfError {
    match error {
        PdfError::Extraction { reason, .. } => PdfError::Extraction { page: original, reason },
        other => other,
    }
}
