use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app_config::Config;
use crate::errors::AppError;
use crate::file_utils::{FileManager, FileType};
use crate::language_utils;
use crate::pdf::{annotations, Block, BlockExtractor, PdfDocument};
use crate::pipeline::{PdfTranslationPipeline, PipelineConfig, PipelineOutput, PipelineReport};
use crate::translation::TranslationService;

// @module: Application controller for PDF translation

/// Blocks found on one page by `inspect`
#[derive(Debug, Clone)]
pub struct PageBlocks {
    pub page: u32,
    pub blocks: Vec<Block>,
}

/// What `inspect` found in a document
#[derive(Debug, Clone)]
pub struct InspectReport {
    pub page_count: u32,
    pub pages: Vec<PageBlocks>,
}

impl InspectReport {
    pub fn block_count(&self) -> usize {
        self.pages.iter().map(|p| p.blocks.len()).sum()
    }
}

/// Main application controller for PDF translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Service used instead of the configured provider
    service: Option<TranslationService>,
}

impl Controller {
    /// Create a new controller for test purposes with default configuration
    pub fn new_for_test() -> Result<Self> {
        Self::with_config(Config::default())
    }

    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self {
            config,
            service: None,
        })
    }

    /// Controller that translates through the given service instead of
    /// building one from the configuration
    pub fn with_service(config: Config, service: TranslationService) -> Self {
        Self {
            config,
            service: Some(service),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check if the controller is properly initialized with configuration
    pub fn is_initialized(&self) -> bool {
        !self.config.source_language.is_empty() && !self.config.target_language.is_empty()
    }

    /// Output file the controller writes for `input_file`
    pub fn output_path(&self, input_file: &Path, output_dir: &Path) -> PathBuf {
        FileManager::generate_output_path(input_file, output_dir, &self.config.target_language, "pdf")
    }

    /// Translate one PDF file into `output_dir`.
    ///
    /// Returns the written path, or `None` when the output already exists
    /// and `force_overwrite` is off. Nothing is written when the run fails.
    pub async fn run(&self, input_file: PathBuf, output_dir: PathBuf, force_overwrite: bool) -> Result<Option<PathBuf>> {
        let start_time = std::time::Instant::now();

        if !input_file.exists() {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }
        match FileManager::detect_file_type(&input_file)? {
            FileType::Pdf => {}
            FileType::Corrupt => {
                return Err(anyhow!("File has a .pdf extension but no PDF header: {:?}", input_file))
            }
            FileType::Unknown => return Err(anyhow!("Not a PDF file: {:?}", input_file)),
        }

        FileManager::ensure_dir(&output_dir)?;
        let output_path = self.output_path(&input_file, &output_dir);
        if output_path.exists() && !force_overwrite {
            warn!(
                "Skipping {:?}: {:?} already exists (use --force to overwrite)",
                input_file, output_path
            );
            return Ok(None);
        }

        let input = PdfDocument::read_source(std::fs::File::open(&input_file)?)?;
        let service = self.translation_service()?;
        if self.service.is_none() {
            if let Err(e) = service.test_connection().await {
                warn!("Provider check failed, translation will likely fail: {}", e);
            }
        }
        info!(
            "🚀 YAPTwAI: {} - {} ({} → {})",
            self.config.translation.provider.display_name(),
            self.config.translation.get_model(),
            language_utils::get_language_name(&self.config.source_language)
                .unwrap_or_else(|_| self.config.source_language.clone()),
            language_utils::get_language_name(&self.config.target_language)
                .unwrap_or_else(|_| self.config.target_language.clone()),
        );

        let output = self
            .translate_bytes(&input, service)
            .await
            .with_context(|| format!("Failed to translate {:?}", input_file))?;

        FileManager::write_atomic(&output_path, &output.pdf)?;
        output.report.log_summary();
        if !output.report.is_clean() {
            self.write_issues(&output.report, &output_path);
        }

        info!(
            "Success: {} ({})",
            output_path.display(),
            Self::format_duration(start_time.elapsed())
        );
        Ok(Some(output_path))
    }

    /// Run the pipeline on bytes in memory with a progress bar and the
    /// configured deadline
    pub async fn translate_bytes(&self, input: &[u8], service: TranslationService) -> Result<PipelineOutput, AppError> {
        let progress_bar = ProgressBar::new(100);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}% {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar.set_message("Translating");

        let pb = progress_bar.clone();
        let pipeline = PdfTranslationPipeline::new(service, PipelineConfig::from_config(&self.config))
            .with_progress(move |percent| pb.set_position(percent as u64));

        let result = match self.config.pdf.run_timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), pipeline.run(input))
                .await
                .unwrap_or(Err(AppError::Timeout(secs))),
            None => pipeline.run(input).await,
        };

        // Clear the bar before the summary lines are logged
        progress_bar.finish_and_clear();
        result
    }

    /// List the text blocks of a document; with `outline_output`, also write
    /// a copy with every block outlined in red
    pub fn inspect(&self, input_file: &Path, outline_output: Option<&Path>) -> Result<InspectReport> {
        let input = FileManager::read_bytes(input_file)?;
        let mut doc = PdfDocument::from_bytes(&input)?;
        let extractor = BlockExtractor::default();

        let mut pages = Vec::with_capacity(doc.page_count() as usize);
        for page in 1..=doc.page_count() {
            let blocks = extractor.extract_page(&doc, page)?;
            pages.push(PageBlocks { page, blocks });
        }

        if let Some(path) = outline_output {
            for page in &pages {
                let boxes: Vec<_> = page.blocks.iter().map(|b| b.bbox).collect();
                annotations::outline_blocks(&mut doc, page.page, &boxes)?;
            }
            FileManager::write_atomic(path, &doc.to_bytes()?)?;
            info!("Outlined copy written to {}", path.display());
        }

        Ok(InspectReport {
            page_count: doc.page_count(),
            pages,
        })
    }

    fn translation_service(&self) -> Result<TranslationService> {
        match &self.service {
            Some(service) => Ok(service.clone()),
            None => Ok(TranslationService::new(&self.config.translation)?),
        }
    }

    /// Append the failures of a run to `<output stem>.issues.log`
    fn write_issues(&self, report: &PipelineReport, output_path: &Path) {
        let log_path = output_path.with_extension("issues.log");
        let content = format!(
            "{} - {} ({} failure(s))\n{}",
            self.config.translation.provider.display_name(),
            self.config.translation.get_model(),
            report.failure_count(),
            report.issues()
        );
        match FileManager::append_to_log_file(&log_path, &content) {
            Ok(()) => info!("Issues written to {}", log_path.display()),
            Err(e) => warn!("Failed to write issues log: {}", e),
        }
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
