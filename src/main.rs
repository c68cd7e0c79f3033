// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};

use yaptwai::app_config::{self, Config, LayoutPolicy, TranslationProvider};
use yaptwai::app_controller::Controller;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Ollama,
    OpenAI,
    Anthropic,
    LMStudio,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for LayoutPolicy to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLayout {
    Auto,
    Shrink,
    Styled,
}

impl From<CliLayout> for LayoutPolicy {
    fn from(cli_layout: CliLayout) -> Self {
        match cli_layout {
            CliLayout::Auto => LayoutPolicy::Auto,
            CliLayout::Shrink => LayoutPolicy::Shrink,
            CliLayout::Styled => LayoutPolicy::Styled,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a PDF document (default command)
    Translate(TranslateArgs),

    /// List the text blocks found in a PDF document
    Inspect {
        /// PDF document to inspect
        #[arg(value_name = "INPUT_FILE")]
        input_file: PathBuf,

        /// Write a copy with every block outlined in red
        #[arg(short, long, value_name = "OUTPUT_FILE")]
        outline: Option<PathBuf>,

        /// Print the text of every block
        #[arg(long)]
        text: bool,
    },

    /// Generate shell completions for yaptwai
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Default)]
struct TranslateArgs {
    /// PDF document to translate
    #[arg(value_name = "INPUT_FILE")]
    input_file: Option<PathBuf>,

    /// Directory for the translated document (defaults to the input's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Provider endpoint URL
    #[arg(long)]
    base_url: Option<String>,

    /// Source language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'fa', 'ar', 'es')
    #[arg(short, long)]
    target_language: Option<String>,

    /// First page to translate (1-based)
    #[arg(long)]
    start_page: Option<u32>,

    /// Last page to translate (inclusive)
    #[arg(long)]
    end_page: Option<u32>,

    /// TrueType/OpenType font for the translated text
    #[arg(long)]
    font: Option<PathBuf>,

    /// Layout strategy
    #[arg(long, value_enum)]
    layout: Option<CliLayout>,

    /// Summarize the document first and use the summary as context
    #[arg(long)]
    summarize: bool,

    /// Abort the run after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// YAPTwAI - Yet Another PDF Translator with AI
///
/// Translates the text of PDF documents in place, keeping the page layout.
#[derive(Parser, Debug)]
#[command(name = "yaptwai")]
#[command(version)]
#[command(about = "Layout-preserving PDF translation with AI")]
#[command(long_about = "YAPTwAI replaces the text of PDF pages with its translation, inside the original boxes.

EXAMPLES:
    yaptwai paper.pdf                              # Translate using default config
    yaptwai -f paper.pdf                           # Force overwrite existing output
    yaptwai -s en -t fa --font Vazir.ttf paper.pdf # English to Persian with an embedded font
    yaptwai --start-page 2 --end-page 5 paper.pdf  # Translate pages 2 to 5 only
    yaptwai -p openai -m gpt-4o-mini paper.pdf     # Use a specific provider and model
    yaptwai inspect --outline blocks.pdf paper.pdf # Show the detected text blocks
    yaptwai completions bash > yaptwai.bash        # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    ollama    - Local Ollama server
    openai    - OpenAI API or any compatible endpoint such as OpenRouter (requires API key)
    anthropic - Anthropic Claude API (requires API key)
    lmstudio  - LM Studio local server (OpenAI-compatible on http://localhost:1234/v1)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: TranslateArgs,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI colour for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Trace is the ceiling; the effective level is set with set_max_level
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "yaptwai", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Inspect {
            input_file,
            outline,
            text,
        }) => run_inspect(&input_file, outline.as_deref(), text),
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => run_translate(cli.translate).await,
    }
}

fn run_inspect(input_file: &Path, outline: Option<&Path>, show_text: bool) -> Result<()> {
    let controller = Controller::with_config(Config::default())?;
    let report = controller.inspect(input_file, outline)?;

    info!(
        "{}: {} page(s), {} block(s)",
        input_file.display(),
        report.page_count,
        report.block_count()
    );
    for page in &report.pages {
        info!("Page {}: {} block(s)", page.page, page.blocks.len());
        for (index, block) in page.blocks.iter().enumerate() {
            let b = block.bbox;
            info!(
                "  #{} [{:.1}, {:.1}, {:.1}, {:.1}] {:.1}pt",
                index, b.x0, b.y0, b.x1, b.y1, block.font_size
            );
            if show_text {
                for line in block.text.lines() {
                    info!("      {}", line);
                }
            }
        }
    }
    Ok(())
}

/// Load the configuration file, creating it with defaults when missing
fn load_or_create_config(config_path: &str) -> Result<Config> {
    let path = Path::new(config_path);
    if path.exists() {
        return Config::from_file(path).with_context(|| format!("Failed to load config file: {}", config_path));
    }

    warn!("Config file not found at '{}', creating default config.", config_path);
    let config = Config::default();
    config
        .save(path)
        .with_context(|| format!("Failed to write default config to file: {}", config_path))?;
    Ok(config)
}

/// Command line values take precedence over the file
fn apply_overrides(config: &mut Config, options: &TranslateArgs) {
    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(model) = &options.model {
        config.translation.active_provider_config_mut().model = model.clone();
    }
    if let Some(base_url) = &options.base_url {
        config.translation.active_provider_config_mut().endpoint = base_url.clone();
    }
    if let Some(source_lang) = &options.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }
    if options.start_page.is_some() {
        config.pdf.start_page = options.start_page;
    }
    if options.end_page.is_some() {
        config.pdf.end_page = options.end_page;
    }
    if let Some(font) = &options.font {
        config.pdf.font_path = Some(font.clone());
    }
    if let Some(layout) = &options.layout {
        config.pdf.layout = layout.clone().into();
    }
    if options.summarize {
        config.pdf.summarize = true;
    }
    if options.timeout.is_some() {
        config.pdf.run_timeout_secs = options.timeout;
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    // Apply the command line level early so config loading is logged at it
    if let Some(cmd_log_level) = &options.log_level {
        log::set_max_level(level_filter(&cmd_log_level.clone().into()));
    }

    let input_file = options
        .input_file
        .clone()
        .ok_or_else(|| anyhow!("INPUT_FILE is required when no subcommand is specified"))?;

    let mut config = load_or_create_config(&options.config_path)?;
    apply_overrides(&mut config, &options);
    config.validate().context("Configuration validation failed")?;
    log::set_max_level(level_filter(&config.log_level));

    let output_dir = match &options.output_dir {
        Some(dir) => dir.clone(),
        None => input_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    let controller = Controller::with_config(config)?;
    controller
        .run(input_file, output_dir, options.force_overwrite)
        .await?;
    Ok(())
}
