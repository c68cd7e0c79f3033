use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO) or English name
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code (ISO) or English name
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// PDF layout and pipeline settings
    #[serde(default)]
    pub pdf: PdfConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Ollama
    #[default]
    Ollama,
    // @provider: OpenAI (also OpenRouter through the endpoint)
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::LMStudio => "LM Studio",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }

    // @returns: Whether requests leave the machine and need a key
    pub fn is_hosted(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Anthropic)
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "lmstudio" => Ok(Self::LMStudio),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Max concurrent requests within one page
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Response token cap for hosted APIs
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        let (model, endpoint) = match provider_type {
            TranslationProvider::Ollama => (default_ollama_model(), default_ollama_endpoint()),
            TranslationProvider::OpenAI => (default_openai_model(), default_openai_endpoint()),
            TranslationProvider::Anthropic => {
                (default_anthropic_model(), default_anthropic_endpoint())
            }
            TranslationProvider::LMStudio => {
                (default_lmstudio_model(), default_lmstudio_endpoint())
            }
        };
        Self {
            provider_type: provider_type.to_lowercase_string(),
            model,
            api_key: String::new(),
            endpoint,
            concurrent_requests: default_concurrent_requests(),
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// Delay in milliseconds between consecutive requests
    #[serde(default = "default_rate_limit_delay_ms")]
    pub rate_limit_delay_ms: u64,

    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff base for retries (in milliseconds), doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Reuse translations of identical blocks within a run
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            rate_limit_delay_ms: default_rate_limit_delay_ms(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
            cache_enabled: true,
        }
    }
}

/// How translated text is laid back into its box
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LayoutPolicy {
    /// Right-to-left targets get the styled box, everything else shrink-to-fit
    #[default]
    Auto,
    /// Always shrink-to-fit plain text
    Shrink,
    /// Always the shaped, styled box
    Styled,
}

impl std::fmt::Display for LayoutPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Shrink => "shrink",
            Self::Styled => "styled",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for LayoutPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "shrink" => Ok(Self::Shrink),
            "styled" => Ok(Self::Styled),
            _ => Err(anyhow!("Invalid layout policy: {}", s)),
        }
    }
}

/// PDF processing settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PdfConfig {
    // @field: TrueType/OpenType font embedded for translated text
    #[serde(default)]
    pub font_path: Option<PathBuf>,

    // @field: Layout strategy selection
    #[serde(default)]
    pub layout: LayoutPolicy,

    // @field: Smallest font size shrink-to-fit may reach (points)
    #[serde(default = "default_min_font_size")]
    pub min_font_size: f32,

    // @field: Space kept between the box edges and the text (points)
    #[serde(default = "default_box_margin")]
    pub box_margin: f32,

    // @field: Line height as a multiple of the font size
    #[serde(default = "default_line_height")]
    pub line_height: f32,

    // @field: RGB fill painted over redacted boxes, null for none
    #[serde(default = "default_fill_color")]
    pub fill_color: Option<[f32; 3]>,

    // @field: RGB colour of the inserted text
    #[serde(default = "default_text_color")]
    pub text_color: [f32; 3],

    // @field: Summarize the document first and pass the summary as context
    #[serde(default)]
    pub summarize: bool,

    // @field: Maximum characters per summary chunk
    #[serde(default = "default_summary_chunk_chars")]
    pub summary_chunk_chars: usize,

    // @field: First page to translate (1-based, inclusive)
    #[serde(default)]
    pub start_page: Option<u32>,

    // @field: Last page to translate (1-based, inclusive)
    #[serde(default)]
    pub end_page: Option<u32>,

    // @field: Outline blocks left untranslated with a red annotation
    #[serde(default = "default_true")]
    pub flag_untranslated: bool,

    // @field: Abort the run after this many seconds
    #[serde(default)]
    pub run_timeout_secs: Option<u64>,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            layout: LayoutPolicy::default(),
            min_font_size: default_min_font_size(),
            box_margin: default_box_margin(),
            line_height: default_line_height(),
            fill_color: default_fill_color(),
            text_color: default_text_color(),
            summarize: false,
            summary_chunk_chars: default_summary_chunk_chars(),
            start_page: None,
            end_page: None,
            flag_untranslated: true,
            run_timeout_secs: None,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_target_language() -> String {
    "fa".to_string()
}

fn default_concurrent_requests() -> usize {
    1
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_rate_limit_delay_ms() -> u64 {
    0
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_temperature() -> f32 {
    0.3
}

fn default_true() -> bool {
    true
}

fn default_min_font_size() -> f32 {
    5.0
}

fn default_box_margin() -> f32 {
    1.0
}

fn default_line_height() -> f32 {
    1.2
}

fn default_fill_color() -> Option<[f32; 3]> {
    Some([1.0, 1.0, 1.0])
}

fn default_text_color() -> [f32; 3] {
    [0.0, 0.0, 0.0]
}

fn default_summary_chunk_chars() -> usize {
    10_000
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_lmstudio_endpoint() -> String {
    "http://localhost:1234/v1".to_string()
}

fn default_ollama_model() -> String {
    "gemma3:1b".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

fn default_lmstudio_model() -> String {
    // Placeholder; users should set to the loaded model name in LM Studio
    "local-model".to_string()
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let source_name = crate::language_utils::get_language_name(&self.source_language)?;
        let target_name = crate::language_utils::get_language_name(&self.target_language)?;
        if source_name == target_name {
            return Err(anyhow!(
                "Source and target languages must differ (both are {})",
                source_name
            ));
        }

        if self.translation.provider.is_hosted() && self.translation.get_api_key().is_empty() {
            return Err(anyhow!(
                "Translation API key is required for {} provider",
                self.translation.provider.display_name()
            ));
        }

        let endpoint = self.translation.get_endpoint();
        url::Url::parse(&endpoint)
            .map_err(|e| anyhow!("Invalid endpoint URL '{}': {}", endpoint, e))?;

        if self.pdf.start_page == Some(0) || self.pdf.end_page == Some(0) {
            return Err(anyhow!("Page numbers start at 1"));
        }
        if let (Some(start), Some(end)) = (self.pdf.start_page, self.pdf.end_page) {
            if end < start {
                return Err(anyhow!("End page {} is before start page {}", end, start));
            }
        }
        if self.pdf.min_font_size <= 0.0 {
            return Err(anyhow!("Minimum font size must be positive"));
        }
        if self.pdf.summary_chunk_chars == 0 {
            return Err(anyhow!("Summary chunk size must be positive"));
        }

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        serde_json::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path.display(), e))
    }

    /// Write configuration as pretty JSON
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path.display(), e))
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            translation: TranslationConfig::default(),
            pdf: PdfConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    pub fn optimal_concurrent_requests(&self) -> usize {
        self.get_active_provider_config()
            .map(|p| p.concurrent_requests.max(1))
            .unwrap_or_else(default_concurrent_requests)
    }

    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers
            .iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Mutable access to the active provider, created with defaults when absent
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        match self
            .available_providers
            .iter()
            .position(|p| p.provider_type == provider_str)
        {
            Some(index) => &mut self.available_providers[index],
            None => {
                self.available_providers
                    .push(ProviderConfig::new(self.provider.clone()));
                let last = self.available_providers.len() - 1;
                &mut self.available_providers[last]
            }
        }
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }

        match self.provider {
            TranslationProvider::Ollama => default_ollama_model(),
            TranslationProvider::OpenAI => default_openai_model(),
            TranslationProvider::Anthropic => default_anthropic_model(),
            TranslationProvider::LMStudio => default_lmstudio_model(),
        }
    }

    /// Get the API key for the active provider.
    ///
    /// Falls back to the environment: `OPENROUTER_API_KEY` when the endpoint
    /// points at OpenRouter, otherwise the provider's own variable.
    pub fn get_api_key(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.api_key.is_empty() {
                return provider_config.api_key.clone();
            }
        }

        let endpoint = self.get_endpoint();
        let variable = match self.provider {
            TranslationProvider::Ollama | TranslationProvider::LMStudio => return String::new(),
            TranslationProvider::Anthropic => "ANTHROPIC_API_KEY",
            TranslationProvider::OpenAI if endpoint.contains("openrouter") => "OPENROUTER_API_KEY",
            TranslationProvider::OpenAI => "OPENAI_API_KEY",
        };
        std::env::var(variable).unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }

        match self.provider {
            TranslationProvider::Ollama => default_ollama_endpoint(),
            TranslationProvider::OpenAI => default_openai_endpoint(),
            TranslationProvider::Anthropic => default_anthropic_endpoint(),
            TranslationProvider::LMStudio => default_lmstudio_endpoint(),
        }
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .filter(|t| *t > 0)
            .unwrap_or_else(default_timeout_secs)
    }

    /// Get the response token cap for the active provider
    pub fn get_max_tokens(&self) -> u32 {
        self.get_active_provider_config()
            .map(|p| p.max_tokens)
            .filter(|t| *t > 0)
            .unwrap_or_else(default_max_tokens)
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: vec![
                ProviderConfig::new(TranslationProvider::Ollama),
                ProviderConfig::new(TranslationProvider::OpenAI),
                ProviderConfig::new(TranslationProvider::Anthropic),
                ProviderConfig::new(TranslationProvider::LMStudio),
            ],
            common: TranslationCommonConfig::default(),
        }
    }
}
