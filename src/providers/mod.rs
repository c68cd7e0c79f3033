/*!
 * Provider implementations for different language model services.
 *
 * Every backend answers a single question: given a prompt, return text.
 * - Ollama: Local LLM server
 * - OpenAI: OpenAI-compatible chat completions (OpenAI, OpenRouter, LM Studio)
 * - Anthropic: Anthropic messages API
 * - Mock: deterministic provider for tests
 */

use async_trait::async_trait;
use reqwest::StatusCode;
use std::fmt::Debug;
use std::sync::Arc;

use crate::app_config::{TranslationConfig, TranslationProvider};
use crate::errors::ProviderError;

/// Common trait for all LLM providers
///
/// The trait is object safe so the pipeline can hold any backend behind an
/// `Arc<dyn Provider>` chosen at runtime from configuration.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Send one prompt and return the model's text answer
    async fn ask(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Human readable backend name for logs
    fn name(&self) -> &str;
}

/// Build the configured backend
pub fn create_provider(config: &TranslationConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let model = config.get_model();
    let endpoint = config.get_endpoint();
    let timeout_secs = config.get_timeout_secs();
    let temperature = config.common.temperature;

    let provider: Arc<dyn Provider> = match config.provider {
        TranslationProvider::Ollama => Arc::new(
            ollama::Ollama::from_url(endpoint, timeout_secs)?
                .with_model(model)
                .with_temperature(temperature),
        ),
        TranslationProvider::OpenAI | TranslationProvider::LMStudio => {
            let api_key = config.get_api_key();
            if config.provider == TranslationProvider::OpenAI && api_key.is_empty() {
                return Err(ProviderError::AuthenticationError(
                    "No API key configured for OpenAI-compatible endpoint".to_string(),
                ));
            }
            Arc::new(
                openai::OpenAI::new(api_key, endpoint, timeout_secs)?
                    .with_model(model)
                    .with_temperature(temperature)
                    .with_max_tokens(config.get_max_tokens())
                    .with_display_name(config.provider.display_name()),
            )
        }
        TranslationProvider::Anthropic => {
            let api_key = config.get_api_key();
            if api_key.is_empty() {
                return Err(ProviderError::AuthenticationError(
                    "No API key configured for Anthropic".to_string(),
                ));
            }
            Arc::new(
                anthropic::Anthropic::new(api_key, endpoint, timeout_secs)?
                    .with_model(model)
                    .with_temperature(temperature)
                    .with_max_tokens(config.get_max_tokens()),
            )
        }
    };

    Ok(provider)
}

/// Map a non-success HTTP status onto the error taxonomy
pub(crate) fn status_error(status: StatusCode, body: String) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::AuthenticationError(body),
        429 => ProviderError::RateLimitExceeded(body),
        code => ProviderError::ApiError {
            status_code: code,
            message: body,
        },
    }
}

/// Map a transport failure onto the error taxonomy
pub(crate) fn transport_error(error: reqwest::Error) -> ProviderError {
    if error.is_connect() || error.is_timeout() {
        ProviderError::ConnectionError(error.to_string())
    } else {
        ProviderError::RequestFailed(error.to_string())
    }
}

/// Shorten a response body for log lines
pub(crate) fn preview(text: &str) -> String {
    if text.chars().count() > 500 {
        text.chars().take(500).collect::<String>()
    } else {
        text.to_string()
    }
}

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;
