/*!
 * Core translation service implementation.
 *
 * `TranslationService` wraps a provider with prompt construction, bounded
 * retries with exponential backoff, empty-answer detection and a cache.
 * It never decides what to do with a block that cannot be translated; it
 * reports the failure and the pipeline keeps the original text.
 */

use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::cache::TranslationCache;
use super::prompts;
use crate::app_config::TranslationConfig;
use crate::errors::{ProviderError, TranslationError};
use crate::providers::{self, Provider};

/// Retry settings for provider calls
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub retry_count: u32,
    /// Base delay, doubled on each retry
    pub backoff_ms: u64,
}

impl RetryPolicy {
    pub fn new(retry_count: u32, backoff_ms: u64) -> Self {
        Self {
            retry_count,
            backoff_ms,
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.backoff_ms.saturating_mul(1u64 << shift))
    }

    /// Total number of attempts including the first
    pub fn max_attempts(&self) -> u32 {
        self.retry_count + 1
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 1000)
    }
}

/// Counters describing how the provider was used
#[derive(Debug, Clone, Default)]
pub struct TranslationStats {
    /// Prompts sent, retries included
    pub requests: usize,
    /// Attempts that were repeated after a failure
    pub retries: usize,
    /// Calls that gave up after every attempt
    pub failures: usize,
    /// Time spent waiting for the provider
    pub api_duration: Duration,
}

/// Translation service holding the provider and its policies
#[derive(Debug, Clone)]
pub struct TranslationService {
    provider: Arc<dyn Provider>,
    retry: RetryPolicy,
    rate_limit_delay: Duration,
    cache: TranslationCache,
    stats: Arc<Mutex<TranslationStats>>,
}

impl TranslationService {
    /// Build the provider described by the configuration and wrap it
    pub fn new(config: &TranslationConfig) -> Result<Self, ProviderError> {
        let provider = providers::create_provider(config)?;
        Ok(Self::with_provider(provider)
            .with_retry_policy(RetryPolicy::new(
                config.common.retry_count,
                config.common.retry_backoff_ms,
            ))
            .with_rate_limit_delay(Duration::from_millis(config.common.rate_limit_delay_ms))
            .with_cache(TranslationCache::new(config.common.cache_enabled)))
    }

    /// Wrap an existing provider with default policies
    pub fn with_provider(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            retry: RetryPolicy::default(),
            rate_limit_delay: Duration::ZERO,
            cache: TranslationCache::default(),
            stats: Arc::new(Mutex::new(TranslationStats::default())),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_rate_limit_delay(mut self, delay: Duration) -> Self {
        self.rate_limit_delay = delay;
        self
    }

    pub fn with_cache(mut self, cache: TranslationCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn stats(&self) -> TranslationStats {
        self.stats.lock().clone()
    }

    /// Check that the provider is reachable
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        self.provider.test_connection().await
    }

    /// Send a prompt with retries; an empty answer counts as a failure
    pub async fn ask(&self, prompt: &str) -> Result<String, TranslationError> {
        let attempts = self.retry.max_attempts();
        let mut last_error: Option<TranslationError> = None;
        let mut attempts_made = 0;

        for attempt in 1..=attempts {
            attempts_made = attempt;
            if attempt > 1 {
                let delay = self.retry.backoff_for(attempt - 1);
                debug!(
                    "Retrying {} request in {:?} (attempt {}/{})",
                    self.provider.name(),
                    delay,
                    attempt,
                    attempts
                );
                self.stats.lock().retries += 1;
                tokio::time::sleep(delay).await;
            } else if !self.rate_limit_delay.is_zero() {
                tokio::time::sleep(self.rate_limit_delay).await;
            }

            let started = Instant::now();
            let result = self.provider.ask(prompt).await;
            {
                let mut stats = self.stats.lock();
                stats.requests += 1;
                stats.api_duration += started.elapsed();
            }

            match result {
                Ok(raw) => {
                    let cleaned = prompts::clean_response(&raw);
                    if !cleaned.is_empty() {
                        return Ok(cleaned);
                    }
                    warn!(
                        "{} returned an empty answer (attempt {}/{})",
                        self.provider.name(),
                        attempt,
                        attempts
                    );
                    last_error = Some(TranslationError::EmptyResponse);
                }
                Err(e) => {
                    warn!(
                        "{} request failed (attempt {}/{}): {}",
                        self.provider.name(),
                        attempt,
                        attempts,
                        e
                    );
                    let retryable = e.is_retryable();
                    last_error = Some(TranslationError::Provider(e));
                    if !retryable {
                        break;
                    }
                }
            }
        }

        self.stats.lock().failures += 1;
        Err(TranslationError::RetriesExhausted {
            attempts: attempts_made,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempt was made".to_string()),
        })
    }

    /// Translate one block of text.
    ///
    /// Whitespace-only input is returned unchanged without calling the
    /// provider. With `context`, the prompt asks the model to keep names,
    /// dates, numbers and formulas verbatim.
    pub async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        context: Option<&str>,
    ) -> Result<String, TranslationError> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        if let Some(cached) = self.cache.get(text, source_language, target_language, context) {
            return Ok(cached);
        }

        let prompt = prompts::translate_prompt(text, source_language, target_language, context);
        let translated = self.ask(&prompt).await?;
        self.cache
            .store(text, source_language, target_language, context, &translated);
        Ok(translated)
    }

    /// Summarize one chunk of text
    pub async fn summarize(&self, chunk: &str) -> Result<String, TranslationError> {
        self.ask(&prompts::summarize_prompt(chunk)).await
    }
}
