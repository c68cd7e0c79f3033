/*!
 * Translation of text blocks through a language model provider.
 *
 * - `core`: the service with retry, backoff and caching
 * - `cache`: in-memory cache of block translations
 * - `prompts`: prompt templates and response clean-up
 * - `summary`: whole-document summarization used as translation context
 */

pub use self::core::{RetryPolicy, TranslationService, TranslationStats};
pub use self::summary::DocumentSummarizer;

pub mod cache;
pub mod core;
pub mod prompts;
pub mod summary;
