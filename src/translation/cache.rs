/*!
 * Translation caching functionality.
 *
 * Running headers, footers and page labels repeat on every page; the cache
 * makes sure each distinct block is sent to the model only once per run.
 */

use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Cache key combining source text, languages and the context in effect
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    source_text: String,
    source_language: String,
    target_language: String,
    /// Fingerprint of the summary passed as context, 0 without one
    context: u64,
}

impl CacheKey {
    fn new(source_text: &str, source_language: &str, target_language: &str, context: Option<&str>) -> Self {
        let context = context
            .map(|c| {
                let mut hasher = DefaultHasher::new();
                c.hash(&mut hasher);
                hasher.finish()
            })
            .unwrap_or(0);
        Self {
            source_text: source_text.to_string(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            context,
        }
    }
}

#[derive(Debug, Default)]
struct CacheStats {
    hits: usize,
    misses: usize,
}

/// Translation cache for storing and retrieving translations
#[derive(Debug, Clone)]
pub struct TranslationCache {
    entries: Arc<RwLock<HashMap<CacheKey, String>>>,
    stats: Arc<RwLock<CacheStats>>,
    enabled: bool,
}

impl TranslationCache {
    /// Create a new translation cache
    pub fn new(enabled: bool) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            stats: Arc::new(RwLock::new(CacheStats::default())),
            enabled,
        }
    }

    /// Get a translation from the cache
    pub fn get(
        &self,
        source_text: &str,
        source_language: &str,
        target_language: &str,
        context: Option<&str>,
    ) -> Option<String> {
        if !self.enabled {
            return None;
        }

        let key = CacheKey::new(source_text, source_language, target_language, context);
        let found = self.entries.read().get(&key).cloned();
        let mut stats = self.stats.write();
        match found {
            Some(translation) => {
                stats.hits += 1;
                debug!("Cache hit for '{}'", truncate_text(source_text, 30));
                Some(translation)
            }
            None => {
                stats.misses += 1;
                None
            }
        }
    }

    /// Store a translation in the cache
    pub fn store(
        &self,
        source_text: &str,
        source_language: &str,
        target_language: &str,
        context: Option<&str>,
        translation: &str,
    ) {
        if !self.enabled {
            return;
        }

        let key = CacheKey::new(source_text, source_language, target_language, context);
        self.entries.write().insert(key, translation.to_string());
    }

    /// Get cache statistics as (hits, misses, hit rate)
    pub fn stats(&self) -> (usize, usize, f64) {
        let stats = self.stats.read();
        let total = stats.hits + stats.misses;
        let hit_rate = if total > 0 {
            stats.hits as f64 / total as f64
        } else {
            0.0
        };
        (stats.hits, stats.misses, hit_rate)
    }

    /// Clear entries and statistics
    pub fn clear(&self) {
        self.entries.write().clear();
        *self.stats.write() = CacheStats::default();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Truncate text to a maximum number of characters with ellipsis
fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    }
}
