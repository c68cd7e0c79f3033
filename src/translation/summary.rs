/*!
 * Whole-document summarization.
 *
 * The document text is cut into chunks on paragraph boundaries, each chunk is
 * summarized, and when there is more than one chunk the joined partial
 * summaries are summarized once more. The result is passed to block
 * translation as context.
 */

use log::{debug, info};

use super::core::TranslationService;
use crate::errors::TranslationError;

/// Summarizes long documents through a translation service's provider
#[derive(Debug, Clone)]
pub struct DocumentSummarizer {
    service: TranslationService,
    chunk_chars: usize,
}

impl DocumentSummarizer {
    pub fn new(service: TranslationService, chunk_chars: usize) -> Self {
        Self {
            service,
            chunk_chars: chunk_chars.max(1),
        }
    }

    /// Summarize the whole text. Blank text yields an empty summary without
    /// calling the provider.
    pub async fn summarize(&self, text: &str) -> Result<String, TranslationError> {
        let chunks = split_into_chunks(text, self.chunk_chars);
        if chunks.is_empty() {
            return Ok(String::new());
        }
        info!("Summarizing document in {} chunk(s)", chunks.len());
        self.summarize_chunks(&chunks).await
    }

    /// Summarize pre-split chunks
    pub async fn summarize_chunks(&self, chunks: &[String]) -> Result<String, TranslationError> {
        let mut partials = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.iter().enumerate() {
            let summary = self.service.summarize(chunk).await?;
            debug!("Chunk {}/{} summarized to {} chars", index + 1, chunks.len(), summary.len());
            partials.push(summary);
        }

        if partials.len() == 1 {
            return Ok(partials.remove(0));
        }
        self.service.summarize(&partials.join("\n")).await
    }
}

/// Split text into chunks of at most `max_chars` characters.
///
/// Paragraphs (blank-line separated) are kept whole when they fit; longer
/// paragraphs are cut at the last whitespace before the limit, or at the
/// limit itself when a single word is longer.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let paragraph_len = paragraph.chars().count();
        let separator = if current.is_empty() { 0 } else { 2 };

        if current_len + separator + paragraph_len <= max_chars {
            if separator > 0 {
                current.push_str("\n\n");
            }
            current.push_str(paragraph);
            current_len += separator + paragraph_len;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if paragraph_len <= max_chars {
            current.push_str(paragraph);
            current_len = paragraph_len;
        } else {
            chunks.extend(split_long_paragraph(paragraph, max_chars));
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn split_long_paragraph(paragraph: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = paragraph.chars().collect();
    let mut pieces = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let hard_end = (start + max_chars).min(chars.len());
        let end = if hard_end == chars.len() {
            hard_end
        } else {
            chars[start..hard_end]
                .iter()
                .rposition(|c| c.is_whitespace())
                .filter(|&p| p > 0)
                .map(|p| start + p)
                .unwrap_or(hard_end)
        };
        let piece: String = chars[start..end].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }
        start = end;
        while start < chars.len() && chars[start].is_whitespace() {
            start += 1;
        }
    }
    pieces
}
