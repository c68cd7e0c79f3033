/*!
 * Error types for the yaptwai application.
 *
 * Every layer gets its own thiserror enum: provider transport failures,
 * PDF object-model failures, translation failures after retries, and the
 * application error that wraps them all for the CLI.
 */

use thiserror::Error;

use crate::pdf::geometry::BoundingBox;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Client-side mistakes will not get better by asking again
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::AuthenticationError(_) => false,
            Self::ApiError { status_code, .. } => *status_code >= 500 || *status_code == 408,
            _ => true,
        }
    }
}

/// Errors raised while reading, editing or writing a PDF
#[derive(Error, Debug)]
pub enum PdfError {
    /// The bytes could not be parsed as a PDF
    #[error("Failed to load PDF: {0}")]
    Load(String),

    /// The requested page range does not fit the document
    #[error("Invalid page range {start}-{end} for a document with {total} pages")]
    InvalidRange { start: u32, end: u32, total: u32 },

    /// A page could not be segmented into blocks
    #[error("Failed to extract text blocks from page {page}: {reason}")]
    Extraction { page: u32, reason: String },

    /// Text removal failed for a whole page or for a single box
    #[error("Redaction failed on page {page}{}: {reason}", block_suffix(.block))]
    Redaction {
        page: u32,
        block: Option<usize>,
        reason: String,
    },

    /// Translated text could not be written back into its box
    #[error("Text insertion failed on page {page}, block {block}: {reason}")]
    Insertion {
        page: u32,
        block: usize,
        reason: String,
    },

    /// The substitute font could not be loaded or embedded
    #[error("Font embedding failed for {path}: {reason}")]
    FontEmbedding { path: String, reason: String },

    /// Serializing the document failed
    #[error("Failed to save PDF: {0}")]
    Save(String),
}

fn block_suffix(block: &Option<usize>) -> String {
    block.map(|b| format!(", block {}", b)).unwrap_or_default()
}

impl From<lopdf::Error> for PdfError {
    fn from(error: lopdf::Error) -> Self {
        Self::Load(error.to_string())
    }
}

/// Errors that can occur during translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The model answered with nothing usable
    #[error("Provider returned an empty translation")]
    EmptyResponse,

    /// Every attempt failed
    #[error("Translation failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

/// Which stage a per-block failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Translation,
    Redaction,
    Insertion,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Translation => "translation",
            Self::Redaction => "redaction",
            Self::Insertion => "insertion",
        };
        write!(f, "{}", name)
    }
}

/// A recoverable failure attached to one block of one page
#[derive(Debug, Clone)]
pub struct BlockFailure {
    /// Page number in the input document (1-based)
    pub page: u32,
    /// Index of the block within its page
    pub block: usize,
    pub bbox: BoundingBox,
    pub kind: FailureKind,
    pub reason: String,
}

impl std::fmt::Display for BlockFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "page {} block {} [{:.1}, {:.1}, {:.1}, {:.1}] {} failed: {}",
            self.page,
            self.block,
            self.bbox.x0,
            self.bbox.y0,
            self.bbox.x1,
            self.bbox.y1,
            self.kind,
            self.reason
        )
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the PDF layer
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Invalid settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller-level deadline elapsed
    #[error("Run aborted after {0} seconds")]
    Timeout(u64),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
