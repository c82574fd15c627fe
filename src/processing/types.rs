//! Core data types and error definitions for the summarization pipeline.

use crate::summarization::SummarizationClientError;
use crate::tokenizer::{TokenId, TokenizerError};
use thiserror::Error;

/// Errors produced while reading text out of a PDF.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Bytes could not be parsed as a PDF document.
    #[error("failed to load PDF: {0}")]
    Load(String),
    /// Document is encrypted; text streams are not readable.
    #[error("PDF is encrypted")]
    Encrypted,
    /// A page's content stream could not be decoded.
    #[error("failed to extract text from page {page}: {message}")]
    Page {
        /// One-based page number.
        page: u32,
        /// Reader diagnostic.
        message: String,
    },
    /// Document contains no extractable text.
    #[error("no text extracted from PDF")]
    Empty,
    /// Source file could not be read.
    #[error("failed to read PDF: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors produced while turning text into token windows.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Caller requested an impossible token budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Tokenizer failed to encode or decode.
    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),
}

/// Errors emitted by the summarization pipeline.
///
/// Every stage propagates its failure unchanged; no partial summary survives an error.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Text extraction failed.
    #[error("Failed to extract text: {0}")]
    Extraction(#[from] ExtractionError),
    /// Tokenization or windowing failed.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// The summarization model failed on one chunk.
    #[error("Failed to summarize chunk {chunk}: {source}")]
    Summarization {
        /// Zero-based index of the failing chunk.
        chunk: usize,
        /// Provider error.
        #[source]
        source: SummarizationClientError,
    },
    /// A blocking extraction or tokenization task panicked or was cancelled.
    #[error("Processing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<TokenizerError> for ProcessingError {
    fn from(error: TokenizerError) -> Self {
        Self::Chunking(ChunkingError::Tokenizer(error))
    }
}

/// Text extracted from a PDF, one entry per page in page order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// Per-page text with trailing whitespace removed.
    pub pages: Vec<String>,
}

impl ExtractedDocument {
    /// Number of pages read from the document.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Concatenate page text in page order, one newline between pages.
    pub fn text(&self) -> String {
        self.pages.join("\n")
    }
}

/// A contiguous window of at most `chunk_size` tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Zero-based position within the document.
    pub index: usize,
    /// Token ids covered by this chunk.
    pub tokens: Vec<TokenId>,
    /// The tokens decoded back into text.
    pub text: String,
}

/// Result of a successful pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOutcome {
    /// Final summary: chunk summaries in order, space-joined and trimmed.
    pub summary: String,
    /// Number of chunks summarized.
    pub chunk_count: usize,
    /// Chunk size used for this run.
    pub chunk_size: usize,
    /// Token count of the full document text.
    pub token_count: usize,
    /// Page count, when the input was a PDF.
    pub page_count: Option<usize>,
}

/// A labelled sentence derived from the final summary.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct KeyPoint {
    /// Display label such as `Key Point 1`.
    pub label: String,
    /// Sentence text.
    pub text: String,
}
