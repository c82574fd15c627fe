//! Tokenizer abstraction used to size and split documents into model-sized windows.
//!
//! The pipeline only needs two operations from a vocabulary: turn text into token ids and turn
//! a contiguous run of ids back into text. [`TiktokenTokenizer`] provides both from the BPE
//! tables bundled with `tiktoken-rs`; the default `r50k_base` table is the GPT-2 byte-level
//! vocabulary that BART-family summarizers were trained with.

use anyhow::Error as BpeError;
use thiserror::Error;
use tiktoken_rs::{
    CoreBPE, Rank, cl100k_base, get_bpe_from_model, o200k_base, p50k_base, p50k_edit, r50k_base,
};

/// Opaque integer unit produced by a tokenizer vocabulary.
pub type TokenId = u32;

/// Errors raised while encoding or decoding text.
#[derive(Debug, Error)]
pub enum TokenizerError {
    /// Neither a model nor an encoding with the given name is known.
    #[error("unknown tokenizer encoding '{0}'")]
    UnknownEncoding(String),
    /// Loading the BPE tables failed.
    #[error("failed to load tokenizer '{name}': {source}")]
    Load {
        /// Model or encoding we attempted to load.
        name: String,
        /// Underlying error raised by the tokenizer library.
        #[source]
        source: BpeError,
    },
    /// Text could not be encoded.
    #[error("failed to encode text: {0}")]
    Encode(String),
    /// Token ids could not be decoded back into UTF-8 text.
    #[error("failed to decode tokens: {0}")]
    Decode(String),
}

/// Encode/decode contract consumed by the chunker and the chunk summarizer.
///
/// Implementations must be read-only: a single instance is shared by every concurrent pipeline
/// invocation.
pub trait Tokenizer: Send + Sync {
    /// Encode text into token ids.
    fn encode(&self, text: &str) -> Result<Vec<TokenId>, TokenizerError>;

    /// Decode a contiguous run of token ids back into text.
    fn decode(&self, tokens: &[TokenId]) -> Result<String, TokenizerError>;
}

/// BPE tokenizer backed by `tiktoken-rs`.
pub struct TiktokenTokenizer {
    name: String,
    bpe: CoreBPE,
}

impl TiktokenTokenizer {
    /// Resolve a tokenizer by model name first, then by encoding name.
    pub fn from_name(name: &str) -> Result<Self, TokenizerError> {
        let normalized = name.trim();
        let target = if normalized.is_empty() {
            "r50k_base"
        } else {
            normalized
        };
        let bpe = resolve_encoding(target)?;
        tracing::debug!(tokenizer = target, "Loaded BPE tokenizer");
        Ok(Self {
            name: target.to_string(),
            bpe,
        })
    }

    /// Name the tokenizer was resolved from.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for TiktokenTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiktokenTokenizer")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<TokenId>, TokenizerError> {
        Ok(self
            .bpe
            .encode_ordinary(text)
            .into_iter()
            .map(|token| token as TokenId)
            .collect())
    }

    /// Byte-level BPE windows may start or end inside a multi-byte character; those partial
    /// sequences decode to U+FFFD instead of failing. Ids outside the vocabulary are rejected.
    fn decode(&self, tokens: &[TokenId]) -> Result<String, TokenizerError> {
        let ranks: Vec<Rank> = tokens.iter().map(|&token| token as Rank).collect();
        match self.bpe.decode(ranks.clone()) {
            Ok(text) => Ok(text),
            // tiktoken reports invalid UTF-8 as a formatted message and unknown ids as a typed
            // key error; only the former is recoverable.
            Err(error) if error.downcast_ref::<String>().is_some() => {
                let bytes: Vec<u8> = self.bpe._decode_native_and_split(ranks).flatten().collect();
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            Err(error) => Err(TokenizerError::Decode(error.to_string())),
        }
    }
}

fn resolve_encoding(name: &str) -> Result<CoreBPE, TokenizerError> {
    match get_bpe_from_model(name) {
        Ok(encoding) => Ok(encoding),
        Err(model_err) => {
            tracing::debug!(
                tokenizer = name,
                error = %model_err,
                "Tokenizer model lookup failed; trying encoding name"
            );
            let candidate = encoding_from_name(name)
                .ok_or_else(|| TokenizerError::UnknownEncoding(name.to_string()))?;
            candidate.map_err(|source| TokenizerError::Load {
                name: name.to_string(),
                source,
            })
        }
    }
}

fn encoding_from_name(name: &str) -> Option<Result<CoreBPE, BpeError>> {
    match name {
        "cl100k_base" => Some(cl100k_base()),
        "o200k_base" => Some(o200k_base()),
        "p50k_base" => Some(p50k_base()),
        "p50k_edit" => Some(p50k_edit()),
        "r50k_base" | "gpt2" => Some(r50k_base()),
        _ => None,
    }
}
