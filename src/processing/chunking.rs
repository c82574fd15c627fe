//! Token-window chunking.
//!
//! The whole document is encoded once and the resulting token stream is cut into fixed-size,
//! contiguous, non-overlapping windows. Every token lands in exactly one chunk, chunk order
//! follows token order, and only the final chunk may be shorter than `chunk_size`. Each window
//! is decoded back into text with the same tokenizer so that it can be handed to the model.

use super::types::{Chunk, ChunkingError};
use crate::tokenizer::{TokenId, Tokenizer};

/// Number of chunks a stream of `token_count` tokens splits into.
pub fn expected_chunk_count(token_count: usize, chunk_size: usize) -> usize {
    if chunk_size == 0 {
        return 0;
    }
    token_count.div_ceil(chunk_size)
}

/// Split a token stream into contiguous windows of at most `chunk_size` tokens.
pub fn token_windows(
    tokens: &[TokenId],
    chunk_size: usize,
) -> Result<Vec<&[TokenId]>, ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    Ok(tokens.chunks(chunk_size).collect())
}

/// Encode `text`, window the tokens, and decode each window.
///
/// Returns an empty vector when the text encodes to zero tokens.
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    tokenizer: &dyn Tokenizer,
) -> Result<Vec<Chunk>, ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    let tokens = tokenizer.encode(text)?;
    chunk_tokens(&tokens, chunk_size, tokenizer)
}

/// Window an already-encoded token stream and decode each window.
pub fn chunk_tokens(
    tokens: &[TokenId],
    chunk_size: usize,
    tokenizer: &dyn Tokenizer,
) -> Result<Vec<Chunk>, ChunkingError> {
    let windows = token_windows(tokens, chunk_size)?;
    let mut chunks = Vec::with_capacity(windows.len());
    for (index, window) in windows.into_iter().enumerate() {
        let text = tokenizer.decode(window)?;
        chunks.push(Chunk {
            index,
            tokens: window.to_vec(),
            text,
        });
    }
    debug_assert_eq!(chunks.len(), expected_chunk_count(tokens.len(), chunk_size));
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::TiktokenTokenizer;
    use crate::tokenizer::test_support::CharTokenizer;

    fn rejoined_tokens(chunks: &[Chunk]) -> Vec<TokenId> {
        chunks
            .iter()
            .flat_map(|chunk| chunk.tokens.iter().copied())
            .collect()
    }

    #[test]
    fn chunks_partition_the_token_stream() {
        let text = "Glucose, insulin, and HbA1c were measured at every visit.";
        let tokenizer = CharTokenizer;
        let tokens = tokenizer.encode(text).unwrap();

        for chunk_size in [1, 2, 3, 7, 10, tokens.len() - 1, tokens.len(), tokens.len() + 5] {
            let chunks = chunk_text(text, chunk_size, &tokenizer).expect("chunks");
            assert_eq!(chunks.len(), tokens.len().div_ceil(chunk_size));
            assert!(chunks.iter().all(|chunk| chunk.tokens.len() <= chunk_size));
            assert_eq!(rejoined_tokens(&chunks), tokens);
            for (position, chunk) in chunks.iter().enumerate() {
                assert_eq!(chunk.index, position);
            }
        }
    }

    #[test]
    fn exact_multiple_yields_single_chunk() {
        let chunks = chunk_text("abcd", 4, &CharTokenizer).expect("chunks");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "abcd");
    }

    #[test]
    fn one_token_over_yields_one_token_tail() {
        let chunks = chunk_text("abcde", 4, &CharTokenizer).expect("chunks");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].tokens.len(), 4);
        assert_eq!(chunks[1].tokens.len(), 1);
        assert_eq!(chunks[1].text, "e");
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("", 8, &CharTokenizer).expect("chunks").is_empty());
        assert_eq!(expected_chunk_count(0, 8), 0);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let error = chunk_text("hello", 0, &CharTokenizer).unwrap_err();
        assert!(matches!(error, ChunkingError::InvalidChunkSize));
        assert!(matches!(
            token_windows(&[1, 2, 3], 0),
            Err(ChunkingError::InvalidChunkSize)
        ));
    }

    #[test]
    fn multibyte_text_chunks_at_every_size() {
        let tokenizer = TiktokenTokenizer::from_name("r50k_base").expect("tokenizer");
        let text = "Fasting glucose ≥ 126 mg/dL in 20 µL samples at 37 °C ± 0.5. 患者の血糖値";
        let tokens = tokenizer.encode(text).expect("encode");

        for chunk_size in 1..=tokens.len() {
            let chunks = chunk_text(text, chunk_size, &tokenizer)
                .unwrap_or_else(|error| panic!("chunk size {chunk_size}: {error}"));
            assert_eq!(chunks.len(), tokens.len().div_ceil(chunk_size));
            assert!(chunks.iter().all(|chunk| chunk.tokens.len() <= chunk_size));
            assert_eq!(rejoined_tokens(&chunks), tokens);
            assert!(chunks.iter().all(|chunk| !chunk.text.is_empty()));
        }

        let whole = chunk_text(text, tokens.len(), &tokenizer).expect("chunks");
        assert_eq!(whole[0].text, text);
    }

    #[test]
    fn bpe_chunks_respect_budget_and_decode() {
        let tokenizer = TiktokenTokenizer::from_name("r50k_base").expect("tokenizer");
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(20);
        let tokens = tokenizer.encode(&text).expect("encode");

        let chunks = chunk_text(&text, 16, &tokenizer).expect("chunks");
        assert_eq!(chunks.len(), expected_chunk_count(tokens.len(), 16));
        assert_eq!(rejoined_tokens(&chunks), tokens);

        let decoded: String = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
        assert_eq!(decoded, text);
    }
}
