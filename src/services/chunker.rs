//! Word-window chunking of full texts.
//!
//! Splits on whitespace into consecutive windows of a fixed word count and
//! rejoins each window with single spaces. The same text and window size
//! always produce the same chunks, which is what keeps chunk indices stable
//! across re-ingestion.

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Chunk;

/// Fixed-size word window chunker.
#[derive(Debug, Clone, Copy)]
pub struct WordWindowChunker {
    words_per_chunk: usize,
}

impl WordWindowChunker {
    /// Chunker with a window of `words_per_chunk` words. Zero is rejected.
    pub fn new(words_per_chunk: usize) -> DomainResult<Self> {
        if words_per_chunk == 0 {
            return Err(DomainError::ValidationFailed(
                "words_per_chunk must be greater than 0".to_string(),
            ));
        }
        Ok(Self { words_per_chunk })
    }

    /// Window size in words.
    pub fn words_per_chunk(&self) -> usize {
        self.words_per_chunk
    }

    /// Ordered chunks for `text`. Empty or whitespace-only text yields none.
    pub fn chunk(&self, work_id: &str, text: &str) -> Vec<Chunk> {
        let words: Vec<&str> = text.split_whitespace().collect();
        words
            .chunks(self.words_per_chunk)
            .enumerate()
            .map(|(index, window)| Chunk::new(work_id, index, window.join(" "), window.len()))
            .collect()
    }

    /// Number of chunks `text` would produce.
    pub fn count(&self, text: &str) -> usize {
        text.split_whitespace().count().div_ceil(self.words_per_chunk)
    }
}

impl Default for WordWindowChunker {
    fn default() -> Self {
        Self { words_per_chunk: 400 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rejects_zero_window() {
        assert!(WordWindowChunker::new(0).is_err());
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        let chunker = WordWindowChunker::new(3).unwrap();
        assert!(chunker.chunk("w", "").is_empty());
        assert!(chunker.chunk("w", "  \n\t ").is_empty());
        assert_eq!(chunker.count(""), 0);
    }

    #[test]
    fn test_windows_and_short_tail() {
        let chunker = WordWindowChunker::new(3).unwrap();
        let chunks = chunker.chunk("w", "one two  three\nfour five six seven");

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "one two three");
        assert_eq!(chunks[1].text, "four five six");
        assert_eq!(chunks[2].text, "seven");
        assert_eq!(chunks[2].word_count, 1);
        assert_eq!(chunks[2].chunk_index, 2);
        assert!(chunks.iter().all(|c| c.work_id == "w"));
    }

    proptest! {
        #[test]
        fn prop_chunking_is_deterministic_and_lossless(
            words in proptest::collection::vec("[a-z]{1,8}", 0..200),
            size in 1usize..50,
        ) {
            let text = words.join(" ");
            let chunker = WordWindowChunker::new(size).unwrap();

            let first = chunker.chunk("w", &text);
            let second = chunker.chunk("w", &text);
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.len(), chunker.count(&text));

            let rejoined = first.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(" ");
            prop_assert_eq!(rejoined, text);
        }
    }
}
