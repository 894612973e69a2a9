//! Source works and their chunks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::era::EraLabel;

/// A source text ingested once from an external content provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Work {
    /// Stable identifier supplied by the content provider
    pub id: String,
    /// Display title
    pub title: String,
    /// Display author
    pub author: String,
    /// Whole source text as ingested
    pub full_text: String,
    /// Era detected from a prefix sample at ingestion
    pub era: EraLabel,
    /// Whitespace-delimited word count
    pub word_count: usize,
    /// Number of chunks produced by the chunker; chunk indices are `0..total_chunks`
    pub total_chunks: usize,
    /// First ingestion time
    pub created_at: DateTime<Utc>,
    /// Last (re-)ingestion time
    pub updated_at: DateTime<Utc>,
}

impl Work {
    /// Number of (level, chunk) slots this work must fill.
    pub fn expected_slots(&self) -> usize {
        self.total_chunks * super::CefrLevel::ALL.len()
    }
}

/// An ordered slice of a work's text; the atomic unit of transformation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Owning work
    pub work_id: String,
    /// Dense 0-based position within the work
    pub chunk_index: usize,
    /// Chunk text with whitespace normalized
    pub text: String,
    /// Words in this chunk
    pub word_count: usize,
}

impl Chunk {
    /// Build a chunk of `work_id`.
    pub fn new(work_id: impl Into<String>, chunk_index: usize, text: String, word_count: usize) -> Self {
        Self {
            work_id: work_id.into(),
            chunk_index,
            text,
            word_count,
        }
    }
}
