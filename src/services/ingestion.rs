//! Work ingestion: era detection, chunking, and orphan cleanup.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{EraLabel, Work};
use crate::domain::ports::{EraClassifier, SimplificationRepository, WorkRepository};
use crate::services::chunker::WordWindowChunker;
use crate::services::coverage_tracker::is_stale;
use crate::services::text::{sample_prefix, word_count};

/// A source text handed over by the content provider.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    /// Stable identifier; re-ingesting the same id replaces the work
    pub id: String,
    /// Display title
    pub title: String,
    /// Display author
    pub author: String,
    /// Full source text
    pub text: String,
    /// Skip classification and use this era
    pub era_override: Option<EraLabel>,
}

/// Result of ingesting one work.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    /// The stored work
    pub work: Work,
    /// Whether the work existed before this call
    pub replaced: bool,
    /// Records dropped because their chunk index no longer exists
    pub purged_records: u64,
    /// Records dropped because their chunk now holds different text
    pub stale_records: u64,
}

/// Stores works and their chunks, classifying era once per work.
pub struct IngestionService {
    works: Arc<dyn WorkRepository>,
    store: Arc<dyn SimplificationRepository>,
    classifier: Arc<dyn EraClassifier>,
    chunker: WordWindowChunker,
    sample_chars: usize,
}

impl IngestionService {
    /// Ingestion over the given repositories.
    ///
    /// Only the first `sample_chars` characters are read by `classifier`.
    pub fn new(
        works: Arc<dyn WorkRepository>,
        store: Arc<dyn SimplificationRepository>,
        classifier: Arc<dyn EraClassifier>,
        chunker: WordWindowChunker,
        sample_chars: usize,
    ) -> Self {
        Self {
            works,
            store,
            classifier,
            chunker,
            sample_chars,
        }
    }

    /// Insert or replace a work and its chunks.
    ///
    /// Re-ingesting with different text re-chunks the work; any stored
    /// simplification whose chunk index is now out of range, or whose
    /// source snapshot differs from the new chunk text, is deleted.
    #[instrument(skip(self, request), fields(work_id = %request.id))]
    pub async fn ingest(&self, request: IngestRequest) -> DomainResult<IngestOutcome> {
        if request.id.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "work id must not be empty".to_string(),
            ));
        }

        let existing = self.works.get_work(&request.id).await?;
        let era = request.era_override.unwrap_or_else(|| {
            self.classifier
                .classify(sample_prefix(&request.text, self.sample_chars))
        });
        let chunks = self.chunker.chunk(&request.id, &request.text);
        let now = Utc::now();

        let work = Work {
            id: request.id,
            title: request.title,
            author: request.author,
            word_count: word_count(&request.text),
            full_text: request.text,
            era,
            total_chunks: chunks.len(),
            created_at: existing.as_ref().map_or(now, |w| w.created_at),
            updated_at: now,
        };

        self.works.upsert_work(&work).await?;
        self.works.replace_chunks(&work.id, &chunks).await?;
        let purged_records = self.store.purge_orphans(&work.id, work.total_chunks).await?;
        let stale_records = if existing.is_some() {
            let texts: HashMap<usize, &str> =
                chunks.iter().map(|c| (c.chunk_index, c.text.as_str())).collect();
            self.purge_stale(&work.id, &texts).await?
        } else {
            0
        };

        info!(
            era = %work.era,
            chunks = work.total_chunks,
            words = work.word_count,
            purged_records,
            stale_records,
            "Ingested work"
        );

        Ok(IngestOutcome {
            replaced: existing.is_some(),
            work,
            purged_records,
            stale_records,
        })
    }

    async fn purge_stale(&self, work_id: &str, texts: &HashMap<usize, &str>) -> DomainResult<u64> {
        let mut removed = 0;
        for record in self.store.list_by_work(work_id).await? {
            let Some(current) = texts.get(&record.key.chunk_index) else {
                continue;
            };
            if is_stale(&record, current) {
                debug!(key = %record.key, "Dropping record simplified from replaced text");
                removed += self
                    .store
                    .invalidate(work_id, Some(record.key.level), Some(record.key.chunk_index))
                    .await?;
            }
        }
        Ok(removed)
    }
}
