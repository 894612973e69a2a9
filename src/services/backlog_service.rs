//! Store-backed coverage queries and run planning.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{BacklogItem, CefrLevel, Chunk, CoverageSummary, SimplificationRecord, Work, WorkItem};
use crate::domain::ports::{SimplificationRepository, WorkRepository};
use crate::services::coverage_tracker::{
    compute_backlog_for_levels, coverage_summary, CoveragePolicy,
};

/// Loads works and records and applies the coverage rules to them.
pub struct BacklogService {
    works: Arc<dyn WorkRepository>,
    store: Arc<dyn SimplificationRepository>,
    policy: CoveragePolicy,
}

impl BacklogService {
    /// Service over the given repositories, judging records with `policy`.
    pub fn new(
        works: Arc<dyn WorkRepository>,
        store: Arc<dyn SimplificationRepository>,
        policy: CoveragePolicy,
    ) -> Self {
        Self {
            works,
            store,
            policy,
        }
    }

    /// Validity rules in force.
    pub fn policy(&self) -> &CoveragePolicy {
        &self.policy
    }

    async fn require_work(&self, work_id: &str) -> DomainResult<Work> {
        self.works
            .get_work(work_id)
            .await?
            .ok_or_else(|| DomainError::WorkNotFound(work_id.to_string()))
    }

    /// Current chunks and stored records of a work.
    async fn load_state(&self, work_id: &str) -> DomainResult<(Vec<Chunk>, Vec<SimplificationRecord>)> {
        let chunks = self.works.get_chunks(work_id).await?;
        let records = self.store.list_by_work(work_id).await?;
        Ok((chunks, records))
    }

    /// Coverage of one work.
    pub async fn coverage(&self, work_id: &str) -> DomainResult<CoverageSummary> {
        let work = self.require_work(work_id).await?;
        let (chunks, records) = self.load_state(work_id).await?;
        Ok(coverage_summary(&work, &chunks, &records, &self.policy))
    }

    /// Coverage of every stored work, ordered by work id.
    pub async fn coverage_all(&self) -> DomainResult<Vec<CoverageSummary>> {
        let mut summaries = Vec::new();
        for work in self.works.list_works().await? {
            let (chunks, records) = self.load_state(&work.id).await?;
            summaries.push(coverage_summary(&work, &chunks, &records, &self.policy));
        }
        Ok(summaries)
    }

    /// Backlog of one work for `levels`.
    pub async fn backlog(&self, work_id: &str, levels: &[CefrLevel]) -> DomainResult<Vec<BacklogItem>> {
        let work = self.require_work(work_id).await?;
        let (chunks, records) = self.load_state(work_id).await?;
        Ok(compute_backlog_for_levels(&work, &chunks, &records, &self.policy, levels))
    }

    /// Work items for the given works (all works when empty), capped at `limit`.
    ///
    /// Items keep backlog order: works by id, then chunk index, then level.
    pub async fn plan(
        &self,
        work_ids: &[String],
        levels: &[CefrLevel],
        limit: Option<usize>,
    ) -> DomainResult<Vec<WorkItem>> {
        let works = if work_ids.is_empty() {
            self.works.list_works().await?
        } else {
            let mut works = Vec::with_capacity(work_ids.len());
            for id in work_ids {
                works.push(self.require_work(id).await?);
            }
            works
        };

        let mut items = Vec::new();
        for work in works {
            let remaining = limit.map(|l| l.saturating_sub(items.len()));
            if remaining == Some(0) {
                break;
            }

            let (chunks, records) = self.load_state(&work.id).await?;
            let backlog = compute_backlog_for_levels(&work, &chunks, &records, &self.policy, levels);
            if backlog.is_empty() {
                continue;
            }

            let chunks: HashMap<usize, String> =
                chunks.into_iter().map(|c| (c.chunk_index, c.text)).collect();

            let take = remaining.unwrap_or(usize::MAX);
            for entry in backlog.into_iter().take(take) {
                let Some(text) = chunks.get(&entry.key.chunk_index) else {
                    return Err(DomainError::ValidationFailed(format!(
                        "chunk {} of work {} is missing; re-ingest the work",
                        entry.key.chunk_index, work.id
                    )));
                };
                items.push(WorkItem {
                    key: entry.key,
                    era: work.era,
                    original_text: text.clone(),
                });
            }
            debug!(work_id = %work.id, planned = items.len(), "Planned backlog");
        }

        Ok(items)
    }
}
