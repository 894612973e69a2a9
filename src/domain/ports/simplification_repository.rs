//! Result store port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{CefrLevel, FailureRecord, NaturalKey, RunReport, SimplificationRecord};

/// Result store port: durable records addressable by natural key.
///
/// All writes are single-key upserts; readers outside the pipeline only ever
/// see accepted records.
#[async_trait]
pub trait SimplificationRepository: Send + Sync {
    /// Insert or overwrite the record at its natural key
    async fn upsert(&self, record: &SimplificationRecord) -> DomainResult<()>;

    /// Point lookup by natural key
    async fn get(&self, key: &NaturalKey) -> DomainResult<Option<SimplificationRecord>>;

    /// Every record of a work ordered by chunk index then level
    async fn list_by_work(&self, work_id: &str) -> DomainResult<Vec<SimplificationRecord>>;

    /// Delete records of a work, optionally narrowed by level and chunk; returns rows removed
    async fn invalidate(
        &self,
        work_id: &str,
        level: Option<CefrLevel>,
        chunk_index: Option<usize>,
    ) -> DomainResult<u64>;

    /// Delete records whose chunk index is at or beyond `total_chunks`
    async fn purge_orphans(&self, work_id: &str, total_chunks: usize) -> DomainResult<u64>;

    /// Record or refresh the failure entry for a key
    async fn record_failure(&self, failure: &FailureRecord) -> DomainResult<()>;

    /// Drop the failure entry for a key once it is accepted
    async fn clear_failure(&self, key: &NaturalKey) -> DomainResult<()>;

    /// Failure entries, optionally for one work
    async fn list_failures(&self, work_id: Option<&str>) -> DomainResult<Vec<FailureRecord>>;

    /// Persist a finished run report
    async fn save_run(&self, report: &RunReport) -> DomainResult<()>;

    /// Most recent run reports, newest first
    async fn list_runs(&self, limit: usize) -> DomainResult<Vec<RunReport>>;
}
