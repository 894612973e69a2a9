//! Work and chunk storage port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Chunk, Work};

/// Repository port for ingested works and their chunks.
#[async_trait]
pub trait WorkRepository: Send + Sync {
    /// Insert or replace a work by id
    async fn upsert_work(&self, work: &Work) -> DomainResult<()>;

    /// Get a work by id
    async fn get_work(&self, id: &str) -> DomainResult<Option<Work>>;

    /// List all works ordered by id
    async fn list_works(&self) -> DomainResult<Vec<Work>>;

    /// Replace every chunk of a work with the given set
    async fn replace_chunks(&self, work_id: &str, chunks: &[Chunk]) -> DomainResult<()>;

    /// Chunks of a work in index order
    async fn get_chunks(&self, work_id: &str) -> DomainResult<Vec<Chunk>>;
}
