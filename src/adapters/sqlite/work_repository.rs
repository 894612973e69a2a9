//! SQLite implementation of the WorkRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::adapters::sqlite::parse_datetime;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Chunk, EraLabel, Work};
use crate::domain::ports::WorkRepository;

/// SQLite-backed works and chunks.
#[derive(Clone)]
pub struct SqliteWorkRepository {
    pool: SqlitePool,
}

impl SqliteWorkRepository {
    /// Repository over a migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkRepository for SqliteWorkRepository {
    async fn upsert_work(&self, work: &Work) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO works (id, title, author, full_text, era, word_count, total_chunks, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                   title = excluded.title,
                   author = excluded.author,
                   full_text = excluded.full_text,
                   era = excluded.era,
                   word_count = excluded.word_count,
                   total_chunks = excluded.total_chunks,
                   updated_at = excluded.updated_at"#,
        )
        .bind(&work.id)
        .bind(&work.title)
        .bind(&work.author)
        .bind(&work.full_text)
        .bind(work.era.as_str())
        .bind(work.word_count as i64)
        .bind(work.total_chunks as i64)
        .bind(work.created_at.to_rfc3339())
        .bind(work.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_work(&self, id: &str) -> DomainResult<Option<Work>> {
        let row: Option<WorkRow> = sqlx::query_as(
            "SELECT id, title, author, full_text, era, word_count, total_chunks, created_at, updated_at FROM works WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_works(&self) -> DomainResult<Vec<Work>> {
        let rows: Vec<WorkRow> = sqlx::query_as(
            "SELECT id, title, author, full_text, era, word_count, total_chunks, created_at, updated_at FROM works ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn replace_chunks(&self, work_id: &str, chunks: &[Chunk]) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE work_id = ?")
            .bind(work_id)
            .execute(&mut *tx)
            .await?;

        for chunk in chunks {
            sqlx::query(
                "INSERT INTO chunks (work_id, chunk_index, text, word_count) VALUES (?, ?, ?, ?)",
            )
            .bind(work_id)
            .bind(chunk.chunk_index as i64)
            .bind(&chunk.text)
            .bind(chunk.word_count as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_chunks(&self, work_id: &str) -> DomainResult<Vec<Chunk>> {
        let rows: Vec<ChunkRow> = sqlx::query_as(
            "SELECT work_id, chunk_index, text, word_count FROM chunks WHERE work_id = ? ORDER BY chunk_index",
        )
        .bind(work_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| Chunk::new(r.work_id, r.chunk_index as usize, r.text, r.word_count as usize))
            .collect())
    }
}

#[derive(sqlx::FromRow)]
struct WorkRow {
    id: String,
    title: String,
    author: String,
    full_text: String,
    era: String,
    word_count: i64,
    total_chunks: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<WorkRow> for Work {
    type Error = DomainError;

    fn try_from(row: WorkRow) -> Result<Self, Self::Error> {
        let era = EraLabel::from_str(&row.era)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid era: {}", row.era)))?;

        Ok(Work {
            id: row.id,
            title: row.title,
            author: row.author,
            full_text: row.full_text,
            era,
            word_count: row.word_count as usize,
            total_chunks: row.total_chunks as usize,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ChunkRow {
    work_id: String,
    chunk_index: i64,
    text: String,
    word_count: i64,
}
