//! SQLite implementation of the SimplificationRepository (the result store).

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::adapters::sqlite::{parse_datetime, parse_json_or_default};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    CefrLevel, EraLabel, FailureClass, FailureRecord, NaturalKey, RunReport, SimplificationRecord,
};
use crate::domain::ports::SimplificationRepository;

/// SQLite-backed result store, failure ledger and run history.
#[derive(Clone)]
pub struct SqliteSimplificationRepository {
    pool: SqlitePool,
}

impl SqliteSimplificationRepository {
    /// Repository over a migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn parse_level(s: &str) -> DomainResult<CefrLevel> {
    CefrLevel::from_str(s).ok_or_else(|| DomainError::SerializationError(format!("Invalid level: {s}")))
}

#[async_trait]
impl SimplificationRepository for SqliteSimplificationRepository {
    async fn upsert(&self, record: &SimplificationRecord) -> DomainResult<()> {
        let issues_json = serde_json::to_string(&record.preservation_issues)?;

        sqlx::query(
            r#"INSERT INTO simplifications (work_id, level, chunk_index, original_text, simplified_text, quality_score, era, preservation_issues, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(work_id, level, chunk_index) DO UPDATE SET
                   original_text = excluded.original_text,
                   simplified_text = excluded.simplified_text,
                   quality_score = excluded.quality_score,
                   era = excluded.era,
                   preservation_issues = excluded.preservation_issues,
                   created_at = excluded.created_at"#,
        )
        .bind(&record.key.work_id)
        .bind(record.key.level.as_str())
        .bind(record.key.chunk_index as i64)
        .bind(&record.original_text)
        .bind(&record.simplified_text)
        .bind(record.quality_score)
        .bind(record.era.as_str())
        .bind(&issues_json)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, key: &NaturalKey) -> DomainResult<Option<SimplificationRecord>> {
        let row: Option<SimplificationRow> = sqlx::query_as(
            "SELECT work_id, level, chunk_index, original_text, simplified_text, quality_score, era, preservation_issues, created_at FROM simplifications WHERE work_id = ? AND level = ? AND chunk_index = ?",
        )
        .bind(&key.work_id)
        .bind(key.level.as_str())
        .bind(key.chunk_index as i64)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_by_work(&self, work_id: &str) -> DomainResult<Vec<SimplificationRecord>> {
        let rows: Vec<SimplificationRow> = sqlx::query_as(
            "SELECT work_id, level, chunk_index, original_text, simplified_text, quality_score, era, preservation_issues, created_at FROM simplifications WHERE work_id = ? ORDER BY chunk_index, level",
        )
        .bind(work_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn invalidate(
        &self,
        work_id: &str,
        level: Option<CefrLevel>,
        chunk_index: Option<usize>,
    ) -> DomainResult<u64> {
        let mut query = String::from("DELETE FROM simplifications WHERE work_id = ?");
        if level.is_some() {
            query.push_str(" AND level = ?");
        }
        if chunk_index.is_some() {
            query.push_str(" AND chunk_index = ?");
        }

        let mut q = sqlx::query(&query).bind(work_id);
        if let Some(level) = level {
            q = q.bind(level.as_str());
        }
        if let Some(index) = chunk_index {
            q = q.bind(index as i64);
        }

        let result = q.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn purge_orphans(&self, work_id: &str, total_chunks: usize) -> DomainResult<u64> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM simplifications WHERE work_id = ? AND chunk_index >= ?")
            .bind(work_id)
            .bind(total_chunks as i64)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM simplification_failures WHERE work_id = ? AND chunk_index >= ?")
            .bind(work_id)
            .bind(total_chunks as i64)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }

    async fn record_failure(&self, failure: &FailureRecord) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO simplification_failures (work_id, level, chunk_index, attempts, last_error, failure_class, failed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(work_id, level, chunk_index) DO UPDATE SET
                   attempts = excluded.attempts,
                   last_error = excluded.last_error,
                   failure_class = excluded.failure_class,
                   failed_at = excluded.failed_at"#,
        )
        .bind(&failure.key.work_id)
        .bind(failure.key.level.as_str())
        .bind(failure.key.chunk_index as i64)
        .bind(i64::from(failure.attempts))
        .bind(&failure.last_error)
        .bind(failure.failure_class.as_str())
        .bind(failure.failed_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear_failure(&self, key: &NaturalKey) -> DomainResult<()> {
        sqlx::query("DELETE FROM simplification_failures WHERE work_id = ? AND level = ? AND chunk_index = ?")
            .bind(&key.work_id)
            .bind(key.level.as_str())
            .bind(key.chunk_index as i64)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_failures(&self, work_id: Option<&str>) -> DomainResult<Vec<FailureRecord>> {
        let mut query = String::from(
            "SELECT work_id, level, chunk_index, attempts, last_error, failure_class, failed_at FROM simplification_failures",
        );
        if work_id.is_some() {
            query.push_str(" WHERE work_id = ?");
        }
        query.push_str(" ORDER BY work_id, chunk_index, level");

        let mut q = sqlx::query_as::<_, FailureRow>(&query);
        if let Some(work_id) = work_id {
            q = q.bind(work_id);
        }

        let rows: Vec<FailureRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn save_run(&self, report: &RunReport) -> DomainResult<()> {
        let report_json = serde_json::to_string(report)?;

        sqlx::query(
            r#"INSERT OR REPLACE INTO batch_runs (run_id, started_at, finished_at, backlog_size, accepted, failed, skipped, report)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(report.run_id.to_string())
        .bind(report.started_at.to_rfc3339())
        .bind(report.finished_at.map(|t| t.to_rfc3339()))
        .bind(report.backlog_size as i64)
        .bind(report.accepted as i64)
        .bind(report.failed as i64)
        .bind(report.skipped as i64)
        .bind(&report_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_runs(&self, limit: usize) -> DomainResult<Vec<RunReport>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT report FROM batch_runs ORDER BY started_at DESC LIMIT ?")
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|(json,)| serde_json::from_str(&json).map_err(DomainError::from))
            .collect()
    }
}

#[derive(sqlx::FromRow)]
struct SimplificationRow {
    work_id: String,
    level: String,
    chunk_index: i64,
    original_text: String,
    simplified_text: String,
    quality_score: f64,
    era: String,
    preservation_issues: Option<String>,
    created_at: String,
}

impl TryFrom<SimplificationRow> for SimplificationRecord {
    type Error = DomainError;

    fn try_from(row: SimplificationRow) -> Result<Self, Self::Error> {
        let era = EraLabel::from_str(&row.era)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid era: {}", row.era)))?;

        Ok(SimplificationRecord {
            key: NaturalKey::new(row.work_id, parse_level(&row.level)?, row.chunk_index as usize),
            original_text: row.original_text,
            simplified_text: row.simplified_text,
            quality_score: row.quality_score,
            era,
            preservation_issues: parse_json_or_default(row.preservation_issues)?,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct FailureRow {
    work_id: String,
    level: String,
    chunk_index: i64,
    attempts: i64,
    last_error: String,
    failure_class: String,
    failed_at: String,
}

impl TryFrom<FailureRow> for FailureRecord {
    type Error = DomainError;

    fn try_from(row: FailureRow) -> Result<Self, Self::Error> {
        let failure_class = FailureClass::from_str(&row.failure_class).ok_or_else(|| {
            DomainError::SerializationError(format!("Invalid failure class: {}", row.failure_class))
        })?;

        Ok(FailureRecord {
            key: NaturalKey::new(row.work_id, parse_level(&row.level)?, row.chunk_index as usize),
            attempts: row.attempts as u32,
            last_error: row.last_error,
            failure_class,
            failed_at: parse_datetime(&row.failed_at)?,
        })
    }
}
