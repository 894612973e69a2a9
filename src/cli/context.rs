//! Wiring shared by the commands: configuration, database, services.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::adapters::sqlite::{
    initialize_database, PoolConfig, SqliteSimplificationRepository, SqliteWorkRepository,
};
use crate::domain::models::Config;
use crate::domain::ports::{SimplificationRepository, WorkRepository};
use crate::services::coverage_tracker::CoveragePolicy;
use crate::services::quality_gate::{threshold_table, QualityGate};
use crate::services::{BacklogService, IngestionService, LexicalEraClassifier, WordWindowChunker};

/// Opened database plus the repositories and config every command needs.
pub struct AppContext {
    /// Effective configuration
    pub config: Config,
    /// Migrated connection pool
    pub pool: SqlitePool,
    /// Works and chunks
    pub works: Arc<dyn WorkRepository>,
    /// Result store
    pub store: Arc<dyn SimplificationRepository>,
}

impl AppContext {
    /// Open (and migrate) the configured database.
    pub async fn open(config: Config) -> Result<Self> {
        let pool = initialize_database(
            &config.database.url(),
            Some(PoolConfig::from(&config.database)),
        )
        .await
        .context("Failed to open database. Run 'bookbridge init' first.")?;

        Ok(Self {
            works: Arc::new(SqliteWorkRepository::new(pool.clone())),
            store: Arc::new(SqliteSimplificationRepository::new(pool.clone())),
            pool,
            config,
        })
    }

    /// Quality gate built from the `quality` section.
    pub fn quality_gate(&self) -> Result<QualityGate> {
        QualityGate::from_config(&self.config.quality).context("Invalid quality configuration")
    }

    /// Coverage rules sharing the gate's thresholds.
    pub fn coverage_policy(&self) -> Result<CoveragePolicy> {
        let thresholds =
            threshold_table(&self.config.quality).context("Invalid quality configuration")?;
        Ok(CoveragePolicy::new(
            thresholds,
            self.config.quality.identity_prefix_chars,
            &self.config.coverage,
        ))
    }

    /// Backlog queries over the context's repositories.
    pub fn backlog_service(&self) -> Result<BacklogService> {
        Ok(BacklogService::new(
            Arc::clone(&self.works),
            Arc::clone(&self.store),
            self.coverage_policy()?,
        ))
    }

    /// Ingestion with the configured chunker and era sampler.
    pub fn ingestion_service(&self) -> Result<IngestionService> {
        let chunker = WordWindowChunker::new(self.config.chunking.words_per_chunk)
            .context("Invalid chunking configuration")?;
        Ok(IngestionService::new(
            Arc::clone(&self.works),
            Arc::clone(&self.store),
            Arc::new(LexicalEraClassifier::new(self.config.era.sample_chars)),
            chunker,
            self.config.era.sample_chars,
        ))
    }
}
