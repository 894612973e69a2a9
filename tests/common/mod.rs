//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use bookbridge::adapters::simplifier::MockSimplifier;
use bookbridge::adapters::sqlite::{
    create_migrated_test_pool, SqliteSimplificationRepository, SqliteWorkRepository,
};
use bookbridge::domain::models::{EraLabel, QualityConfig};
use bookbridge::domain::ports::{SimplificationRepository, Simplifier, WorkRepository};
use bookbridge::infrastructure::pacing::RequestPacer;
use bookbridge::services::{
    BacklogService, BatchScheduler, CoveragePolicy, IngestRequest, IngestionService,
    LexicalEraClassifier, QualityGate, RetryPolicy, SchedulerSettings, WordWindowChunker,
};

pub const WORDS_PER_CHUNK: usize = 20;

/// Repositories over one fresh in-memory database.
pub struct TestStore {
    pub works: Arc<dyn WorkRepository>,
    pub store: Arc<dyn SimplificationRepository>,
}

pub async fn setup_store() -> TestStore {
    let pool = create_migrated_test_pool()
        .await
        .expect("failed to create test database");
    TestStore {
        works: Arc::new(SqliteWorkRepository::new(pool.clone())),
        store: Arc::new(SqliteSimplificationRepository::new(pool)),
    }
}

/// The text of chunk `index` within [`chunked_text`].
pub fn chunk_text(index: usize) -> String {
    (0..WORDS_PER_CHUNK)
        .map(|j| format!("c{index}w{j}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text whose `WORDS_PER_CHUNK`-word chunks are all distinct.
pub fn chunked_text(chunks: usize) -> String {
    (0..chunks).map(chunk_text).collect::<Vec<_>>().join(" ")
}

pub fn ingestion_service(ts: &TestStore) -> IngestionService {
    IngestionService::new(
        Arc::clone(&ts.works),
        Arc::clone(&ts.store),
        Arc::new(LexicalEraClassifier::default()),
        WordWindowChunker::new(WORDS_PER_CHUNK).expect("valid chunk size"),
        2000,
    )
}

/// Ingest `chunks` chunks of synthetic contemporary text under `id`.
pub async fn ingest_work(ts: &TestStore, id: &str, chunks: usize) {
    ingestion_service(ts)
        .ingest(IngestRequest {
            id: id.to_string(),
            title: format!("Title of {id}"),
            author: "Test Author".to_string(),
            text: chunked_text(chunks),
            era_override: Some(EraLabel::Contemporary),
        })
        .await
        .expect("ingest should succeed");
}

pub fn backlog_service(ts: &TestStore) -> BacklogService {
    BacklogService::new(
        Arc::clone(&ts.works),
        Arc::clone(&ts.store),
        CoveragePolicy::default(),
    )
}

/// Fast settings: 1ms pacing, 1-5ms backoff, three attempts.
pub fn scheduler(
    ts: &TestStore,
    simplifier: Arc<MockSimplifier>,
    concurrency: usize,
    breaker_threshold: u32,
) -> BatchScheduler {
    scheduler_with(
        Arc::clone(&ts.store),
        simplifier,
        SchedulerSettings {
            concurrency,
            request_timeout: Duration::from_secs(5),
            circuit_breaker_threshold: breaker_threshold,
        },
    )
}

/// Scheduler over any store and simplifier with the fast pacing and retry policy.
pub fn scheduler_with(
    store: Arc<dyn SimplificationRepository>,
    simplifier: Arc<dyn Simplifier>,
    settings: SchedulerSettings,
) -> BatchScheduler {
    BatchScheduler::new(
        simplifier,
        store,
        Arc::new(QualityGate::from_config(&QualityConfig::default()).expect("default gate")),
        Arc::new(RequestPacer::with_period(Duration::from_millis(1))),
        RetryPolicy::new(3, 1, 5),
        settings,
    )
    .expect("valid scheduler settings")
}
