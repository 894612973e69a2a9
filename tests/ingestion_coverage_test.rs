//! Ingestion, re-chunking, and coverage over the SQLite store.

mod common;

use chrono::Utc;

use bookbridge::domain::errors::DomainError;
use bookbridge::domain::models::{
    BacklogReason, CefrLevel, CoverageConfig, EraLabel, NaturalKey, QualityThresholdTable,
    SimplificationRecord,
};
use bookbridge::services::{BacklogService, CoveragePolicy, IngestRequest};
use common::{
    backlog_service, chunk_text, chunked_text, ingest_work, ingestion_service, setup_store,
    WORDS_PER_CHUNK,
};

/// An accepted record simplified from chunk `chunk_index` of [`chunked_text`].
fn accepted(work_id: &str, level: CefrLevel, chunk_index: usize, score: f64) -> SimplificationRecord {
    SimplificationRecord {
        key: NaturalKey::new(work_id, level, chunk_index),
        original_text: chunk_text(chunk_index),
        simplified_text: format!("simple {chunk_index}"),
        quality_score: score,
        era: EraLabel::Contemporary,
        preservation_issues: Vec::new(),
        created_at: Utc::now(),
    }
}

const ARCHAIC_OPENING: &str = "Thou art welcome here, quoth he, and hath thee sit by the fire. \
    Wherefore dost thou tarry? 'Tis late, and thy horse hath need of rest ere the morrow.";

#[tokio::test]
async fn test_ingest_detects_era_and_chunks() {
    let ts = setup_store().await;
    let text = format!("{ARCHAIC_OPENING} {}", chunked_text(2));

    let outcome = ingestion_service(&ts)
        .ingest(IngestRequest {
            id: "ballad".to_string(),
            title: "An Old Ballad".to_string(),
            author: "Anonymous".to_string(),
            text,
            era_override: None,
        })
        .await
        .unwrap();

    assert!(!outcome.replaced);
    assert_eq!(outcome.work.era, EraLabel::Archaic);
    assert_eq!(outcome.work.total_chunks, outcome.work.word_count.div_ceil(WORDS_PER_CHUNK));

    let chunks = ts.works.get_chunks("ballad").await.unwrap();
    assert_eq!(chunks.len(), outcome.work.total_chunks);
    let rejoined = chunks.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(" ");
    assert_eq!(rejoined.split_whitespace().count(), outcome.work.word_count);
}

#[tokio::test]
async fn test_ingest_rejects_empty_id() {
    let ts = setup_store().await;
    let err = ingestion_service(&ts)
        .ingest(IngestRequest {
            id: "  ".to_string(),
            title: String::new(),
            author: String::new(),
            text: "some words".to_string(),
            era_override: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::ValidationFailed(_)));
}

#[tokio::test]
async fn test_reingest_shorter_text_purges_orphans() {
    let ts = setup_store().await;
    ingest_work(&ts, "emma", 5).await;
    let created_at = ts.works.get_work("emma").await.unwrap().unwrap().created_at;

    for chunk in 0..5 {
        ts.store
            .upsert(&accepted("emma", CefrLevel::B2, chunk, 0.9))
            .await
            .unwrap();
    }

    let outcome = ingestion_service(&ts)
        .ingest(IngestRequest {
            id: "emma".to_string(),
            title: "Emma (abridged)".to_string(),
            author: "Jane Austen".to_string(),
            text: chunked_text(3),
            era_override: Some(EraLabel::Contemporary),
        })
        .await
        .unwrap();

    assert!(outcome.replaced);
    assert_eq!(outcome.purged_records, 2);
    assert_eq!(outcome.stale_records, 0);
    assert_eq!(outcome.work.total_chunks, 3);
    assert_eq!(outcome.work.created_at, created_at);

    let coverage = backlog_service(&ts).coverage("emma").await.unwrap();
    assert_eq!(coverage.expected, 18);
    assert_eq!(coverage.per_level.get(&CefrLevel::B2).copied(), Some(3));
    assert!(coverage.valid <= coverage.expected);
}

#[tokio::test]
async fn test_coverage_complete_only_when_every_slot_valid() {
    let ts = setup_store().await;
    ingest_work(&ts, "emma", 2).await;
    let service = backlog_service(&ts);

    for chunk in 0..2 {
        for level in CefrLevel::ALL {
            ts.store.upsert(&accepted("emma", level, chunk, 0.95)).await.unwrap();
        }
    }
    let coverage = service.coverage("emma").await.unwrap();
    assert!(coverage.is_complete());
    assert!(service.backlog("emma", &CefrLevel::ALL).await.unwrap().is_empty());

    // A record scored below today's threshold re-enters the backlog
    ts.store
        .upsert(&accepted("emma", CefrLevel::C2, 1, 0.5))
        .await
        .unwrap();
    // An echoed record re-enters the backlog even with a high score
    let mut echo = accepted("emma", CefrLevel::A1, 0, 0.99);
    echo.simplified_text = echo.original_text.clone();
    ts.store.upsert(&echo).await.unwrap();

    let coverage = service.coverage("emma").await.unwrap();
    assert!(!coverage.is_complete());
    assert_eq!(coverage.valid, 10);

    let backlog = service.backlog("emma", &CefrLevel::ALL).await.unwrap();
    let reasons: Vec<(usize, CefrLevel, BacklogReason)> = backlog
        .iter()
        .map(|b| (b.key.chunk_index, b.key.level, b.reason))
        .collect();
    assert_eq!(
        reasons,
        vec![
            (0, CefrLevel::A1, BacklogReason::IdenticalText),
            (1, CefrLevel::C2, BacklogReason::BelowThreshold),
        ]
    );
}

#[tokio::test]
async fn test_sentinel_score_policy() {
    let ts = setup_store().await;
    ingest_work(&ts, "emma", 1).await;
    ts.store
        .upsert(&accepted("emma", CefrLevel::A1, 0, 0.85))
        .await
        .unwrap();

    let strict = BacklogService::new(
        ts.works.clone(),
        ts.store.clone(),
        CoveragePolicy::new(
            QualityThresholdTable::default(),
            150,
            &CoverageConfig {
                sentinel_score: Some(0.85),
            },
        ),
    );
    let backlog = strict.backlog("emma", &[CefrLevel::A1]).await.unwrap();
    assert_eq!(backlog.len(), 1);
    assert_eq!(backlog[0].reason, BacklogReason::SentinelScore);

    let lenient = backlog_service(&ts);
    assert!(lenient.backlog("emma", &[CefrLevel::A1]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_work_is_an_error() {
    let ts = setup_store().await;
    let err = backlog_service(&ts).coverage("missing").await.unwrap_err();
    assert!(matches!(err, DomainError::WorkNotFound(ref id) if id == "missing"));
}

#[tokio::test]
async fn test_reingest_with_changed_text_drops_stale_records() {
    let ts = setup_store().await;
    ingest_work(&ts, "emma", 2).await;
    for chunk in 0..2 {
        for level in CefrLevel::ALL {
            ts.store.upsert(&accepted("emma", level, chunk, 0.95)).await.unwrap();
        }
    }
    assert!(backlog_service(&ts).coverage("emma").await.unwrap().is_complete());

    // Same chunk count, new wording in the second chunk only
    let revised: String = format!(
        "{} {}",
        chunk_text(0),
        (0..WORDS_PER_CHUNK).map(|j| format!("rev{j}")).collect::<Vec<_>>().join(" ")
    );
    let outcome = ingestion_service(&ts)
        .ingest(IngestRequest {
            id: "emma".to_string(),
            title: "Emma".to_string(),
            author: "Jane Austen".to_string(),
            text: revised,
            era_override: Some(EraLabel::Contemporary),
        })
        .await
        .unwrap();

    assert_eq!(outcome.work.total_chunks, 2);
    assert_eq!(outcome.purged_records, 0);
    assert_eq!(outcome.stale_records, 6);

    let remaining = ts.store.list_by_work("emma").await.unwrap();
    assert_eq!(remaining.len(), 6);
    assert!(remaining.iter().all(|r| r.key.chunk_index == 0));

    let backlog = backlog_service(&ts).backlog("emma", &CefrLevel::ALL).await.unwrap();
    assert_eq!(backlog.len(), 6);
    assert!(backlog
        .iter()
        .all(|b| b.key.chunk_index == 1 && b.reason == BacklogReason::Missing));
}

#[tokio::test]
async fn test_record_from_other_text_is_stale_in_coverage() {
    let ts = setup_store().await;
    ingest_work(&ts, "emma", 1).await;

    // Written behind ingestion's back, e.g. by an older pipeline version
    let mut record = accepted("emma", CefrLevel::B1, 0, 0.95);
    record.original_text = "a passage that is no longer in the work".to_string();
    ts.store.upsert(&record).await.unwrap();

    let service = backlog_service(&ts);
    assert_eq!(service.coverage("emma").await.unwrap().valid, 0);
    let backlog = service.backlog("emma", &[CefrLevel::B1]).await.unwrap();
    assert_eq!(backlog.len(), 1);
    assert_eq!(backlog[0].reason, BacklogReason::StaleSource);
}
