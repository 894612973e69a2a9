//! SQLite result store behavior.

mod common;

use chrono::Utc;

use bookbridge::domain::models::{
    CefrLevel, EraLabel, FailureClass, FailureRecord, MarkerCategory, NaturalKey,
    PreservationIssue, RunReport, SimplificationRecord,
};
use common::{ingest_work, setup_store};

fn record(work_id: &str, level: CefrLevel, chunk_index: usize, simplified: &str, score: f64) -> SimplificationRecord {
    SimplificationRecord {
        key: NaturalKey::new(work_id, level, chunk_index),
        original_text: format!("original text of chunk {chunk_index}"),
        simplified_text: simplified.to_string(),
        quality_score: score,
        era: EraLabel::Contemporary,
        preservation_issues: Vec::new(),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_upsert_is_idempotent_per_natural_key() {
    let ts = setup_store().await;
    ingest_work(&ts, "emma", 3).await;

    ts.store
        .upsert(&record("emma", CefrLevel::A1, 0, "first", 0.8))
        .await
        .unwrap();
    let mut second = record("emma", CefrLevel::A1, 0, "second", 0.9);
    second.preservation_issues = vec![PreservationIssue {
        category: MarkerCategory::Negation,
        original: 3,
        candidate: 1,
    }];
    ts.store.upsert(&second).await.unwrap();

    let records = ts.store.list_by_work("emma").await.unwrap();
    assert_eq!(records.len(), 1, "same key never yields two records");
    assert_eq!(records[0].simplified_text, "second");
    assert_eq!(records[0].preservation_issues.len(), 1);
    assert!(records[0].has_warnings());
}

#[tokio::test]
async fn test_get_missing_key() {
    let ts = setup_store().await;
    ingest_work(&ts, "emma", 1).await;

    let found = ts
        .store
        .get(&NaturalKey::new("emma", CefrLevel::C2, 0))
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_invalidate_scopes() {
    let ts = setup_store().await;
    ingest_work(&ts, "emma", 3).await;

    for chunk in 0..3 {
        for level in [CefrLevel::A1, CefrLevel::B1] {
            ts.store
                .upsert(&record("emma", level, chunk, "simple", 0.9))
                .await
                .unwrap();
        }
    }

    let deleted = ts
        .store
        .invalidate("emma", Some(CefrLevel::A1), Some(1))
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    let deleted = ts.store.invalidate("emma", Some(CefrLevel::B1), None).await.unwrap();
    assert_eq!(deleted, 3);

    let deleted = ts.store.invalidate("emma", None, None).await.unwrap();
    assert_eq!(deleted, 2);
    assert!(ts.store.list_by_work("emma").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_purge_orphans_drops_out_of_range_chunks() {
    let ts = setup_store().await;
    ingest_work(&ts, "emma", 5).await;

    for chunk in 0..5 {
        ts.store
            .upsert(&record("emma", CefrLevel::A2, chunk, "simple", 0.9))
            .await
            .unwrap();
    }
    ts.store
        .record_failure(&FailureRecord {
            key: NaturalKey::new("emma", CefrLevel::B2, 4),
            attempts: 3,
            last_error: "HTTP 503".to_string(),
            failure_class: FailureClass::Transport,
            failed_at: Utc::now(),
        })
        .await
        .unwrap();

    let purged = ts.store.purge_orphans("emma", 3).await.unwrap();
    assert_eq!(purged, 2);

    let remaining: Vec<usize> = ts
        .store
        .list_by_work("emma")
        .await
        .unwrap()
        .iter()
        .map(|r| r.key.chunk_index)
        .collect();
    assert_eq!(remaining, vec![0, 1, 2]);
    assert!(ts.store.list_failures(Some("emma")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failure_ledger_upsert_and_clear() {
    let ts = setup_store().await;
    ingest_work(&ts, "emma", 2).await;
    ingest_work(&ts, "persuasion", 2).await;

    let key = NaturalKey::new("emma", CefrLevel::B1, 1);
    for attempts in [2, 3] {
        ts.store
            .record_failure(&FailureRecord {
                key: key.clone(),
                attempts,
                last_error: format!("attempt {attempts} failed"),
                failure_class: FailureClass::Quality,
                failed_at: Utc::now(),
            })
            .await
            .unwrap();
    }
    ts.store
        .record_failure(&FailureRecord {
            key: NaturalKey::new("persuasion", CefrLevel::A1, 0),
            attempts: 1,
            last_error: "empty".to_string(),
            failure_class: FailureClass::Content,
            failed_at: Utc::now(),
        })
        .await
        .unwrap();

    let emma = ts.store.list_failures(Some("emma")).await.unwrap();
    assert_eq!(emma.len(), 1);
    assert_eq!(emma[0].attempts, 3);
    assert_eq!(emma[0].failure_class, FailureClass::Quality);
    assert_eq!(ts.store.list_failures(None).await.unwrap().len(), 2);

    ts.store.clear_failure(&key).await.unwrap();
    assert!(ts.store.list_failures(Some("emma")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_run_history_newest_first() {
    let ts = setup_store().await;

    let mut older = RunReport::new(4);
    older.started_at = Utc::now() - chrono::Duration::minutes(5);
    older.accepted = 4;
    older.finish();
    let mut newer = RunReport::new(2);
    newer.interrupted = true;
    newer.skipped = 2;
    newer.finish();

    ts.store.save_run(&older).await.unwrap();
    ts.store.save_run(&newer).await.unwrap();

    let runs = ts.store.list_runs(10).await.unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].run_id, newer.run_id);
    assert!(runs[0].interrupted);
    assert_eq!(runs[1].accepted, 4);

    assert_eq!(ts.store.list_runs(1).await.unwrap().len(), 1);
}
