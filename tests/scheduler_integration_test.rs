//! End-to-end batch runs against the SQLite store and the mock simplifier.

mod common;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bookbridge::adapters::simplifier::mock::stub_rewrite;
use bookbridge::adapters::simplifier::{MockReply, MockSimplifier};
use bookbridge::domain::errors::{DomainError, DomainResult};
use bookbridge::domain::models::{
    BacklogReason, CefrLevel, FailureClass, FailureRecord, NaturalKey, RunReport,
    SimplificationRecord,
};
use bookbridge::domain::ports::{
    SimplificationRepository, SimplificationRequest, Simplifier, SimplifierError,
    SimplifierResponse,
};
use bookbridge::services::{SchedulerError, SchedulerEvent, SchedulerSettings};
use common::{backlog_service, ingest_work, scheduler, scheduler_with, setup_store};
use tokio::sync::{mpsc, watch};

async fn chunk_text(ts: &common::TestStore, work_id: &str, index: usize) -> String {
    ts.works
        .get_chunks(work_id)
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.chunk_index == index)
        .map(|c| c.text)
        .expect("chunk exists")
}

#[tokio::test]
async fn test_mixed_outcomes_leave_exact_backlog() {
    let ts = setup_store().await;
    ingest_work(&ts, "novel", 10).await;

    let mock = Arc::new(MockSimplifier::new());
    // Chunk 3: below the contemporary A1 threshold (0.70) once, then above it
    mock.script(
        chunk_text(&ts, "novel", 3).await,
        CefrLevel::A1,
        vec![
            MockReply::Rewrite { quality: Some(0.65) },
            MockReply::rewrite(0.75),
        ],
    )
    .await;
    // Chunk 4: the collaborator echoes the original every time
    mock.script(
        chunk_text(&ts, "novel", 4).await,
        CefrLevel::A1,
        vec![MockReply::Echo { quality: Some(0.95) }],
    )
    .await;
    // Chunk 7: the collaborator keeps failing
    mock.script(
        chunk_text(&ts, "novel", 7).await,
        CefrLevel::A1,
        vec![MockReply::Status(503)],
    )
    .await;

    let backlog = backlog_service(&ts);
    let items = backlog
        .plan(&["novel".to_string()], &[CefrLevel::A1], None)
        .await
        .unwrap();
    assert_eq!(items.len(), 10);

    let report = scheduler(&ts, Arc::clone(&mock), 2, 5)
        .run(items)
        .await
        .expect("run should complete");

    assert_eq!(report.accepted, 8);
    assert_eq!(report.failed, 2);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.rejected, 4, "one low score plus three echoes");
    assert!(!report.interrupted);
    assert!(report.aborted.is_none());
    assert!(report.is_balanced());

    let failed: Vec<usize> = report.failed_items.iter().map(|f| f.key.chunk_index).collect();
    assert_eq!(failed, vec![4, 7]);
    assert_eq!(report.failed_items[0].failure_class, FailureClass::Quality);
    assert_eq!(report.failed_items[0].attempts, 3);
    assert_eq!(report.failed_items[1].failure_class, FailureClass::Transport);

    // Chunk 3 was stored with the passing score
    let record = ts
        .store
        .get(&NaturalKey::new("novel", CefrLevel::A1, 3))
        .await
        .unwrap()
        .expect("chunk 3 accepted");
    assert!((record.quality_score - 0.75).abs() < 1e-9);

    // Recomputing coverage yields exactly the two failed keys
    let remaining = backlog.backlog("novel", &[CefrLevel::A1]).await.unwrap();
    let remaining: Vec<(usize, BacklogReason)> = remaining
        .into_iter()
        .map(|b| (b.key.chunk_index, b.reason))
        .collect();
    assert_eq!(
        remaining,
        vec![(4, BacklogReason::Missing), (7, BacklogReason::Missing)]
    );

    let failures = ts.store.list_failures(Some("novel")).await.unwrap();
    assert_eq!(failures.len(), 2);

    let runs = ts.store.list_runs(5).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_id, report.run_id);
    assert_eq!(runs[0].accepted, 8);
}

#[tokio::test]
async fn test_second_run_only_retries_failures() {
    let ts = setup_store().await;
    ingest_work(&ts, "novel", 4).await;

    let flaky_text = chunk_text(&ts, "novel", 2).await;
    let mock = Arc::new(MockSimplifier::new());
    mock.script(flaky_text.clone(), CefrLevel::B1, vec![MockReply::Status(500)])
        .await;

    let backlog = backlog_service(&ts);
    let items = backlog
        .plan(&[], &[CefrLevel::B1], None)
        .await
        .unwrap();
    let first = scheduler(&ts, Arc::clone(&mock), 2, 10).run(items).await.unwrap();
    assert_eq!(first.accepted, 3);
    assert_eq!(first.failed, 1);

    // The collaborator recovers
    mock.script(flaky_text, CefrLevel::B1, vec![MockReply::rewrite(0.9)])
        .await;
    let items = backlog
        .plan(&[], &[CefrLevel::B1], None)
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].key.chunk_index, 2);

    let calls_before = mock.call_count().await;
    let second = scheduler(&ts, Arc::clone(&mock), 2, 10).run(items).await.unwrap();
    assert_eq!(second.accepted, 1);
    assert_eq!(mock.call_count().await, calls_before + 1);

    // Acceptance clears the failure ledger entry
    assert!(ts.store.list_failures(None).await.unwrap().is_empty());
    let coverage = backlog.coverage("novel").await.unwrap();
    assert_eq!(coverage.per_level.get(&CefrLevel::B1).copied(), Some(4));
}

#[tokio::test]
async fn test_circuit_breaker_aborts_run() {
    let ts = setup_store().await;
    ingest_work(&ts, "novel", 10).await;

    let mock = Arc::new(MockSimplifier::with_default_reply(MockReply::Status(503)));
    let items = backlog_service(&ts)
        .plan(&[], &[CefrLevel::A2], None)
        .await
        .unwrap();

    let err = scheduler(&ts, Arc::clone(&mock), 1, 3)
        .run(items)
        .await
        .expect_err("breaker should abort the run");

    let SchedulerError::CircuitOpen { failures, report, .. } = err;
    assert_eq!(failures, 3);
    assert_eq!(report.accepted, 0);
    assert_eq!(report.failed + report.skipped, 10);
    assert!(report.is_balanced());
    assert!(report.aborted.is_some());
    assert_eq!(mock.call_count().await, 3, "no dispatch after the breaker opens");

    let runs = ts.store.list_runs(5).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert!(runs[0].aborted.is_some());
}

#[tokio::test]
async fn test_shutdown_finishes_in_flight_and_skips_rest() {
    let ts = setup_store().await;
    ingest_work(&ts, "novel", 5).await;

    let mock = Arc::new(MockSimplifier::with_default_reply(MockReply::Slow(
        Duration::from_millis(200),
    )));
    let items = backlog_service(&ts)
        .plan(&[], &[CefrLevel::C1], None)
        .await
        .unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sched = scheduler(&ts, Arc::clone(&mock), 1, 5);
    let run = tokio::spawn(async move { sched.run_until(items, shutdown_rx).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx.send(true).unwrap();

    let report = run.await.unwrap().expect("interrupted run still reports");
    assert!(report.interrupted);
    assert_eq!(report.accepted, 1, "in-flight item completes");
    assert_eq!(report.skipped, 4);
    assert!(report.is_balanced());
    assert_eq!(mock.call_count().await, 1);

    let remaining = backlog_service(&ts)
        .backlog("novel", &[CefrLevel::C1])
        .await
        .unwrap();
    assert_eq!(remaining.len(), 4);
}

#[tokio::test]
async fn test_events_track_progress() {
    let ts = setup_store().await;
    ingest_work(&ts, "novel", 3).await;

    let mock = Arc::new(MockSimplifier::new());
    let items = backlog_service(&ts)
        .plan(&[], &[CefrLevel::A1, CefrLevel::C2], None)
        .await
        .unwrap();
    assert_eq!(items.len(), 6);

    let (tx, mut rx) = mpsc::channel(64);
    let report = scheduler(&ts, mock, 3, 5)
        .with_events(tx)
        .run(items)
        .await
        .unwrap();
    assert_eq!(report.accepted, 6);

    let mut accepted = 0;
    let mut finished = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            SchedulerEvent::ItemAccepted { .. } => accepted += 1,
            SchedulerEvent::Finished { accepted: total, .. } => {
                assert_eq!(total, 6);
                finished = true;
            }
            _ => {}
        }
    }
    assert_eq!(accepted, 6);
    assert!(finished);
}

#[tokio::test]
async fn test_limit_caps_planned_items() {
    let ts = setup_store().await;
    ingest_work(&ts, "alpha", 3).await;
    ingest_work(&ts, "beta", 3).await;

    let items = backlog_service(&ts)
        .plan(&[], &CefrLevel::ALL, Some(8))
        .await
        .unwrap();
    assert_eq!(items.len(), 8);
    assert!(items[..6].iter().all(|i| i.key.work_id == "alpha"));
    assert_eq!(items[0].key, NaturalKey::new("alpha", CefrLevel::A1, 0));
    assert_eq!(items[1].key, NaturalKey::new("alpha", CefrLevel::A2, 0));
}

fn settings(concurrency: usize, request_timeout: Duration, breaker_threshold: u32) -> SchedulerSettings {
    SchedulerSettings {
        concurrency,
        request_timeout,
        circuit_breaker_threshold: breaker_threshold,
    }
}

#[tokio::test]
async fn test_timeout_is_a_transport_failure() {
    let ts = setup_store().await;
    ingest_work(&ts, "novel", 1).await;

    let mock = Arc::new(MockSimplifier::with_default_reply(MockReply::Slow(
        Duration::from_millis(300),
    )));
    let items = backlog_service(&ts)
        .plan(&[], &[CefrLevel::A1], None)
        .await
        .unwrap();

    let report = scheduler_with(
        Arc::clone(&ts.store),
        mock.clone(),
        settings(1, Duration::from_millis(50), 0),
    )
    .run(items)
    .await
    .unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.rejected, 0);
    assert_eq!(report.retries, 2);
    let failure = &report.failed_items[0];
    assert_eq!(failure.failure_class, FailureClass::Transport);
    assert_eq!(failure.attempts, 3);
    assert!(failure.reason.contains("50ms"), "reason was {}", failure.reason);
    assert_eq!(mock.call_count().await, 3);
}

#[tokio::test]
async fn test_empty_content_is_retried() {
    let ts = setup_store().await;
    ingest_work(&ts, "novel", 1).await;

    let mock = Arc::new(MockSimplifier::new());
    mock.script(
        chunk_text(&ts, "novel", 0).await,
        CefrLevel::B2,
        vec![MockReply::Empty, MockReply::Empty, MockReply::rewrite(0.9)],
    )
    .await;
    let items = backlog_service(&ts)
        .plan(&[], &[CefrLevel::B2], None)
        .await
        .unwrap();

    let report = scheduler(&ts, Arc::clone(&mock), 1, 5).run(items).await.unwrap();
    assert_eq!(report.accepted, 1);
    assert_eq!(report.retries, 2);
    assert_eq!(report.rejected, 0, "empty replies are not quality rejections");
    assert_eq!(mock.call_count().await, 3);
}

#[tokio::test]
async fn test_empty_content_counts_toward_breaker() {
    let ts = setup_store().await;
    ingest_work(&ts, "novel", 6).await;

    let mock = Arc::new(MockSimplifier::with_default_reply(MockReply::Empty));
    let items = backlog_service(&ts)
        .plan(&[], &[CefrLevel::A1], None)
        .await
        .unwrap();

    let err = scheduler(&ts, Arc::clone(&mock), 1, 4)
        .run(items)
        .await
        .expect_err("consecutive empty replies open the breaker");
    let SchedulerError::CircuitOpen { failures, report, .. } = err;
    assert_eq!(failures, 4);
    assert!(report.is_balanced());
    assert!(report
        .failed_items
        .iter()
        .all(|f| f.failure_class == FailureClass::Content));
    assert_eq!(mock.call_count().await, 4);
}

/// Result store whose upserts always fail; everything else goes to `inner`.
struct UnwritableStore {
    inner: Arc<dyn SimplificationRepository>,
}

#[async_trait]
impl SimplificationRepository for UnwritableStore {
    async fn upsert(&self, _record: &SimplificationRecord) -> DomainResult<()> {
        Err(DomainError::DatabaseError("disk I/O error".to_string()))
    }

    async fn get(&self, key: &NaturalKey) -> DomainResult<Option<SimplificationRecord>> {
        self.inner.get(key).await
    }

    async fn list_by_work(&self, work_id: &str) -> DomainResult<Vec<SimplificationRecord>> {
        self.inner.list_by_work(work_id).await
    }

    async fn invalidate(
        &self,
        work_id: &str,
        level: Option<CefrLevel>,
        chunk_index: Option<usize>,
    ) -> DomainResult<u64> {
        self.inner.invalidate(work_id, level, chunk_index).await
    }

    async fn purge_orphans(&self, work_id: &str, total_chunks: usize) -> DomainResult<u64> {
        self.inner.purge_orphans(work_id, total_chunks).await
    }

    async fn record_failure(&self, failure: &FailureRecord) -> DomainResult<()> {
        self.inner.record_failure(failure).await
    }

    async fn clear_failure(&self, key: &NaturalKey) -> DomainResult<()> {
        self.inner.clear_failure(key).await
    }

    async fn list_failures(&self, work_id: Option<&str>) -> DomainResult<Vec<FailureRecord>> {
        self.inner.list_failures(work_id).await
    }

    async fn save_run(&self, report: &RunReport) -> DomainResult<()> {
        self.inner.save_run(report).await
    }

    async fn list_runs(&self, limit: usize) -> DomainResult<Vec<RunReport>> {
        self.inner.list_runs(limit).await
    }
}

#[tokio::test]
async fn test_storage_failure_is_terminal() {
    let ts = setup_store().await;
    ingest_work(&ts, "novel", 2).await;

    let mock = Arc::new(MockSimplifier::new());
    let items = backlog_service(&ts)
        .plan(&[], &[CefrLevel::C1], None)
        .await
        .unwrap();
    let store: Arc<dyn SimplificationRepository> = Arc::new(UnwritableStore {
        inner: Arc::clone(&ts.store),
    });

    let report = scheduler_with(store, mock.clone(), settings(1, Duration::from_secs(5), 1))
        .run(items)
        .await
        .expect("storage failures do not trip the breaker");

    assert_eq!(report.failed, 2);
    assert_eq!(report.retries, 0);
    assert!(report.is_balanced());
    assert!(report
        .failed_items
        .iter()
        .all(|f| f.failure_class == FailureClass::Storage && f.attempts == 1));
    assert_eq!(mock.call_count().await, 2, "no second call after a storage failure");

    let failures = ts.store.list_failures(Some("novel")).await.unwrap();
    assert_eq!(failures.len(), 2);
}

#[tokio::test]
async fn test_full_run_covers_every_slot() {
    let ts = setup_store().await;
    ingest_work(&ts, "novel", 3).await;

    let backlog = backlog_service(&ts);
    let items = backlog.plan(&[], &CefrLevel::ALL, None).await.unwrap();
    assert_eq!(items.len(), 18);

    let report = scheduler(&ts, Arc::new(MockSimplifier::new()), 3, 5)
        .run(items)
        .await
        .unwrap();
    assert_eq!(report.accepted, 18);
    assert!(report.is_balanced());

    let records = ts.store.list_by_work("novel").await.unwrap();
    let keys: HashSet<NaturalKey> = records.iter().map(|r| r.key.clone()).collect();
    assert_eq!(records.len(), 18);
    assert_eq!(keys.len(), 18);
    assert!(backlog.coverage("novel").await.unwrap().is_complete());
    assert!(backlog.plan(&[], &CefrLevel::ALL, None).await.unwrap().is_empty());

    // A second run over the same store does nothing
    let report = scheduler(&ts, Arc::new(MockSimplifier::new()), 3, 5)
        .run(Vec::new())
        .await
        .unwrap();
    assert_eq!(report.backlog_size, 0);
    assert_eq!(ts.store.list_by_work("novel").await.unwrap().len(), 18);
}

/// Simplifier that records how many calls overlap.
#[derive(Default)]
struct OverlapTracker {
    current: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl Simplifier for OverlapTracker {
    async fn simplify(&self, request: &SimplificationRequest) -> Result<SimplifierResponse, SimplifierError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(SimplifierResponse {
            candidate: stub_rewrite(&request.text),
            reported_quality: Some(0.9),
        })
    }

    fn name(&self) -> &str {
        "overlap-tracker"
    }
}

#[tokio::test]
async fn test_concurrency_cap_is_respected() {
    let ts = setup_store().await;
    ingest_work(&ts, "novel", 4).await;

    let tracker = Arc::new(OverlapTracker::default());
    let items = backlog_service(&ts)
        .plan(&[], &[CefrLevel::A1, CefrLevel::B1], None)
        .await
        .unwrap();
    assert_eq!(items.len(), 8);

    let report = scheduler_with(
        Arc::clone(&ts.store),
        tracker.clone(),
        settings(2, Duration::from_secs(5), 5),
    )
    .run(items)
    .await
    .unwrap();

    assert_eq!(report.accepted, 8);
    assert_eq!(tracker.peak.load(Ordering::SeqCst), 2);
    assert_eq!(tracker.current.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_panicking_call_fails_the_item() {
    let ts = setup_store().await;
    ingest_work(&ts, "novel", 2).await;

    let mock = Arc::new(MockSimplifier::new());
    mock.script(chunk_text(&ts, "novel", 1).await, CefrLevel::A2, vec![MockReply::Panic])
        .await;
    let items = backlog_service(&ts)
        .plan(&[], &[CefrLevel::A2], None)
        .await
        .unwrap();

    let report = scheduler(&ts, Arc::clone(&mock), 2, 0).run(items).await.unwrap();
    assert_eq!(report.accepted, 1);
    assert_eq!(report.failed, 1);
    assert!(report.is_balanced());
    assert_eq!(report.failed_items[0].key.chunk_index, 1);
    assert_eq!(report.failed_items[0].failure_class, FailureClass::Transport);
}
