//! Bounded-concurrency batch scheduler.
//!
//! Drains a backlog of [`WorkItem`]s through the simplification client and
//! the quality gate. Dispatch is FIFO over a queue; failed attempts go back
//! to the end of the queue with an exponential backoff before they become
//! ready again. A semaphore bounds in-flight work, a shared pacer bounds the
//! request rate, and a circuit breaker stops the run when the collaborator
//! keeps failing.

use chrono::Utc;
use futures::FutureExt;
use std::collections::{HashSet, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{sleep_until, timeout, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    FailedItem, FailureClass, FailureRecord, ItemState, NaturalKey, QualityVerdict, RunReport,
    SchedulerConfig, SimplificationRecord, SimplifierConfig, WorkItem,
};
use crate::domain::ports::{
    SimplificationRepository, SimplificationRequest, Simplifier, SimplifierError,
};
use crate::infrastructure::pacing::RequestPacer;
use crate::services::circuit_breaker::CircuitBreaker;
use crate::services::quality_gate::QualityGate;
use crate::services::retry_policy::RetryPolicy;

/// Largest worker pool the scheduler accepts.
pub const MAX_CONCURRENCY: usize = 8;

/// Runtime settings for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Maximum in-flight items (1-8)
    pub concurrency: usize,
    /// Per-request timeout; expiry counts as a transport failure
    pub request_timeout: Duration,
    /// Consecutive transport/content failures that abort the run (0 disables)
    pub circuit_breaker_threshold: u32,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            concurrency: 2,
            request_timeout: Duration::from_secs(60),
            circuit_breaker_threshold: 5,
        }
    }
}

impl SchedulerSettings {
    /// Combine the scheduler section with the simplifier's request timeout.
    pub fn from_config(scheduler: &SchedulerConfig, simplifier: &SimplifierConfig) -> Self {
        Self {
            concurrency: scheduler.concurrency,
            request_timeout: Duration::from_secs(simplifier.timeout_secs),
            circuit_breaker_threshold: scheduler.circuit_breaker_threshold,
        }
    }
}

/// Progress events emitted during a run.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// Run started.
    Started {
        /// Id of the report being built
        run_id: Uuid,
        /// Distinct items queued
        total: usize,
    },
    /// Item accepted and stored.
    ItemAccepted {
        /// Stored slot
        key: NaturalKey,
        /// Attempts it took
        attempts: u32,
        /// Gate score of the stored candidate
        score: f64,
        /// Preservation warnings carried by the record
        warnings: usize,
    },
    /// Candidate rejected by the quality gate.
    ItemRejected {
        /// Slot whose candidate was refused
        key: NaturalKey,
        /// Attempt number, starting at 1
        attempt: u32,
        /// Rejection reasons, hard ones first
        reasons: Vec<String>,
    },
    /// Item re-queued after a failed attempt.
    ItemRetrying {
        /// Slot being retried
        key: NaturalKey,
        /// Attempt that just failed
        attempt: u32,
        /// Backoff before the next attempt
        delay_ms: u64,
        /// Why the attempt failed
        error: String,
    },
    /// Item failed terminally.
    ItemFailed {
        /// Slot that failed
        key: NaturalKey,
        /// Attempts spent
        attempts: u32,
        /// Last error or rejection
        reason: String,
    },
    /// Circuit breaker tripped; the run is draining.
    CircuitOpened {
        /// Consecutive failures that tripped it
        failures: u32,
        /// Message of the last one
        last_error: String,
    },
    /// Run finished (completed, interrupted, or aborted).
    Finished {
        /// Items accepted
        accepted: usize,
        /// Items failed
        failed: usize,
        /// Items left in the backlog
        skipped: usize,
    },
}

/// Errors that end a run early.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The breaker opened; in-flight items drained and the rest were skipped.
    #[error("Circuit breaker opened after {failures} consecutive failures: {last_error}")]
    CircuitOpen {
        /// Consecutive failures that tripped the breaker
        failures: u32,
        /// Message of the last failure
        last_error: String,
        /// Partial report covering everything processed before the abort
        report: Box<RunReport>,
    },
}

impl SchedulerError {
    /// Report of the aborted run.
    pub fn report(&self) -> &RunReport {
        match self {
            Self::CircuitOpen { report, .. } => report,
        }
    }
}

#[derive(Debug, Clone)]
enum Halt {
    Interrupted,
    CircuitOpen { failures: u32, last_error: String },
}

#[derive(Debug)]
struct QueuedItem {
    item: WorkItem,
    attempts: u32,
    ready_at: Instant,
    state: ItemState,
}

impl QueuedItem {
    fn advance(&mut self, next: ItemState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {} for {}",
            self.state.as_str(),
            next.as_str(),
            self.item.key
        );
        self.state = next;
    }
}

#[derive(Debug)]
enum AttemptOutcome {
    Accepted(QualityVerdict),
    Rejected(QualityVerdict),
    CallFailed(SimplifierError),
    StoreFailed(DomainError),
}

enum Wake {
    Joined(Result<(QueuedItem, AttemptOutcome), tokio::task::JoinError>),
    Timer,
    Shutdown(bool),
    Idle,
}

/// Collaborators shared by every attempt task.
struct AttemptContext {
    simplifier: Arc<dyn Simplifier>,
    store: Arc<dyn SimplificationRepository>,
    gate: Arc<QualityGate>,
    pacer: Arc<RequestPacer>,
    request_timeout: Duration,
}

/// Mutable bookkeeping owned by the dispatcher loop.
struct RunState {
    report: RunReport,
    queue: VecDeque<QueuedItem>,
    breaker: CircuitBreaker,
    halt: Option<Halt>,
}

/// Batch scheduler driving the simplify, gate, store cycle.
pub struct BatchScheduler {
    ctx: Arc<AttemptContext>,
    retry: RetryPolicy,
    settings: SchedulerSettings,
    events: Option<mpsc::Sender<SchedulerEvent>>,
}

impl BatchScheduler {
    /// Build a scheduler. Fails when `settings` are out of range.
    pub fn new(
        simplifier: Arc<dyn Simplifier>,
        store: Arc<dyn SimplificationRepository>,
        gate: Arc<QualityGate>,
        pacer: Arc<RequestPacer>,
        retry: RetryPolicy,
        settings: SchedulerSettings,
    ) -> DomainResult<Self> {
        if settings.concurrency == 0 || settings.concurrency > MAX_CONCURRENCY {
            return Err(DomainError::ValidationFailed(format!(
                "concurrency must be between 1 and {MAX_CONCURRENCY}, got {}",
                settings.concurrency
            )));
        }
        if settings.request_timeout.is_zero() {
            return Err(DomainError::ValidationFailed(
                "request timeout must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            ctx: Arc::new(AttemptContext {
                simplifier,
                store,
                gate,
                pacer,
                request_timeout: settings.request_timeout,
            }),
            retry,
            settings,
            events: None,
        })
    }

    /// Stream progress events to `tx`.
    pub fn with_events(mut self, tx: mpsc::Sender<SchedulerEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Effective settings.
    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Run `items` to completion with no external shutdown signal.
    pub async fn run(&self, items: Vec<WorkItem>) -> Result<RunReport, SchedulerError> {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        self.run_until(items, shutdown_rx).await
    }

    /// Run `items` until the backlog drains, the circuit breaker opens, or
    /// `shutdown` flips to `true`.
    ///
    /// On shutdown no new items are dispatched; in-flight items finish and
    /// the report marks the run interrupted. On a breaker trip the run drains
    /// the same way and returns [`SchedulerError::CircuitOpen`] with the
    /// partial report. Both reports are persisted through the store.
    pub async fn run_until(
        &self,
        items: Vec<WorkItem>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<RunReport, SchedulerError> {
        let items = dedupe(items);
        let now = Instant::now();
        let mut state = RunState {
            report: RunReport::new(items.len()),
            queue: items
                .into_iter()
                .map(|item| QueuedItem {
                    item,
                    attempts: 0,
                    ready_at: now,
                    state: ItemState::Pending,
                })
                .collect(),
            breaker: CircuitBreaker::new(self.settings.circuit_breaker_threshold),
            halt: None,
        };

        info!(
            run_id = %state.report.run_id,
            backlog = state.report.backlog_size,
            concurrency = self.settings.concurrency,
            simplifier = self.ctx.simplifier.name(),
            "Starting batch run"
        );
        self.emit(SchedulerEvent::Started {
            run_id: state.report.run_id,
            total: state.report.backlog_size,
        })
        .await;

        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency));
        let mut in_flight: JoinSet<(QueuedItem, AttemptOutcome)> = JoinSet::new();
        let mut watching = true;

        loop {
            if state.halt.is_none() && *shutdown.borrow() {
                info!("Shutdown requested, draining in-flight work");
                state.halt = Some(Halt::Interrupted);
            }

            if state.halt.is_none() {
                self.dispatch_ready(&mut state.queue, &semaphore, &mut in_flight);
            }

            let next_ready = state.queue.iter().map(|q| q.ready_at).min();
            if in_flight.is_empty() && (state.halt.is_some() || next_ready.is_none()) {
                break;
            }

            let wake_at = next_ready
                .filter(|_| state.halt.is_none() && semaphore.available_permits() > 0);
            let deadline = wake_at.unwrap_or_else(Instant::now);

            let wake = tokio::select! {
                Some(joined) = in_flight.join_next() => Wake::Joined(joined),
                () = sleep_until(deadline), if wake_at.is_some() => Wake::Timer,
                changed = shutdown.changed(), if watching && state.halt.is_none() => {
                    Wake::Shutdown(changed.is_ok())
                }
                else => Wake::Idle,
            };

            match wake {
                Wake::Joined(Ok((queued, outcome))) => {
                    self.handle_outcome(&mut state, queued, outcome).await;
                }
                Wake::Joined(Err(e)) => {
                    // The item is lost with its task; it stays in the store's backlog
                    error!(error = %e, "Simplification task did not complete");
                    state.report.skipped += 1;
                }
                Wake::Shutdown(open) => watching = open,
                Wake::Timer | Wake::Idle => {}
            }
        }

        self.finish(state).await
    }

    /// Start every ready item the semaphore has room for, oldest first.
    fn dispatch_ready(
        &self,
        queue: &mut VecDeque<QueuedItem>,
        semaphore: &Arc<Semaphore>,
        in_flight: &mut JoinSet<(QueuedItem, AttemptOutcome)>,
    ) {
        let now = Instant::now();
        while let Some(pos) = queue.iter().position(|q| q.ready_at <= now) {
            let Ok(permit) = Arc::clone(semaphore).try_acquire_owned() else {
                break;
            };
            let Some(mut queued) = queue.remove(pos) else {
                break;
            };
            queued.attempts += 1;
            queued.advance(ItemState::InFlight);
            debug!(key = %queued.item.key, attempt = queued.attempts, "Dispatching item");

            let ctx = Arc::clone(&self.ctx);
            in_flight.spawn(async move {
                let _permit = permit;
                let outcome = AssertUnwindSafe(attempt(&ctx, &queued.item))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        AttemptOutcome::CallFailed(SimplifierError::Network(
                            "simplification task panicked".to_string(),
                        ))
                    });
                (queued, outcome)
            });
        }
    }

    async fn handle_outcome(&self, state: &mut RunState, mut queued: QueuedItem, outcome: AttemptOutcome) {
        let key = queued.item.key.clone();
        match outcome {
            AttemptOutcome::Accepted(verdict) => {
                queued.advance(ItemState::Accepted);
                state.breaker.record_success();
                let warnings = verdict.preservation_issues.len();
                state
                    .report
                    .record_accepted(&key, queued.item.era, warnings > 0);
                info!(
                    key = %key,
                    attempts = queued.attempts,
                    score = verdict.score,
                    warnings,
                    "Simplification accepted"
                );
                self.emit(SchedulerEvent::ItemAccepted {
                    key,
                    attempts: queued.attempts,
                    score: verdict.score,
                    warnings,
                })
                .await;
            }
            AttemptOutcome::Rejected(verdict) => {
                queued.advance(ItemState::Rejected);
                state.report.record_rejected(&key, queued.item.era);
                let reasons = verdict.reasons();
                let class = FailureClass::Quality;
                let reason = if verdict.is_identical_text() {
                    "identical text".to_string()
                } else {
                    reasons.join("; ")
                };
                debug!(key = %key, attempt = queued.attempts, reason = %reason, "Candidate rejected");
                self.emit(SchedulerEvent::ItemRejected {
                    key,
                    attempt: queued.attempts,
                    reasons,
                })
                .await;
                self.retry_or_fail(state, queued, class, reason).await;
            }
            AttemptOutcome::CallFailed(err) => {
                let class = err.class();
                let message = err.to_string();
                warn!(key = %key, attempt = queued.attempts, class = class.as_str(), error = %message, "Simplification call failed");

                if state.breaker.record_failure(class, message.clone()) && state.halt.is_none() {
                    let failures = state.breaker.consecutive_failures();
                    error!(failures, last_error = %message, "Circuit breaker open, aborting run");
                    state.halt = Some(Halt::CircuitOpen {
                        failures,
                        last_error: message.clone(),
                    });
                    self.emit(SchedulerEvent::CircuitOpened {
                        failures,
                        last_error: message.clone(),
                    })
                    .await;
                }
                self.retry_or_fail(state, queued, class, message).await;
            }
            AttemptOutcome::StoreFailed(err) => {
                error!(key = %key, error = %err, "Failed to store accepted simplification");
                self.retry_or_fail(state, queued, FailureClass::Storage, err.to_string())
                    .await;
            }
        }
    }

    async fn retry_or_fail(
        &self,
        state: &mut RunState,
        mut queued: QueuedItem,
        class: FailureClass,
        reason: String,
    ) {
        let retryable = self.retry.should_retry(class, queued.attempts);
        match (&state.halt, retryable) {
            (None, true) => {
                let delay = self.retry.calculate_backoff(queued.attempts.saturating_sub(1));
                queued.ready_at = Instant::now() + delay;
                state.report.retries += 1;
                debug!(key = %queued.item.key, attempt = queued.attempts, delay_ms = delay.as_millis() as u64, "Re-queueing item");
                queued.advance(ItemState::Pending);
                self.emit(SchedulerEvent::ItemRetrying {
                    key: queued.item.key.clone(),
                    attempt: queued.attempts,
                    delay_ms: delay.as_millis() as u64,
                    error: reason,
                })
                .await;
                state.queue.push_back(queued);
            }
            (Some(Halt::Interrupted), true) => {
                // Left in the backlog for the next run
                state.report.skipped += 1;
            }
            (Some(Halt::CircuitOpen { .. }), true) => {
                self.fail(state, queued, class, format!("{reason} (circuit breaker open)"))
                    .await;
            }
            (_, false) => self.fail(state, queued, class, reason).await,
        }
    }

    async fn fail(&self, state: &mut RunState, mut queued: QueuedItem, class: FailureClass, reason: String) {
        queued.advance(ItemState::Failed);
        let key = queued.item.key;
        warn!(key = %key, attempts = queued.attempts, class = class.as_str(), reason = %reason, "Item failed");

        let record = FailureRecord {
            key: key.clone(),
            attempts: queued.attempts,
            last_error: reason.clone(),
            failure_class: class,
            failed_at: Utc::now(),
        };
        if let Err(e) = self.ctx.store.record_failure(&record).await {
            warn!(key = %key, error = %e, "Failed to record failure");
        }

        self.emit(SchedulerEvent::ItemFailed {
            key: key.clone(),
            attempts: queued.attempts,
            reason: reason.clone(),
        })
        .await;
        state.report.record_failed(
            FailedItem {
                key,
                attempts: queued.attempts,
                failure_class: class,
                reason,
            },
            queued.item.era,
        );
    }

    async fn finish(&self, mut state: RunState) -> Result<RunReport, SchedulerError> {
        state.report.skipped += state.queue.len();
        match &state.halt {
            Some(Halt::Interrupted) => state.report.interrupted = true,
            Some(Halt::CircuitOpen { failures, last_error }) => {
                state.report.aborted = Some(format!(
                    "circuit breaker opened after {failures} consecutive failures: {last_error}"
                ));
            }
            None => {}
        }
        state.report.finish();

        if let Err(e) = self.ctx.store.save_run(&state.report).await {
            warn!(run_id = %state.report.run_id, error = %e, "Failed to persist run report");
        }

        info!(
            run_id = %state.report.run_id,
            accepted = state.report.accepted,
            rejected = state.report.rejected,
            failed = state.report.failed,
            skipped = state.report.skipped,
            retries = state.report.retries,
            interrupted = state.report.interrupted,
            "Batch run finished"
        );
        self.emit(SchedulerEvent::Finished {
            accepted: state.report.accepted,
            failed: state.report.failed,
            skipped: state.report.skipped,
        })
        .await;

        match state.halt {
            Some(Halt::CircuitOpen { failures, last_error }) => Err(SchedulerError::CircuitOpen {
                failures,
                last_error,
                report: Box::new(state.report),
            }),
            _ => Ok(state.report),
        }
    }

    async fn emit(&self, event: SchedulerEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }
}

/// One simplify, gate, store cycle for a single item.
async fn attempt(ctx: &AttemptContext, item: &WorkItem) -> AttemptOutcome {
    ctx.pacer.acquire().await;

    let request = SimplificationRequest {
        text: item.original_text.clone(),
        target_level: item.key.level,
        era_hint: item.era,
    };

    let response = match timeout(ctx.request_timeout, ctx.simplifier.simplify(&request)).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => return AttemptOutcome::CallFailed(e),
        Err(_) => {
            return AttemptOutcome::CallFailed(SimplifierError::Timeout(ctx.request_timeout))
        }
    };

    if response.candidate.trim().is_empty() {
        return AttemptOutcome::CallFailed(SimplifierError::EmptyContent);
    }

    let verdict = ctx.gate.evaluate_with_signal(
        &item.original_text,
        &response.candidate,
        item.era,
        item.key.level,
        response.reported_quality,
    );
    if !verdict.accepted {
        return AttemptOutcome::Rejected(verdict);
    }

    let record = SimplificationRecord {
        key: item.key.clone(),
        original_text: item.original_text.clone(),
        simplified_text: response.candidate,
        quality_score: verdict.score,
        era: item.era,
        preservation_issues: verdict.preservation_issues.clone(),
        created_at: Utc::now(),
    };
    if let Err(e) = ctx.store.upsert(&record).await {
        return AttemptOutcome::StoreFailed(e);
    }
    if let Err(e) = ctx.store.clear_failure(&item.key).await {
        warn!(key = %item.key, error = %e, "Failed to clear failure entry");
    }

    AttemptOutcome::Accepted(verdict)
}

/// Drop repeated natural keys, keeping the first occurrence.
fn dedupe(items: Vec<WorkItem>) -> Vec<WorkItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| {
            let fresh = seen.insert(item.key.clone());
            if !fresh {
                debug!(key = %item.key, "Skipping duplicate backlog item");
            }
            fresh
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CefrLevel, EraLabel};

    fn item(index: usize) -> WorkItem {
        WorkItem {
            key: NaturalKey::new("w", CefrLevel::A1, index),
            era: EraLabel::Contemporary,
            original_text: format!("chunk {index}"),
        }
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let mut dup = item(1);
        dup.original_text = "other".to_string();
        let items = dedupe(vec![item(0), item(1), dup, item(2)]);
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].original_text, "chunk 1");
    }

    #[test]
    fn test_settings_from_config() {
        let settings = SchedulerSettings::from_config(
            &SchedulerConfig::default(),
            &SimplifierConfig::default(),
        );
        assert_eq!(settings, SchedulerSettings::default());
    }
}
