//! Batch run state and reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::era::EraLabel;
use super::level::CefrLevel;
use super::quality::FailureClass;
use super::simplification::NaturalKey;

/// One backlog slot ready for the scheduler, joined with its source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Slot to generate
    pub key: NaturalKey,
    /// Era used for threshold selection
    pub era: EraLabel,
    /// Chunk text sent to the simplifier
    pub original_text: String,
}

/// Per-item state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    /// Queued, waiting for a permit
    Pending,
    /// A simplifier call is outstanding
    InFlight,
    /// Stored; terminal
    Accepted,
    /// Candidate failed the quality gate; will be retried or failed
    Rejected,
    /// Retry budget exhausted or storage failed; terminal
    Failed,
}

impl ItemState {
    /// Stable snake_case name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InFlight => "in_flight",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }

    /// `Accepted` and `Failed` end an item's life within a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Failed)
    }

    /// Whether the scheduler may move an item from `self` to `next`.
    ///
    /// `InFlight -> Pending` is a retryable call failure.
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InFlight)
                | (Self::InFlight, Self::Pending | Self::Accepted | Self::Rejected | Self::Failed)
                | (Self::Rejected, Self::Pending | Self::Failed)
        )
    }
}

/// A terminally failed item listed in the run report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedItem {
    /// Slot that failed
    pub key: NaturalKey,
    /// Calls made, including the last
    pub attempts: u32,
    /// Broad category of the final failure
    pub failure_class: FailureClass,
    /// Last error or rejection message
    pub reason: String,
}

/// Outcome counters for one slice of a run (a level or an era).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    /// Accepted items
    pub accepted: usize,
    /// Quality-gate rejections (per attempt)
    pub rejected: usize,
    /// Items that ended failed
    pub failed: usize,
}

/// Structured summary of a single scheduler run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique id assigned when the run starts
    pub run_id: Uuid,
    /// Wall-clock start
    pub started_at: DateTime<Utc>,
    /// Wall-clock end, set by [`RunReport::finish`]
    pub finished_at: Option<DateTime<Utc>>,
    /// Distinct items handed to the scheduler
    pub backlog_size: usize,
    /// Items stored as accepted records
    pub accepted: usize,
    /// Quality-gate rejections, counted per attempt
    pub rejected: usize,
    /// Items that ended failed
    pub failed: usize,
    /// Items never started because the run stopped early
    pub skipped: usize,
    /// Re-queued attempts across all items
    pub retries: usize,
    /// Accepted items that carried preservation warnings
    pub accepted_with_warnings: usize,
    /// Outcome counters per target level
    pub per_level: BTreeMap<CefrLevel, OutcomeCounts>,
    /// Outcome counters per era label
    pub per_era: BTreeMap<EraLabel, OutcomeCounts>,
    /// Every failed item, sorted by key once the run finishes
    pub failed_items: Vec<FailedItem>,
    /// Set when the circuit breaker aborted the run
    pub aborted: Option<String>,
    /// Set when a shutdown signal stopped the run between items
    pub interrupted: bool,
}

impl RunReport {
    /// Empty report for a backlog of `backlog_size` items, stamped with a fresh run id.
    pub fn new(backlog_size: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            backlog_size,
            accepted: 0,
            rejected: 0,
            failed: 0,
            skipped: 0,
            retries: 0,
            accepted_with_warnings: 0,
            per_level: BTreeMap::new(),
            per_era: BTreeMap::new(),
            failed_items: Vec::new(),
            aborted: None,
            interrupted: false,
        }
    }

    /// Count one accepted item.
    pub fn record_accepted(&mut self, key: &NaturalKey, era: EraLabel, with_warnings: bool) {
        self.accepted += 1;
        if with_warnings {
            self.accepted_with_warnings += 1;
        }
        self.per_level.entry(key.level).or_default().accepted += 1;
        self.per_era.entry(era).or_default().accepted += 1;
    }

    /// Count one quality rejection. The item itself may still be retried.
    pub fn record_rejected(&mut self, key: &NaturalKey, era: EraLabel) {
        self.rejected += 1;
        self.per_level.entry(key.level).or_default().rejected += 1;
        self.per_era.entry(era).or_default().rejected += 1;
    }

    /// Count one terminally failed item and keep it for the report listing.
    pub fn record_failed(&mut self, item: FailedItem, era: EraLabel) {
        self.failed += 1;
        self.per_level.entry(item.key.level).or_default().failed += 1;
        self.per_era.entry(era).or_default().failed += 1;
        self.failed_items.push(item);
    }

    /// Stamp the end time and sort the failed items by key.
    pub fn finish(&mut self) {
        self.failed_items.sort_by(|a, b| a.key.cmp(&b.key));
        self.finished_at = Some(Utc::now());
    }

    /// Items that reached a terminal state.
    pub fn processed(&self) -> usize {
        self.accepted + self.failed
    }

    /// Every backlog item is accounted for as accepted, failed or skipped.
    pub fn is_balanced(&self) -> bool {
        self.accepted + self.failed + self.skipped == self.backlog_size
    }

    /// Whole seconds between start and finish, if the run has finished.
    pub fn duration_secs(&self) -> Option<i64> {
        self.finished_at.map(|end| (end - self.started_at).num_seconds())
    }
}
