//! Durable simplification output and the failure ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::era::EraLabel;
use super::level::CefrLevel;
use super::quality::{FailureClass, PreservationIssue};

/// The `(work id, level, chunk index)` triple identifying one simplification slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NaturalKey {
    /// Owning work
    pub work_id: String,
    /// Target reading level
    pub level: CefrLevel,
    /// Zero-based chunk position within the work
    pub chunk_index: usize,
}

impl NaturalKey {
    /// Build a key from its parts.
    pub fn new(work_id: impl Into<String>, level: CefrLevel, chunk_index: usize) -> Self {
        Self {
            work_id: work_id.into(),
            level,
            chunk_index,
        }
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.work_id, self.level, self.chunk_index)
    }
}

/// An accepted simplification stored under its natural key.
///
/// Records are immutable once written; a re-run replaces them through an
/// upsert on the natural key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimplificationRecord {
    /// Slot this record fills
    pub key: NaturalKey,
    /// Snapshot of the chunk text that was simplified
    pub original_text: String,
    /// Candidate text that passed the gate
    pub simplified_text: String,
    /// Quality score in `0.0..=1.0`
    pub quality_score: f64,
    /// Era used to pick the threshold when the record was judged
    pub era: EraLabel,
    /// Soft content-preservation warnings raised by the quality gate
    #[serde(default)]
    pub preservation_issues: Vec<PreservationIssue>,
    /// When the record was written
    pub created_at: DateTime<Utc>,
}

impl SimplificationRecord {
    /// Whether the gate raised any preservation warnings.
    pub fn has_warnings(&self) -> bool {
        !self.preservation_issues.is_empty()
    }
}

/// A key that exhausted its retry budget, kept for operator review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Slot that failed
    pub key: NaturalKey,
    /// Attempts spent in the failing run
    pub attempts: u32,
    /// Last error or rejection message
    pub last_error: String,
    /// Broad category of the final failure
    pub failure_class: FailureClass,
    /// When the failure was recorded
    pub failed_at: DateTime<Utc>,
}
