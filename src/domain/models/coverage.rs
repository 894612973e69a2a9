//! Derived coverage views and backlog items.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::level::CefrLevel;
use super::simplification::NaturalKey;

/// Why a slot needs (re)generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BacklogReason {
    /// No record stored for the key
    Missing,
    /// Stored simplified text equals the original
    IdenticalText,
    /// Stored score equals the configured legacy sentinel
    SentinelScore,
    /// Stored score is below the current threshold
    BelowThreshold,
    /// Stored original snapshot no longer matches the current chunk text
    StaleSource,
}

impl BacklogReason {
    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::IdenticalText => "identical_text",
            Self::SentinelScore => "sentinel_score",
            Self::BelowThreshold => "below_threshold",
            Self::StaleSource => "stale_source",
        }
    }
}

impl fmt::Display for BacklogReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A natural key lacking a valid accepted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogItem {
    /// Slot lacking a valid record
    pub key: NaturalKey,
    /// Why the slot is in the backlog
    pub reason: BacklogReason,
}

/// Coverage of one work's `totalChunks × 6` matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageSummary {
    /// Work the summary describes
    pub work_id: String,
    /// Chunks in the work
    pub total_chunks: usize,
    /// `total_chunks × 6`
    pub expected: usize,
    /// Slots holding a valid record
    pub valid: usize,
    /// Valid records per level
    pub per_level: BTreeMap<CefrLevel, usize>,
}

impl CoverageSummary {
    /// Slots still lacking a valid record.
    pub fn missing(&self) -> usize {
        self.expected.saturating_sub(self.valid)
    }

    /// Fraction of slots filled, `1.0` for works with no chunks.
    pub fn completion(&self) -> f64 {
        if self.expected == 0 {
            return 1.0;
        }
        self.valid as f64 / self.expected as f64
    }

    /// Whether every slot holds a valid record.
    pub fn is_complete(&self) -> bool {
        self.valid == self.expected
    }
}
