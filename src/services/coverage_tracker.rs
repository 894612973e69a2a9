//! Backlog and coverage computation.
//!
//! Everything here is a pure function of a work, its current chunks and its
//! stored records; the backlog is recomputed on every query rather than
//! persisted.

use std::collections::{BTreeMap, HashMap};

use crate::domain::models::{
    BacklogItem, BacklogReason, CefrLevel, Chunk, CoverageConfig, CoverageSummary, NaturalKey,
    QualityThresholdTable, SimplificationRecord, Work,
};
use crate::services::text::{is_identical, normalize_whitespace};

/// Rules deciding whether a stored record still counts as valid.
#[derive(Debug, Clone, PartialEq)]
pub struct CoveragePolicy {
    /// Minimum score per (era, level)
    pub thresholds: QualityThresholdTable,
    /// Leading characters compared by the identical-text check
    pub identity_prefix_chars: usize,
    /// Legacy score marking a known-bad record
    pub sentinel_score: Option<f64>,
}

impl CoveragePolicy {
    /// Policy from a threshold table and the `coverage` config section.
    pub fn new(
        thresholds: QualityThresholdTable,
        identity_prefix_chars: usize,
        config: &CoverageConfig,
    ) -> Self {
        Self {
            thresholds,
            identity_prefix_chars,
            sentinel_score: config.sentinel_score,
        }
    }

    /// Reason the record must be regenerated, or `None` when it is valid.
    ///
    /// `current_text` is the chunk the slot now holds; a record simplified
    /// from different text is stale. `None` skips that comparison.
    pub fn invalidity(
        &self,
        work: &Work,
        current_text: Option<&str>,
        record: &SimplificationRecord,
    ) -> Option<BacklogReason> {
        if let Some(current) = current_text {
            if is_stale(record, current) {
                return Some(BacklogReason::StaleSource);
            }
        }
        if is_identical(
            &record.original_text,
            &record.simplified_text,
            self.identity_prefix_chars,
        ) {
            return Some(BacklogReason::IdenticalText);
        }
        if let Some(sentinel) = self.sentinel_score {
            if (record.quality_score - sentinel).abs() < f64::EPSILON {
                return Some(BacklogReason::SentinelScore);
            }
        }
        if record.quality_score < self.thresholds.threshold(work.era, record.key.level) {
            return Some(BacklogReason::BelowThreshold);
        }
        None
    }

    /// Whether `record` counts toward coverage. See [`CoveragePolicy::invalidity`].
    pub fn is_valid(&self, work: &Work, current_text: Option<&str>, record: &SimplificationRecord) -> bool {
        self.invalidity(work, current_text, record).is_none()
    }
}

impl Default for CoveragePolicy {
    fn default() -> Self {
        Self {
            thresholds: QualityThresholdTable::default(),
            identity_prefix_chars: 150,
            sentinel_score: None,
        }
    }
}

/// Whether `record` was simplified from text other than `current_text`.
pub fn is_stale(record: &SimplificationRecord, current_text: &str) -> bool {
    normalize_whitespace(&record.original_text) != normalize_whitespace(current_text)
}

fn index_chunks(chunks: &[Chunk]) -> HashMap<usize, &str> {
    chunks.iter().map(|c| (c.chunk_index, c.text.as_str())).collect()
}

fn index_records<'a>(
    work: &Work,
    records: &'a [SimplificationRecord],
) -> HashMap<(CefrLevel, usize), &'a SimplificationRecord> {
    records
        .iter()
        .filter(|r| r.key.work_id == work.id && r.key.chunk_index < work.total_chunks)
        .map(|r| ((r.key.level, r.key.chunk_index), r))
        .collect()
}

/// Every `(level, chunk)` slot of `work` lacking a valid record.
///
/// Ordered by chunk index, then level. Records for chunk indices past the
/// work's current chunk count are ignored. Records are checked against the
/// text of the matching entry in `chunks`.
pub fn compute_backlog(
    work: &Work,
    chunks: &[Chunk],
    records: &[SimplificationRecord],
    policy: &CoveragePolicy,
) -> Vec<BacklogItem> {
    compute_backlog_for_levels(work, chunks, records, policy, &CefrLevel::ALL)
}

/// [`compute_backlog`] restricted to `levels`.
pub fn compute_backlog_for_levels(
    work: &Work,
    chunks: &[Chunk],
    records: &[SimplificationRecord],
    policy: &CoveragePolicy,
    levels: &[CefrLevel],
) -> Vec<BacklogItem> {
    let indexed = index_records(work, records);
    let texts = index_chunks(chunks);
    let mut levels = levels.to_vec();
    levels.sort();
    levels.dedup();

    let mut backlog = Vec::new();
    for chunk_index in 0..work.total_chunks {
        for &level in &levels {
            let reason = match indexed.get(&(level, chunk_index)) {
                None => Some(BacklogReason::Missing),
                Some(record) => {
                    policy.invalidity(work, texts.get(&chunk_index).copied(), record)
                }
            };
            if let Some(reason) = reason {
                backlog.push(BacklogItem {
                    key: NaturalKey::new(work.id.clone(), level, chunk_index),
                    reason,
                });
            }
        }
    }
    backlog
}

/// Valid-record counts for `work`, overall and per level.
pub fn coverage_summary(
    work: &Work,
    chunks: &[Chunk],
    records: &[SimplificationRecord],
    policy: &CoveragePolicy,
) -> CoverageSummary {
    let indexed = index_records(work, records);
    let texts = index_chunks(chunks);
    let mut per_level: BTreeMap<CefrLevel, usize> =
        CefrLevel::ALL.iter().map(|level| (*level, 0)).collect();

    for ((level, chunk_index), record) in &indexed {
        if policy.is_valid(work, texts.get(chunk_index).copied(), record) {
            *per_level.entry(*level).or_default() += 1;
        }
    }

    CoverageSummary {
        work_id: work.id.clone(),
        total_chunks: work.total_chunks,
        expected: work.expected_slots(),
        valid: per_level.values().sum(),
        per_level,
    }
}
