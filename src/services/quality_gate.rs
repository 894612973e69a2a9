//! Quality gate for candidate simplifications.
//!
//! Every candidate passes through [`QualityGate::evaluate_with_signal`]
//! before it may be stored. The gate rejects echoes of the original text,
//! scores below the era/level threshold, and implausible length changes.
//! Dropped logical markers never reject; they are attached to the verdict as
//! warnings.

use std::sync::Arc;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    CefrLevel, EraLabel, MarkerCategory, PreservationIssue, QualityConfig, QualityThresholdTable,
    QualityVerdict, RejectionReason,
};
use crate::domain::ports::MarkerCounter;
use crate::services::content_markers::RegexMarkerCounter;
use crate::services::text::{is_identical, normalize_whitespace, vocabulary_similarity};

/// Numeric limits applied by the gate besides the threshold table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityPolicy {
    /// Lowest candidate/original word ratio accepted
    pub min_length_ratio: f64,
    /// Highest candidate/original word ratio accepted
    pub max_length_ratio: f64,
    /// Leading characters compared by the identical-text check
    pub identity_prefix_chars: usize,
    /// Markers a category may lose before a warning is raised
    pub preservation_tolerance: usize,
}

impl Default for QualityPolicy {
    fn default() -> Self {
        Self::from(&QualityConfig::default())
    }
}

impl From<&QualityConfig> for QualityPolicy {
    fn from(config: &QualityConfig) -> Self {
        Self {
            min_length_ratio: config.min_length_ratio,
            max_length_ratio: config.max_length_ratio,
            identity_prefix_chars: config.identity_prefix_chars,
            preservation_tolerance: config.preservation_tolerance,
        }
    }
}

/// Build the threshold table with configured overrides applied.
pub fn threshold_table(config: &QualityConfig) -> DomainResult<QualityThresholdTable> {
    let mut table = QualityThresholdTable::default();
    for cell in &config.threshold_overrides {
        let era = EraLabel::from_str(&cell.era).ok_or_else(|| {
            DomainError::ValidationFailed(format!("Unknown era in threshold override: {}", cell.era))
        })?;
        let level = CefrLevel::from_str(&cell.level).ok_or_else(|| {
            DomainError::ValidationFailed(format!(
                "Unknown level in threshold override: {}",
                cell.level
            ))
        })?;
        table.set(era, level, cell.min_score);
    }
    Ok(table)
}

/// Stateless validator shared by all scheduler workers.
#[derive(Clone)]
pub struct QualityGate {
    thresholds: QualityThresholdTable,
    policy: QualityPolicy,
    markers: Arc<dyn MarkerCounter>,
}

impl std::fmt::Debug for QualityGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QualityGate")
            .field("thresholds", &self.thresholds)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl QualityGate {
    /// Gate over an explicit table, policy and marker counter.
    pub fn new(
        thresholds: QualityThresholdTable,
        policy: QualityPolicy,
        markers: Arc<dyn MarkerCounter>,
    ) -> Self {
        Self {
            thresholds,
            policy,
            markers,
        }
    }

    /// Gate configured from the `quality` section, using the regex marker counter.
    pub fn from_config(config: &QualityConfig) -> DomainResult<Self> {
        Ok(Self::new(
            threshold_table(config)?,
            QualityPolicy::from(config),
            Arc::new(RegexMarkerCounter::new()),
        ))
    }

    /// Thresholds in force.
    pub fn thresholds(&self) -> &QualityThresholdTable {
        &self.thresholds
    }

    /// Numeric limits in force.
    pub fn policy(&self) -> &QualityPolicy {
        &self.policy
    }

    /// Evaluate a candidate using only the locally computed similarity.
    pub fn evaluate(
        &self,
        original: &str,
        candidate: &str,
        era: EraLabel,
        level: CefrLevel,
    ) -> QualityVerdict {
        self.evaluate_with_signal(original, candidate, era, level, None)
    }

    /// Evaluate a candidate, preferring a collaborator-reported score when present.
    ///
    /// Identical text is rejected before anything else and is the only reason
    /// reported in that case, whatever score the collaborator claimed.
    pub fn evaluate_with_signal(
        &self,
        original: &str,
        candidate: &str,
        era: EraLabel,
        level: CefrLevel,
        reported_quality: Option<f64>,
    ) -> QualityVerdict {
        let threshold = self.thresholds.threshold(era, level);
        let score = reported_quality
            .filter(|s| s.is_finite())
            .map_or_else(|| vocabulary_similarity(original, candidate), |s| s.clamp(0.0, 1.0));
        let length_ratio = length_ratio(original, candidate);

        if is_identical(original, candidate, self.policy.identity_prefix_chars) {
            return QualityVerdict {
                accepted: false,
                score,
                threshold,
                length_ratio,
                rejections: vec![RejectionReason::IdenticalText],
                preservation_issues: Vec::new(),
            };
        }

        let mut rejections = Vec::new();
        if score < threshold {
            rejections.push(RejectionReason::BelowThreshold { score, threshold });
        }
        if length_ratio < self.policy.min_length_ratio || length_ratio > self.policy.max_length_ratio {
            rejections.push(RejectionReason::LengthRatio {
                ratio: length_ratio,
                min: self.policy.min_length_ratio,
                max: self.policy.max_length_ratio,
            });
        }

        QualityVerdict {
            accepted: rejections.is_empty(),
            score,
            threshold,
            length_ratio,
            rejections,
            preservation_issues: self.preservation_issues(original, candidate),
        }
    }

    /// Marker categories whose count dropped by more than the tolerance.
    pub fn preservation_issues(&self, original: &str, candidate: &str) -> Vec<PreservationIssue> {
        let before = self.markers.count(original);
        let after = self.markers.count(candidate);

        MarkerCategory::ALL
            .into_iter()
            .filter_map(|category| {
                let original = before.get(category);
                let candidate = after.get(category);
                (original > candidate + self.policy.preservation_tolerance).then_some(
                    PreservationIssue {
                        category,
                        original,
                        candidate,
                    },
                )
            })
            .collect()
    }
}

/// Candidate length over original length, in characters after whitespace normalization.
pub fn length_ratio(original: &str, candidate: &str) -> f64 {
    let original = normalize_whitespace(original).chars().count();
    let candidate = normalize_whitespace(candidate).chars().count();
    candidate as f64 / original.max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ThresholdOverride;

    const ORIGINAL: &str = "The old captain never left the harbour because the winter storms \
                            were violent, and every sailor feared the northern sea.";

    fn gate() -> QualityGate {
        QualityGate::from_config(&QualityConfig::default()).unwrap()
    }

    #[test]
    fn test_accepts_reasonable_candidate() {
        let candidate = "The old captain never left the harbour because the winter storms \
                         were strong, and every sailor feared the sea.";
        let verdict = gate().evaluate(ORIGINAL, candidate, EraLabel::Contemporary, CefrLevel::B1);
        assert!(verdict.accepted, "{:?}", verdict.reasons());
        assert!(verdict.preservation_issues.is_empty());
    }

    #[test]
    fn test_identical_text_rejected_despite_high_reported_score() {
        let verdict = gate().evaluate_with_signal(
            ORIGINAL,
            &format!("  {ORIGINAL}\n"),
            EraLabel::Archaic,
            CefrLevel::A1,
            Some(0.99),
        );
        assert!(!verdict.accepted);
        assert!(verdict.is_identical_text());
        assert_eq!(verdict.rejections.len(), 1);
    }

    #[test]
    fn test_reported_score_below_threshold() {
        let candidate = "The captain stayed in the harbour in winter. The sea was dangerous.";
        let verdict = gate().evaluate_with_signal(
            ORIGINAL,
            candidate,
            EraLabel::Contemporary,
            CefrLevel::A1,
            Some(0.65),
        );
        assert!(!verdict.accepted);
        assert!(matches!(
            verdict.rejections[0],
            RejectionReason::BelowThreshold { threshold, .. } if (threshold - 0.70).abs() < 1e-9
        ));
        assert!(!verdict.is_identical_text());
    }

    #[test]
    fn test_score_equal_to_threshold_passes() {
        let candidate = "The captain stayed in the harbour in winter. The sea was dangerous.";
        let verdict = gate().evaluate_with_signal(
            ORIGINAL,
            candidate,
            EraLabel::Contemporary,
            CefrLevel::A1,
            Some(0.70),
        );
        assert!(verdict.accepted, "{:?}", verdict.reasons());
    }

    #[test]
    fn test_length_ratio_bounds() {
        let verdict = gate().evaluate_with_signal(
            ORIGINAL,
            "Captain stayed.",
            EraLabel::Contemporary,
            CefrLevel::A1,
            Some(0.95),
        );
        assert!(!verdict.accepted);
        assert!(verdict
            .rejections
            .iter()
            .any(|r| matches!(r, RejectionReason::LengthRatio { .. })));
    }

    #[test]
    fn test_dropped_markers_warn_without_rejecting() {
        let original = "If the ship does not sail, nobody will eat, because all food is gone. \
                        When the wind changes, unless it rains, no one will leave.";
        let candidate = "The ship sails and people eat. The food is gone. The wind changes \
                         and people leave the town in the morning light.";
        let verdict = gate().evaluate_with_signal(
            original,
            candidate,
            EraLabel::Contemporary,
            CefrLevel::A1,
            Some(0.9),
        );
        assert!(verdict.accepted, "{:?}", verdict.reasons());
        assert!(verdict
            .preservation_issues
            .iter()
            .any(|i| i.category == MarkerCategory::Negation));
        assert!(verdict
            .preservation_issues
            .iter()
            .any(|i| i.category == MarkerCategory::Conditional));
    }

    #[test]
    fn test_threshold_overrides() {
        let config = QualityConfig {
            threshold_overrides: vec![ThresholdOverride {
                era: "archaic".to_string(),
                level: "a1".to_string(),
                min_score: 0.99,
            }],
            ..QualityConfig::default()
        };
        let gate = QualityGate::from_config(&config).unwrap();
        assert!((gate.thresholds().threshold(EraLabel::Archaic, CefrLevel::A1) - 0.99).abs() < 1e-9);

        let bad = QualityConfig {
            threshold_overrides: vec![ThresholdOverride {
                era: "medieval".to_string(),
                level: "A1".to_string(),
                min_score: 0.5,
            }],
            ..QualityConfig::default()
        };
        assert!(QualityGate::from_config(&bad).is_err());
    }
}
