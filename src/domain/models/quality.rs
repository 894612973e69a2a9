//! Quality gate verdicts, thresholds, and failure classification.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::era::EraLabel;
use super::level::CefrLevel;

/// Hard reasons a candidate is refused by the quality gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    /// The collaborator echoed its input instead of transforming it.
    IdenticalText,
    /// Score under the (era, level) threshold.
    BelowThreshold {
        /// Score the candidate earned
        score: f64,
        /// Minimum for the item's era and level
        threshold: f64,
    },
    /// Candidate length is implausible next to the original.
    LengthRatio {
        /// Candidate words over original words
        ratio: f64,
        /// Lowest accepted ratio
        min: f64,
        /// Highest accepted ratio
        max: f64,
    },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdenticalText => f.write_str("identical text"),
            Self::BelowThreshold { score, threshold } => {
                write!(f, "low quality: score {score:.3} below threshold {threshold:.3}")
            }
            Self::LengthRatio { ratio, min, max } => {
                write!(f, "length ratio {ratio:.2} outside [{min:.2}, {max:.2}]")
            }
        }
    }
}

/// Marker families counted by the content-preservation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerCategory {
    /// not, never, nobody
    Negation,
    /// if, unless, provided that
    Conditional,
    /// all, some, every, most
    Quantifier,
    /// before, after, until, when
    Temporal,
    /// because, therefore, so that
    Causal,
    /// Rough count of named entities and numbers
    Entity,
}

impl MarkerCategory {
    /// Every category in report order.
    pub const ALL: [Self; 6] = [
        Self::Negation,
        Self::Conditional,
        Self::Quantifier,
        Self::Temporal,
        Self::Causal,
        Self::Entity,
    ];

    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Negation => "negation",
            Self::Conditional => "conditional",
            Self::Quantifier => "quantifier",
            Self::Temporal => "temporal",
            Self::Causal => "causal",
            Self::Entity => "entity",
        }
    }
}

/// Occurrence counts for each marker category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerCounts {
    counts: HashMap<MarkerCategory, usize>,
}

impl MarkerCounts {
    /// Count for `category`, zero when absent.
    pub fn get(&self, category: MarkerCategory) -> usize {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    /// Replace the count for `category`.
    pub fn set(&mut self, category: MarkerCategory, count: usize) {
        self.counts.insert(category, count);
    }
}

/// A marker category the candidate dropped beyond tolerance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreservationIssue {
    /// Category that lost markers
    pub category: MarkerCategory,
    /// Markers in the original
    pub original: usize,
    /// Markers left in the candidate
    pub candidate: usize,
}

impl fmt::Display for PreservationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} markers dropped ({} -> {})",
            self.category.as_str(),
            self.original,
            self.candidate
        )
    }
}

/// Outcome of evaluating one (original, candidate) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityVerdict {
    /// Whether the candidate may be stored
    pub accepted: bool,
    /// Reported or computed score in `0.0..=1.0`
    pub score: f64,
    /// Threshold the score was compared against
    pub threshold: f64,
    /// Candidate words over original words
    pub length_ratio: f64,
    /// Hard reasons the candidate was refused
    pub rejections: Vec<RejectionReason>,
    /// Soft warnings; never block acceptance
    pub preservation_issues: Vec<PreservationIssue>,
}

impl QualityVerdict {
    /// Human-readable reasons, hard rejections first.
    pub fn reasons(&self) -> Vec<String> {
        self.rejections
            .iter()
            .map(ToString::to_string)
            .chain(self.preservation_issues.iter().map(ToString::to_string))
            .collect()
    }

    /// Whether the candidate was refused for echoing its input.
    pub fn is_identical_text(&self) -> bool {
        self.rejections.contains(&RejectionReason::IdenticalText)
    }
}

/// Error taxonomy used by the retry policy and the run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Network, timeout, or non-success status from the collaborator
    Transport,
    /// Successful response with empty or missing candidate text
    Content,
    /// Candidate refused by the quality gate
    Quality,
    /// The result store could not persist an accepted result
    Storage,
}

impl FailureClass {
    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Content => "content",
            Self::Quality => "quality",
            Self::Storage => "storage",
        }
    }

    /// Parse a snake_case class name.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "transport" => Some(Self::Transport),
            "content" => Some(Self::Content),
            "quality" => Some(Self::Quality),
            "storage" => Some(Self::Storage),
            _ => None,
        }
    }

    /// Transport and content failures suggest the collaborator itself is unhealthy.
    pub fn counts_toward_breaker(&self) -> bool {
        matches!(self, Self::Transport | Self::Content)
    }
}

/// Static lookup from (era, level) to the minimum acceptable quality score.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityThresholdTable {
    rows: HashMap<EraLabel, [f64; 6]>,
}

impl QualityThresholdTable {
    /// Minimum score for `era` at `level`.
    ///
    /// Unknown eras fall back to the contemporary row.
    pub fn threshold(&self, era: EraLabel, level: CefrLevel) -> f64 {
        self.rows
            .get(&era)
            .or_else(|| self.rows.get(&EraLabel::Contemporary))
            .map_or(0.75, |row| row[level.index()])
    }

    /// Override a single cell.
    pub fn set(&mut self, era: EraLabel, level: CefrLevel, min_score: f64) {
        let row = self.rows.entry(era).or_insert([0.75; 6]);
        row[level.index()] = min_score;
    }
}

impl Default for QualityThresholdTable {
    fn default() -> Self {
        let rows = HashMap::from([
            (EraLabel::Archaic, [0.45, 0.50, 0.58, 0.66, 0.72, 0.78]),
            (EraLabel::NineteenthCenturyFormal, [0.50, 0.55, 0.62, 0.70, 0.75, 0.80]),
            (EraLabel::NineteenthCenturyVernacular, [0.52, 0.57, 0.64, 0.70, 0.75, 0.80]),
            (EraLabel::Contemporary, [0.70, 0.72, 0.75, 0.78, 0.80, 0.82]),
        ]);
        Self { rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archaic_thresholds_start_lower_and_converge() {
        let table = QualityThresholdTable::default();
        let archaic_a1 = table.threshold(EraLabel::Archaic, CefrLevel::A1);
        let modern_a1 = table.threshold(EraLabel::Contemporary, CefrLevel::A1);
        assert!(archaic_a1 < modern_a1);

        for era in EraLabel::ALL {
            let mut previous = 0.0;
            for level in CefrLevel::ALL {
                let t = table.threshold(era, level);
                assert!(t >= previous, "{era}/{level} should not decrease");
                previous = t;
            }
        }
    }

    #[test]
    fn test_override_cell() {
        let mut table = QualityThresholdTable::default();
        table.set(EraLabel::Archaic, CefrLevel::B1, 0.9);
        assert!((table.threshold(EraLabel::Archaic, CefrLevel::B1) - 0.9).abs() < f64::EPSILON);
        assert!((table.threshold(EraLabel::Archaic, CefrLevel::B2) - 0.66).abs() < f64::EPSILON);
    }

    #[test]
    fn test_identical_reason_text() {
        assert_eq!(RejectionReason::IdenticalText.to_string(), "identical text");
    }

    #[test]
    fn test_breaker_classes() {
        assert!(FailureClass::Transport.counts_toward_breaker());
        assert!(FailureClass::Content.counts_toward_breaker());
        assert!(!FailureClass::Quality.counts_toward_breaker());
        assert!(!FailureClass::Storage.counts_toward_breaker());
    }
}
