//! Strategy interfaces for the text heuristics.
//!
//! Orchestration code depends only on these traits so the regex-based
//! defaults can be tuned or swapped without touching the scheduler.

use crate::domain::models::{EraLabel, MarkerCounts};

/// Assigns an era label from a prefix sample of a work.
pub trait EraClassifier: Send + Sync {
    /// Always returns a label; falls back to [`EraLabel::Contemporary`].
    fn classify(&self, sample: &str) -> EraLabel;
}

/// Counts content-preservation markers in a text.
pub trait MarkerCounter: Send + Sync {
    /// Count each marker category in `text`.
    fn count(&self, text: &str) -> MarkerCounts;
}
