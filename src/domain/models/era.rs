//! Era labels describing the historical style of a work's prose.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse historical-style classification of a work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EraLabel {
    /// Early modern English: thee/thou, -eth endings
    #[serde(rename = "archaic")]
    Archaic,
    /// Formal Victorian prose
    #[serde(rename = "19th-century-formal")]
    NineteenthCenturyFormal,
    /// 19th-century dialect and colloquial speech
    #[serde(rename = "19th-century-vernacular")]
    NineteenthCenturyVernacular,
    /// Modern prose; the fallback label
    #[serde(rename = "contemporary")]
    Contemporary,
}

impl EraLabel {
    /// Every label, oldest style first.
    pub const ALL: [Self; 4] = [
        Self::Archaic,
        Self::NineteenthCenturyFormal,
        Self::NineteenthCenturyVernacular,
        Self::Contemporary,
    ];

    /// Canonical serialized name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Archaic => "archaic",
            Self::NineteenthCenturyFormal => "19th-century-formal",
            Self::NineteenthCenturyVernacular => "19th-century-vernacular",
            Self::Contemporary => "contemporary",
        }
    }

    /// Parse a label name. Accepts the aliases `victorian`, `formal`, `vernacular` and `modern`.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "archaic" => Some(Self::Archaic),
            "19th-century-formal" | "victorian" | "formal" => Some(Self::NineteenthCenturyFormal),
            "19th-century-vernacular" | "vernacular" => Some(Self::NineteenthCenturyVernacular),
            "contemporary" | "modern" => Some(Self::Contemporary),
            _ => None,
        }
    }

    /// Prompt hint passed to the simplification collaborator.
    pub fn style_hint(&self) -> &'static str {
        match self {
            Self::Archaic => "Early modern English with thee/thou forms and -eth verb endings",
            Self::NineteenthCenturyFormal => "Formal 19th-century prose with long periodic sentences",
            Self::NineteenthCenturyVernacular => "19th-century dialect and colloquial speech",
            Self::Contemporary => "Modern English prose",
        }
    }
}

impl Default for EraLabel {
    fn default() -> Self {
        Self::Contemporary
    }
}

impl fmt::Display for EraLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
