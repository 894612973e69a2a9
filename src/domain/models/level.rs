//! CEFR reading levels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the six ordered CEFR proficiency bands, A1 lowest to C2 highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CefrLevel {
    /// Beginner
    A1,
    /// Elementary
    A2,
    /// Intermediate
    B1,
    /// Upper intermediate
    B2,
    /// Advanced
    C1,
    /// Proficient
    C2,
}

impl CefrLevel {
    /// All levels in ascending order.
    pub const ALL: [Self; 6] = [Self::A1, Self::A2, Self::B1, Self::B2, Self::C1, Self::C2];

    /// Upper-case level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A1 => "A1",
            Self::A2 => "A2",
            Self::B1 => "B1",
            Self::B2 => "B2",
            Self::C1 => "C1",
            Self::C2 => "C2",
        }
    }

    /// Case-insensitive parse of a level name.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "A1" => Some(Self::A1),
            "A2" => Some(Self::A2),
            "B1" => Some(Self::B1),
            "B2" => Some(Self::B2),
            "C1" => Some(Self::C1),
            "C2" => Some(Self::C2),
            _ => None,
        }
    }

    /// Zero-based position in [`CefrLevel::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Short reader-facing description used when prompting the collaborator.
    pub fn description(&self) -> &'static str {
        match self {
            Self::A1 => "beginner: very short sentences, the most common 500 words, present tense",
            Self::A2 => "elementary: short sentences, everyday vocabulary, simple past and future",
            Self::B1 => "intermediate: clear connected sentences, common idioms explained",
            Self::B2 => "upper intermediate: natural prose, moderate complexity, rare words replaced",
            Self::C1 => "advanced: near-original prose with archaic or obscure phrasing modernized",
            Self::C2 => "proficient: original style and nuance kept, only the hardest passages eased",
        }
    }

    /// Parse a comma-separated level list such as `A1,B2`.
    pub fn parse_list(s: &str) -> Result<Vec<Self>, String> {
        let mut levels = Vec::new();
        for part in s.split(',').filter(|p| !p.trim().is_empty()) {
            let level = Self::from_str(part).ok_or_else(|| format!("unknown CEFR level: {}", part.trim()))?;
            if !levels.contains(&level) {
                levels.push(level);
            }
        }
        levels.sort();
        Ok(levels)
    }
}

impl fmt::Display for CefrLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(CefrLevel::A1 < CefrLevel::A2);
        assert!(CefrLevel::B2 < CefrLevel::C1);
        let mut sorted = CefrLevel::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, CefrLevel::ALL.to_vec());
    }

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!(CefrLevel::from_str("b1"), Some(CefrLevel::B1));
        assert_eq!(CefrLevel::from_str(" C2 "), Some(CefrLevel::C2));
        assert_eq!(CefrLevel::from_str("D1"), None);
    }

    #[test]
    fn test_parse_list_dedups_and_sorts() {
        let levels = CefrLevel::parse_list("C1,a1,C1").unwrap();
        assert_eq!(levels, vec![CefrLevel::A1, CefrLevel::C1]);
        assert!(CefrLevel::parse_list("A1,Z9").is_err());
    }

    #[test]
    fn test_serde_uses_codes() {
        let json = serde_json::to_string(&CefrLevel::B2).unwrap();
        assert_eq!(json, "\"B2\"");
    }
}
