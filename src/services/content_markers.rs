//! Logical content markers used by the preservation check.

use regex::Regex;
use std::sync::LazyLock;

use crate::domain::models::{MarkerCategory, MarkerCounts};
use crate::domain::ports::MarkerCounter;

static NEGATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:not|no|never|nothing|nobody|none|neither|nor|nowhere|cannot)\b|n[’']t\b")
        .expect("valid negation pattern")
});

static CONDITIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:if|unless|whether|otherwise|provided that|in case)\b")
        .expect("valid conditional pattern")
});

static QUANTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:all|every|each|some|many|few|several|most|any|both|much|only|whole)\b")
        .expect("valid quantifier pattern")
});

static TEMPORAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:when|whenever|before|after|while|until|till|since|then|meanwhile|afterwards|later|soon)\b",
    )
    .expect("valid temporal pattern")
});

static CAUSAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:because|therefore|thus|hence|consequently|so that|as a result|due to|owing to|for this reason)\b",
    )
    .expect("valid causal pattern")
});

/// Counts negations, conditionals, quantifiers, temporal and causal
/// connectives, and named entities (mid-sentence capitals and numbers).
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexMarkerCounter;

impl RegexMarkerCounter {
    /// Counter over the built-in English marker patterns.
    pub fn new() -> Self {
        Self
    }
}

fn count_entities(text: &str) -> usize {
    let mut count = 0;
    let mut sentence_start = true;

    for token in text.split_whitespace() {
        let word = token.trim_matches(|c: char| !c.is_alphanumeric());
        if word.chars().any(|c| c.is_ascii_digit()) {
            count += 1;
        } else if !sentence_start && word != "I" && word.chars().next().is_some_and(char::is_uppercase) {
            count += 1;
        }

        sentence_start = token
            .trim_end_matches(['"', '\'', ')', '”', '’'])
            .ends_with(['.', '!', '?']);
    }

    count
}

impl MarkerCounter for RegexMarkerCounter {
    fn count(&self, text: &str) -> MarkerCounts {
        let mut counts = MarkerCounts::default();
        for category in MarkerCategory::ALL {
            let n = match category {
                MarkerCategory::Negation => NEGATION.find_iter(text).count(),
                MarkerCategory::Conditional => CONDITIONAL.find_iter(text).count(),
                MarkerCategory::Quantifier => QUANTIFIER.find_iter(text).count(),
                MarkerCategory::Temporal => TEMPORAL.find_iter(text).count(),
                MarkerCategory::Causal => CAUSAL.find_iter(text).count(),
                MarkerCategory::Entity => count_entities(text),
            };
            counts.set(category, n);
        }
        counts
    }
}
