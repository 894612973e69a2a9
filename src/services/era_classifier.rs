//! Lexical era detection.
//!
//! Scores a text sample against marker vocabularies for each era and picks
//! the best-scoring label. Ties and samples with no signal fall back to
//! [`EraLabel::Contemporary`].

use regex::Regex;
use std::sync::LazyLock;

use crate::domain::models::EraLabel;
use crate::domain::ports::EraClassifier;
use crate::services::text::sample_prefix;

static ARCHAIC_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:thou|thee|thy|thine|hath|doth|dost|art|wherefore|whence|hither|thither|ere|nay|prithee|methinks|forsooth|shalt|wilt|canst|wouldst|couldst|shouldst)\b|'(?:tis|twas)\b",
    )
    .expect("valid era marker pattern")
});

static FORMAL_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:whilst|amongst|upon|shall|indeed|therefore|hence|henceforth|notwithstanding|perceive|countenance|acquaintance|endeavour|sentiment|propriety|exceedingly|wholly|herewith|thereupon|forthwith)\b",
    )
    .expect("valid era marker pattern")
});

static VERNACULAR_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:ain't|dunno|gonna|ye|warn't|reckon|yonder|t'other|cain't|hain't|kin|fixin)\b|\b(?:nothin|somethin|ol)'|'em\b",
    )
    .expect("valid era marker pattern")
});

static CONTEMPORARY_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:okay|ok|phone|email|internet|computer|car|television|tv|online|website|smartphone|app|laptop|don't|can't|won't|it's|I'm|you're|we're|they're)\b",
    )
    .expect("valid era marker pattern")
});

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("valid era marker pattern"));

/// Average words per sentence above which formal prose gets a bonus.
const LONG_SENTENCE_WORDS: f64 = 28.0;

/// Per-era marker scores for a sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EraScores {
    /// Archaic markers per 100 words
    pub archaic: f64,
    /// Formal 19th-century markers per 100 words
    pub formal: f64,
    /// Vernacular markers per 100 words
    pub vernacular: f64,
    /// Contemporary markers per 100 words
    pub contemporary: f64,
}

impl EraScores {
    /// Label with the strictly highest score; ties and all-zero go contemporary.
    pub fn best(&self) -> EraLabel {
        let ranked = [
            (EraLabel::Archaic, self.archaic),
            (EraLabel::NineteenthCenturyFormal, self.formal),
            (EraLabel::NineteenthCenturyVernacular, self.vernacular),
            (EraLabel::Contemporary, self.contemporary),
        ];

        let top = ranked.iter().map(|(_, s)| *s).fold(0.0_f64, f64::max);
        if top <= 0.0 {
            return EraLabel::Contemporary;
        }

        let mut leaders = ranked.iter().filter(|(_, s)| (*s - top).abs() < f64::EPSILON);
        match (leaders.next(), leaders.next()) {
            (Some((label, _)), None) => *label,
            _ => EraLabel::Contemporary,
        }
    }
}

/// Regex-driven [`EraClassifier`] working on a bounded prefix of the text.
#[derive(Debug, Clone)]
pub struct LexicalEraClassifier {
    sample_chars: usize,
}

impl LexicalEraClassifier {
    /// Classifier sampling the first `sample_chars` characters.
    pub fn new(sample_chars: usize) -> Self {
        Self { sample_chars }
    }

    /// Marker density per 100 words for every era.
    pub fn score(&self, text: &str) -> EraScores {
        let sample = sample_prefix(text, self.sample_chars);
        let words = sample.split_whitespace().count();
        if words == 0 {
            return EraScores::default();
        }

        let density = |re: &Regex| re.find_iter(sample).count() as f64 * 100.0 / words as f64;

        let sentences = SENTENCE_END.find_iter(sample).count().max(1);
        let avg_sentence = words as f64 / sentences as f64;
        let long_sentence_bonus = if avg_sentence > LONG_SENTENCE_WORDS {
            0.5
        } else {
            0.0
        };

        EraScores {
            archaic: density(&ARCHAIC_MARKERS),
            formal: density(&FORMAL_MARKERS) + long_sentence_bonus,
            vernacular: density(&VERNACULAR_MARKERS),
            contemporary: density(&CONTEMPORARY_MARKERS),
        }
    }
}

impl Default for LexicalEraClassifier {
    fn default() -> Self {
        Self::new(2000)
    }
}

impl EraClassifier for LexicalEraClassifier {
    fn classify(&self, sample: &str) -> EraLabel {
        let scores = self.score(sample);
        let label = scores.best();
        tracing::debug!(?scores, era = %label, "Classified text era");
        label
    }
}
