//! Small text utilities shared by the heuristics, chunker and quality gate.

use std::collections::HashSet;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "been", "but", "by", "did", "do", "does", "for", "from",
    "had", "has", "have", "he", "her", "him", "his", "i", "in", "is", "it", "its", "me", "my", "of",
    "on", "or", "our", "she", "so", "than", "that", "the", "their", "them", "there", "they", "this",
    "to", "us", "was", "we", "were", "which", "who", "will", "with", "would", "you", "your",
];

/// Collapse every whitespace run into a single space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Number of whitespace-delimited words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Leading `max_chars` characters of `text`, cut on a char boundary.
pub fn sample_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Lower-cased words with surrounding punctuation stripped and stop words removed.
pub fn content_words(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Dice coefficient between the content-word sets of two texts.
///
/// Two texts with no content words at all are treated as identical (`1.0`).
pub fn vocabulary_similarity(original: &str, candidate: &str) -> f64 {
    let a = content_words(original);
    let b = content_words(candidate);
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let shared = a.intersection(&b).count();
    (2 * shared) as f64 / (a.len() + b.len()) as f64
}

/// Whether `candidate` echoes `original`: equal after whitespace normalization,
/// or equal across the first `prefix_chars` characters.
pub fn is_identical(original: &str, candidate: &str, prefix_chars: usize) -> bool {
    let original = normalize_whitespace(original);
    let candidate = normalize_whitespace(candidate);
    if original == candidate {
        return true;
    }
    if prefix_chars == 0 {
        return false;
    }
    let original_prefix = sample_prefix(&original, prefix_chars);
    let candidate_prefix = sample_prefix(&candidate, prefix_chars);
    original_prefix.chars().count() == prefix_chars && original_prefix == candidate_prefix
}
