//! Output formatting utilities for the CLI.

use comfy_table::{presets, Attribute, Cell, ContentArrangement, Table};
use serde::Serialize;

/// A command result printable as text or JSON.
pub trait CommandOutput: Serialize {
    /// Plain-text rendering for terminals.
    fn to_human(&self) -> String;
    /// Structured rendering for `--json`.
    fn to_json(&self) -> serde_json::Value;
}

/// Print `result` in the selected mode.
pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Truncate a string to at most `max_len` characters, appending "..." if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Table with the house style and a bold header row.
pub fn table_with_header(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    table
}

/// Percentage with one decimal, e.g. `87.5%`.
pub fn percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Ægir's hall of mirrors", 8), "Ægir'...");
    }

    #[test]
    fn test_table_renders_header() {
        let mut table = table_with_header(&["Work", "Era"]);
        table.add_row(vec!["moby-dick", "19th-century-formal"]);
        let rendered = table.to_string();
        assert!(rendered.contains("Work"));
        assert!(rendered.contains("moby-dick"));
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0.875), "87.5%");
    }
}
