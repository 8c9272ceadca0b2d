use regex::Regex;

/// Reference number as printed by the UN consolidated lists, e.g. `QDi.006`
/// (individual) or `TAe.012` (entity).
pub const REFERENCE_PATTERN: &str = r"[A-Z]{2}[ie]\.\d+";

pub fn normalize_whitespace(text: &str) -> String {
    text.replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits narrative list text in front of every reference number. The
/// reference itself is kept and starts the following chunk; blank chunks are
/// dropped.
pub fn split_entries<'a>(text: &'a str, boundary: &Regex) -> Vec<&'a str> {
    let mut chunks = Vec::new();
    let mut start = 0;

    for found in boundary.find_iter(text) {
        if found.start() > start {
            chunks.push(&text[start..found.start()]);
        }
        start = found.start();
    }
    chunks.push(&text[start..]);

    chunks
        .into_iter()
        .filter(|chunk| !chunk.trim().is_empty())
        .collect()
}

/// First `limit` characters of `text`, never splitting a code point.
pub fn excerpt(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
