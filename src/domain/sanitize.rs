//! Turns free caption text into a file name component.

use regex::Regex;
use std::sync::OnceLock;

/// Substituted when nothing usable survives sanitizing.
pub const PLACEHOLDER: &str = "untitled";

const ILLEGAL: [char; 10] = ['\n', '\r', '?', '*', ':', '|', '"', '<', '>', '/'];

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

fn underscores_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_+").expect("valid regex"))
}

/// Strip filesystem-illegal characters, turn whitespace runs into `_`,
/// collapse repeated `_` and trim them from both ends.
///
/// Idempotent, and never returns an empty string.
pub fn sanitize(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| !ILLEGAL.contains(c) && *c != '\\')
        .collect();
    let spaced = whitespace_re().replace_all(&stripped, "_");
    let collapsed = underscores_re().replace_all(&spaced, "_");
    let trimmed = collapsed.trim_matches('_');

    if trimmed.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Cut a sanitized component down to at most `max_bytes`, on a char boundary.
pub fn truncate_component(component: &str, max_bytes: usize) -> String {
    if component.len() <= max_bytes {
        return component.to_string();
    }
    let mut end = max_bytes;
    while !component.is_char_boundary(end) {
        end -= 1;
    }
    let cut = component[..end].trim_end_matches('_');
    if cut.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        cut.to_string()
    }
}
