//! Whitespace normalization of recognized text.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

/// Collapse line endings and whitespace runs into single spaces.
///
/// CRLF becomes LF first, then every whitespace run (newlines included)
/// becomes one space, then the result is trimmed. Idempotent.
pub fn normalize_text(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n");
    WHITESPACE_RUN.replace_all(&unified, " ").trim().to_string()
}
