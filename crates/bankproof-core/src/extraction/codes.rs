//! Pattern-based key/pin extraction from normalized text.

use regex::Regex;
use serde::Serialize;
use tracing::{debug, trace};

/// Match rules a provider uses to locate its codes in free text.
///
/// Each field has its rules in priority order: every match of the first rule
/// is tried before the next rule is consulted. A rule may carry a capture
/// group; when it participates in a match the group is used instead of the
/// whole match. A field without rules is never extracted.
#[derive(Debug, Clone)]
pub struct PatternSet {
    key: Vec<Regex>,
    pin: Vec<Regex>,
    distinct: bool,
}

impl PatternSet {
    /// Create a pattern set. Distinctness between key and pin is on.
    pub fn new(key: Option<Regex>, pin: Option<Regex>) -> Self {
        Self {
            key: key.into_iter().collect(),
            pin: pin.into_iter().collect(),
            distinct: true,
        }
    }

    /// Add rules tried before the existing ones, e.g. label-anchored variants
    /// of looser fallback patterns.
    pub fn with_preferred(mut self, key: Option<Regex>, pin: Option<Regex>) -> Self {
        if let Some(key) = key {
            self.key.insert(0, key);
        }
        if let Some(pin) = pin {
            self.pin.insert(0, pin);
        }
        self
    }

    /// Set whether the pin may reuse the digits already taken by the key.
    pub fn with_distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    pub fn key_patterns(&self) -> &[Regex] {
        &self.key
    }

    pub fn pin_patterns(&self) -> &[Regex] {
        &self.pin
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }
}

/// Codes recovered from a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedCodes {
    /// Digit-only key, if found.
    pub key: Option<String>,
    /// Digit-only pin, if found.
    pub pin: Option<String>,
    /// The normalized text the codes were searched in.
    pub normalized_text: String,
}

impl ExtractedCodes {
    /// Both codes were found.
    pub fn is_complete(&self) -> bool {
        self.key.is_some() && self.pin.is_some()
    }
}

/// Keep only ASCII digits. `None` when nothing is left.
pub fn digits_only(value: &str) -> Option<String> {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() { None } else { Some(digits) }
}

/// Find the first match of `pattern` that yields digits, skipping `disallow`.
fn pick_distinct(text: &str, pattern: &Regex, disallow: Option<&str>) -> Option<String> {
    for caps in pattern.captures_iter(text) {
        let candidate = match caps.get(1).or_else(|| caps.get(0)) {
            Some(m) => m.as_str(),
            None => continue,
        };

        let Some(digits) = digits_only(candidate) else {
            continue;
        };

        if disallow == Some(digits.as_str()) {
            trace!("Skipping candidate {} already used as key", digits);
            continue;
        }

        return Some(digits);
    }
    None
}

/// First rule in priority order that yields a candidate.
fn pick_first(text: &str, rules: &[Regex], disallow: Option<&str>) -> Option<String> {
    rules
        .iter()
        .find_map(|pattern| pick_distinct(text, pattern, disallow))
}

/// Extract key and pin from already-normalized text.
pub fn extract_codes(normalized_text: &str, patterns: &PatternSet) -> ExtractedCodes {
    let key = pick_first(normalized_text, patterns.key_patterns(), None);

    let disallow = if patterns.is_distinct() { key.as_deref() } else { None };
    let pin = pick_first(normalized_text, patterns.pin_patterns(), disallow);

    debug!(
        "Code extraction: key {}, pin {} in {} chars",
        if key.is_some() { "found" } else { "missing" },
        if pin.is_some() { "found" } else { "missing" },
        normalized_text.len()
    );

    ExtractedCodes {
        key,
        pin,
        normalized_text: normalized_text.to_string(),
    }
}
