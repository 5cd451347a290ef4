//! Banco BAI confirmation authority.
//!
//! The authority takes a 9-digit key ("chave") and an 8-digit pin from a
//! transfer receipt. Both are sent zero-padded to 9 digits and base64-encoded
//! twice, which is what its validator endpoint expects.

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use super::authority::{AuthorityConfig, AuthorityProvider, FieldEncoding, DEFAULT_TIMEOUT};
use super::transport::Transport;
use crate::extraction::PatternSet;

pub const BAI_NAME: &str = "BAI";
pub const BAI_ENDPOINT: &str = "https://validador.bancobai.ao/api/validate";

lazy_static! {
    // "chave"/"key" label required, tried before the bare key pattern
    pub static ref BAI_LABELED_KEY_PATTERN: Regex = Regex::new(
        r"(?i)\b(?:chave|key)\s*[:#.\-]?\s*(\d{3}[ .]?\d{3}[ .]?\d{3})\b"
    ).unwrap();

    // "pin" label required, tried before the bare pin pattern
    pub static ref BAI_LABELED_PIN_PATTERN: Regex = Regex::new(
        r"(?i)\bpin\s*[:#.\-]?\s*(\d{4}[ .]?\d{4})\b"
    ).unwrap();

    // Optional "chave"/"key" label, then 9 digits, groups of 3 may be split by a space or dot
    pub static ref BAI_KEY_PATTERN: Regex = Regex::new(
        r"(?i)(?:\b(?:chave|key)\s*[:#.\-]?\s*)?\b(\d{3}[ .]?\d{3}[ .]?\d{3})\b"
    ).unwrap();

    // Optional "pin" label, then 8 digits, halves may be split by a space or dot
    pub static ref BAI_PIN_PATTERN: Regex = Regex::new(
        r"(?i)(?:\bpin\s*[:#.\-]?\s*)?\b(\d{4}[ .]?\d{4})\b"
    ).unwrap();
}

/// Label-tolerant BAI patterns with the distinctness pass enabled.
///
/// Labeled codes win over bare digit runs anywhere in the text: receipts
/// often print a 9-digit phone number (`9XX XXX XXX`) above the key. Bare
/// runs are only used when no labeled code is present.
pub fn bai_patterns() -> PatternSet {
    PatternSet::new(Some(BAI_KEY_PATTERN.clone()), Some(BAI_PIN_PATTERN.clone())).with_preferred(
        Some(BAI_LABELED_KEY_PATTERN.clone()),
        Some(BAI_LABELED_PIN_PATTERN.clone()),
    )
}

/// Authority configuration for BAI at `endpoint`.
pub fn bai_config(endpoint: impl Into<String>) -> AuthorityConfig {
    AuthorityConfig {
        name: BAI_NAME.to_string(),
        endpoint: endpoint.into(),
        key_field: "VK0001".to_string(),
        pin_field: "VR0001".to_string(),
        field_width: 9,
        encoding: FieldEncoding::DoubleBase64,
        default_timeout: DEFAULT_TIMEOUT,
    }
}

/// The BAI provider over the given transport.
pub fn bai_provider(endpoint: impl Into<String>, transport: Arc<dyn Transport>) -> AuthorityProvider {
    AuthorityProvider::new(bai_config(endpoint), bai_patterns(), transport)
}
