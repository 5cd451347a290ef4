//! Verification outcome returned for every validation attempt.

use serde::{Deserialize, Serialize};

/// Reason codes attached to non-confirmed outcomes.
pub mod reasons {
    /// Key or pin absent from the input or from the extracted text.
    pub const MISSING_DATA: &str = "MISSING_DATA";
    /// Codes present but outside the authority's shape constraints.
    pub const INVALID_INPUT_FORMAT: &str = "INVALID_INPUT_FORMAT";
    /// The request deadline elapsed before the authority answered.
    pub const TIMEOUT: &str = "TIMEOUT";
    /// Transport failure, caller cancellation, or an unreadable success body.
    pub const TEMPORARY_FAILURE: &str = "TEMPORARY_FAILURE";
    /// Authority answered with a 5xx status and no message.
    pub const SERVER_ERROR: &str = "SERVER_ERROR";
    /// Authority answered with a 4xx status and no message.
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
    /// Authority answered successfully but did not confirm the codes.
    pub const UNCONFIRMED_RESPONSE: &str = "UNCONFIRMED_RESPONSE";
}

/// Tri-state verification status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    /// The authority confirmed the key/pin pair.
    Confirmed,
    /// The pair is missing, malformed, rejected, or unconfirmed.
    Invalid,
    /// The authority could not be reached or failed on its side.
    Error,
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationStatus::Confirmed => write!(f, "CONFIRMED"),
            VerificationStatus::Invalid => write!(f, "INVALID"),
            VerificationStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Terminal artifact of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub status: VerificationStatus,

    /// Name of the provider that produced this outcome.
    pub provider: String,

    /// Reason code or upstream message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Upstream payload kept for diagnostics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl VerificationOutcome {
    pub fn confirmed(provider: impl Into<String>) -> Self {
        Self {
            status: VerificationStatus::Confirmed,
            provider: provider.into(),
            message: None,
            raw: None,
        }
    }

    pub fn invalid(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: VerificationStatus::Invalid,
            provider: provider.into(),
            message: Some(message.into()),
            raw: None,
        }
    }

    pub fn error(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: VerificationStatus::Error,
            provider: provider.into(),
            message: Some(message.into()),
            raw: None,
        }
    }

    /// Shorthand for the no-data short-circuit.
    pub fn missing_data(provider: impl Into<String>) -> Self {
        Self::invalid(provider, reasons::MISSING_DATA)
    }

    /// Attach the upstream payload.
    pub fn with_raw(mut self, raw: Option<serde_json::Value>) -> Self {
        self.raw = raw;
        self
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == VerificationStatus::Confirmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_outcome_json_shape() {
        let outcome = VerificationOutcome::invalid("BAI", reasons::MISSING_DATA);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "INVALID",
                "provider": "BAI",
                "message": "MISSING_DATA"
            })
        );
    }

    #[test]
    fn test_confirmed_omits_optionals() {
        let json = serde_json::to_string(&VerificationOutcome::confirmed("BAI")).unwrap();
        assert_eq!(json, r#"{"status":"CONFIRMED","provider":"BAI"}"#);
    }
}
