//! Public entry points tying extraction and verification together.

use serde::Deserialize;
use tracing::instrument::WithSubscriber;
use tracing::{debug, info};

use crate::context::RequestContext;
use crate::extraction::{extract_codes, normalize_text, ExtractedCodes, ExtractionOrchestrator, PatternSet};
use crate::models::outcome::VerificationOutcome;
use crate::provider::VerificationProvider;

/// Typed key/pin input, as supplied by a user instead of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CodeInput {
    #[serde(default, alias = "chave")]
    pub key: Option<String>,
    #[serde(default)]
    pub pin: Option<String>,
}

impl CodeInput {
    pub fn new(key: impl Into<String>, pin: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            pin: Some(pin.into()),
        }
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Extraction-and-validation pipeline.
#[derive(Debug, Clone)]
pub struct BankProof {
    orchestrator: ExtractionOrchestrator,
}

impl BankProof {
    pub fn new(orchestrator: ExtractionOrchestrator) -> Self {
        Self { orchestrator }
    }

    /// Pipeline over the native PDF and OCR extractors.
    #[cfg(feature = "native")]
    pub fn native(config: &crate::models::config::BankProofConfig) -> Self {
        Self::new(ExtractionOrchestrator::native(config))
    }

    /// Validate typed codes. Missing or blank codes never reach the provider.
    pub async fn validate_codes(
        input: &CodeInput,
        provider: &dyn VerificationProvider,
        ctx: &RequestContext,
    ) -> VerificationOutcome {
        Self::validate_present(input.key.as_deref(), input.pin.as_deref(), provider, ctx)
            .with_subscriber(ctx.logger())
            .await
    }

    /// Run extraction only, returning the codes found with `patterns`.
    pub async fn extract_codes(
        &self,
        document: Vec<u8>,
        patterns: &PatternSet,
        ctx: &RequestContext,
    ) -> ExtractedCodes {
        self.extract(document, patterns, ctx)
            .with_subscriber(ctx.logger())
            .await
    }

    /// Extract the provider's codes from a document and validate them.
    pub async fn extract_and_validate(
        &self,
        document: Vec<u8>,
        provider: &dyn VerificationProvider,
        ctx: &RequestContext,
    ) -> VerificationOutcome {
        async {
            let codes = self.extract(document, provider.patterns(), ctx).await;
            Self::validate_present(codes.key.as_deref(), codes.pin.as_deref(), provider, ctx).await
        }
        .with_subscriber(ctx.logger())
        .await
    }

    async fn extract(&self, document: Vec<u8>, patterns: &PatternSet, ctx: &RequestContext) -> ExtractedCodes {
        let text = self.orchestrator.extract_text(&document, ctx.language()).await;
        drop(document);

        let codes = extract_codes(&normalize_text(&text), patterns);
        info!(
            key_found = codes.key.is_some(),
            pin_found = codes.pin.is_some(),
            "codes extracted from document"
        );
        codes
    }

    async fn validate_present(
        key: Option<&str>,
        pin: Option<&str>,
        provider: &dyn VerificationProvider,
        ctx: &RequestContext,
    ) -> VerificationOutcome {
        let (Some(key), Some(pin)) = (present(key), present(pin)) else {
            debug!(provider = provider.name(), "missing key or pin, provider not called");
            return VerificationOutcome::missing_data(provider.name());
        };
        provider.verify(key, pin, ctx).await
    }
}
