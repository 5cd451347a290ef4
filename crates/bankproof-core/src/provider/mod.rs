//! Verification providers and the registry that selects them by name.

pub mod authority;
pub mod bai;
mod transport;

pub use authority::{
    canonicalize_code, AuthorityConfig, AuthorityProvider, ConfirmationPolicy, ErrorFlagPolicy,
    FieldEncoding,
};
pub use transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::context::RequestContext;
use crate::error::{BankProofError, Result};
use crate::extraction::PatternSet;
use crate::models::config::BankProofConfig;
use crate::models::outcome::VerificationOutcome;

/// A verification authority the pipeline can confirm codes against.
///
/// Providers are stateless beyond their fixed configuration, so one instance
/// serves any number of concurrent requests.
#[async_trait]
pub trait VerificationProvider: Send + Sync {
    /// Name reported in every outcome.
    fn name(&self) -> &str;

    /// Patterns locating this provider's codes in document text.
    fn patterns(&self) -> &PatternSet;

    /// Confirm a key/pin pair. Expected failures are outcomes, never panics.
    async fn verify(&self, key: &str, pin: &str, ctx: &RequestContext) -> VerificationOutcome;
}

/// Immutable name → provider map, built once at startup.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn VerificationProvider>>,
}

/// Builder for [`ProviderRegistry`].
#[derive(Default)]
pub struct ProviderRegistryBuilder {
    providers: BTreeMap<String, Arc<dyn VerificationProvider>>,
}

impl ProviderRegistryBuilder {
    /// Register a provider under its own name. A later provider with the same
    /// name replaces the earlier one.
    pub fn with_provider(mut self, provider: Arc<dyn VerificationProvider>) -> Self {
        self.providers.insert(provider.name().to_ascii_uppercase(), provider);
        self
    }

    pub fn build(self) -> ProviderRegistry {
        ProviderRegistry {
            providers: self.providers,
        }
    }
}

impl ProviderRegistry {
    pub fn builder() -> ProviderRegistryBuilder {
        ProviderRegistryBuilder::default()
    }

    /// Registry with the built-in providers, talking HTTP through `reqwest`.
    pub fn from_config(config: &BankProofConfig) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new()?);
        let bai = bai::bai_provider(config.verification.bai_endpoint.clone(), transport);

        debug!("Registered provider {} at {}", bai.name(), config.verification.bai_endpoint);
        Ok(Self::builder().with_provider(Arc::new(bai)).build())
    }

    /// Look up a provider, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Result<Arc<dyn VerificationProvider>> {
        self.providers
            .get(&name.to_ascii_uppercase())
            .cloned()
            .ok_or_else(|| BankProofError::UnknownProvider(name.to_string()))
    }

    /// Registered provider names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.providers.values().map(|p| p.name()).collect()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}
