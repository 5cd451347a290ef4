//! Per-request options passed by reference through the pipeline.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::Dispatch;

/// Default OCR language hint.
pub const DEFAULT_LANGUAGE: &str = "eng";

/// Options for a single validation request.
///
/// Nothing here outlives the request. The cancellation token, when present,
/// belongs to the caller: the pipeline observes it but never cancels it.
#[derive(Clone, Default)]
pub struct RequestContext {
    timeout: Option<Duration>,
    cancellation: Option<CancellationToken>,
    logger: Option<Dispatch>,
    language: Option<String>,
}

impl RequestContext {
    /// Create an empty context (provider defaults, no cancellation, no-op logger).
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the provider's default request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Same as [`with_timeout`](Self::with_timeout), in milliseconds.
    pub fn with_timeout_ms(self, timeout_ms: u64) -> Self {
        self.with_timeout(Duration::from_millis(timeout_ms))
    }

    /// Supply a caller-owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Route pipeline log events to the given subscriber.
    pub fn with_logger(mut self, logger: impl Into<Dispatch>) -> Self {
        self.logger = Some(logger.into());
        self
    }

    /// Route pipeline log events to whatever subscriber is current on this thread.
    pub fn with_current_logger(mut self) -> Self {
        self.logger = Some(tracing::dispatcher::get_default(|d| d.clone()));
        self
    }

    /// Set the OCR language hint.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    /// OCR language hint, `"eng"` when none was given.
    pub fn language(&self) -> &str {
        self.language.as_deref().unwrap_or(DEFAULT_LANGUAGE)
    }

    /// Logger for this request. Defaults to a dispatch that drops every event.
    pub fn logger(&self) -> Dispatch {
        self.logger.clone().unwrap_or_else(Dispatch::none)
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("timeout", &self.timeout)
            .field("cancellation", &self.cancellation.is_some())
            .field("logger", &self.logger.is_some())
            .field("language", &self.language)
            .finish()
    }
}
