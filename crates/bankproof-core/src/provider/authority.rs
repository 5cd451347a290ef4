//! Generic confirmation-authority provider.
//!
//! An authority receives the key and pin as fixed-width digit strings in a
//! JSON body and answers with a payload whose shape decides confirmation.
//! Everything authority-specific (endpoint, field names, width, encoding,
//! confirmation heuristic) lives in [`AuthorityConfig`] and the provider's
//! [`ConfirmationPolicy`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use super::transport::{Transport, TransportRequest, TransportResponse};
use super::VerificationProvider;
use crate::context::RequestContext;
use crate::error::TransportError;
use crate::extraction::{digits_only, PatternSet};
use crate::models::outcome::{reasons, VerificationOutcome};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// How each canonical field is written into the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEncoding {
    /// Digits as-is.
    Plain,
    /// Standard base64 of the digits.
    Base64,
    /// Base64 of the base64 text. Only the BAI authority expects this.
    DoubleBase64,
}

impl FieldEncoding {
    pub fn encode(&self, value: &str) -> String {
        match self {
            FieldEncoding::Plain => value.to_string(),
            FieldEncoding::Base64 => STANDARD.encode(value),
            FieldEncoding::DoubleBase64 => STANDARD.encode(STANDARD.encode(value)),
        }
    }
}

/// Decides whether a successful (non 4xx/5xx) payload confirms the codes.
pub trait ConfirmationPolicy: Send + Sync {
    fn is_confirmed(&self, payload: &Value) -> bool;
}

/// Confirmed unless the payload is falsy or carries a truthy error flag.
#[derive(Debug, Clone)]
pub struct ErrorFlagPolicy {
    field: String,
}

impl ErrorFlagPolicy {
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into() }
    }
}

impl Default for ErrorFlagPolicy {
    fn default() -> Self {
        Self::new("error")
    }
}

impl ConfirmationPolicy for ErrorFlagPolicy {
    fn is_confirmed(&self, payload: &Value) -> bool {
        if !is_truthy(payload) {
            return false;
        }
        match payload {
            Value::Object(map) => !map.get(&self.field).is_some_and(is_truthy),
            _ => true,
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Fixed configuration of one authority.
#[derive(Debug, Clone)]
pub struct AuthorityConfig {
    /// Provider name reported in outcomes.
    pub name: String,
    /// Endpoint receiving the POST.
    pub endpoint: String,
    /// JSON key for the key code.
    pub key_field: String,
    /// JSON key for the pin code.
    pub pin_field: String,
    /// Fixed width both codes are zero-padded to; longer codes are rejected.
    pub field_width: usize,
    pub encoding: FieldEncoding,
    /// Used when the request context sets no timeout.
    pub default_timeout: Duration,
}

/// Reduce a code to its canonical zero-padded digit form.
///
/// Separators (spaces, dots, dashes) are dropped; letters or more than
/// `width` digits make the code invalid.
pub fn canonicalize_code(value: &str, width: usize) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.chars().any(char::is_alphabetic) {
        return None;
    }
    let digits = digits_only(trimmed)?;
    if digits.len() > width {
        return None;
    }
    Some(format!("{:0>width$}", digits, width = width))
}

/// Cancellation handle for one request: the caller's, or one we own.
enum RequestCancellation {
    Borrowed(CancellationToken),
    Owned {
        token: CancellationToken,
        // cancels `token` when the request scope ends, whatever the exit path
        _guard: DropGuard,
    },
}

impl RequestCancellation {
    fn acquire(caller: Option<&CancellationToken>) -> Self {
        match caller {
            Some(token) => RequestCancellation::Borrowed(token.clone()),
            None => {
                let token = CancellationToken::new();
                let guard = token.clone().drop_guard();
                RequestCancellation::Owned { token, _guard: guard }
            }
        }
    }

    fn token(&self) -> &CancellationToken {
        match self {
            RequestCancellation::Borrowed(token) => token,
            RequestCancellation::Owned { token, .. } => token,
        }
    }

    /// Fire the token if we own it. A borrowed token is never cancelled here.
    fn cancel_owned(&self) {
        if let RequestCancellation::Owned { token, .. } = self {
            token.cancel();
        }
    }
}

/// Why an exchange produced no response.
#[derive(Debug)]
enum Interruption {
    TimedOut,
    Cancelled,
    Transport(TransportError),
}

/// Provider for a confirmation authority reached over a [`Transport`].
pub struct AuthorityProvider {
    config: AuthorityConfig,
    patterns: PatternSet,
    transport: Arc<dyn Transport>,
    policy: Arc<dyn ConfirmationPolicy>,
}

impl AuthorityProvider {
    /// Create a provider with the default [`ErrorFlagPolicy`].
    pub fn new(config: AuthorityConfig, patterns: PatternSet, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            patterns,
            transport,
            policy: Arc::new(ErrorFlagPolicy::default()),
        }
    }

    /// Replace the confirmation heuristic.
    pub fn with_confirmation_policy(mut self, policy: Arc<dyn ConfirmationPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &AuthorityConfig {
        &self.config
    }

    fn request_body(&self, key: &str, pin: &str) -> Value {
        let encoding = self.config.encoding;
        let mut body = Map::new();
        body.insert(self.config.pin_field.clone(), Value::String(encoding.encode(pin)));
        body.insert(self.config.key_field.clone(), Value::String(encoding.encode(key)));
        Value::Object(body)
    }

    async fn exchange(
        &self,
        request: TransportRequest,
        caller: Option<&CancellationToken>,
    ) -> Result<TransportResponse, Interruption> {
        let cancellation = RequestCancellation::acquire(caller);
        let token = cancellation.token().clone();
        let deadline = tokio::time::sleep(request.timeout);

        // The deadline timer and the in-flight request are dropped with this scope.
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(Interruption::Cancelled),
            _ = deadline => {
                cancellation.cancel_owned();
                Err(Interruption::TimedOut)
            }
            result = self.transport.post_json(request, token.clone()) => match result {
                Ok(response) => Ok(response),
                Err(TransportError::Timeout) => Err(Interruption::TimedOut),
                Err(TransportError::Cancelled) => Err(Interruption::Cancelled),
                Err(e) => Err(Interruption::Transport(e)),
            },
        }
    }

    fn classify(&self, response: TransportResponse) -> VerificationOutcome {
        let name = self.config.name.as_str();
        let payload: Option<Value> = if response.body.is_empty() {
            None
        } else {
            serde_json::from_slice(&response.body).ok()
        };
        let message = payload.as_ref().and_then(payload_message);

        match response.status {
            500..=599 => VerificationOutcome::error(name, message.unwrap_or_else(|| reasons::SERVER_ERROR.to_string()))
                .with_raw(payload),
            400..=499 => VerificationOutcome::invalid(name, message.unwrap_or_else(|| reasons::INVALID_REQUEST.to_string()))
                .with_raw(payload),
            _ => match payload {
                None => {
                    warn!("{}: success status {} with unreadable body", name, response.status);
                    VerificationOutcome::error(name, reasons::TEMPORARY_FAILURE)
                }
                Some(payload) if self.policy.is_confirmed(&payload) => {
                    VerificationOutcome::confirmed(name).with_raw(Some(payload))
                }
                Some(payload) => {
                    VerificationOutcome::invalid(name, reasons::UNCONFIRMED_RESPONSE).with_raw(Some(payload))
                }
            },
        }
    }
}

fn payload_message(payload: &Value) -> Option<String> {
    payload
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl VerificationProvider for AuthorityProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    async fn verify(&self, key: &str, pin: &str, ctx: &RequestContext) -> VerificationOutcome {
        let name = self.name();
        let width = self.config.field_width;

        let (Some(key), Some(pin)) = (canonicalize_code(key, width), canonicalize_code(pin, width)) else {
            warn!("{}: codes rejected before request (expected 1-{} digits)", name, width);
            return VerificationOutcome::invalid(name, reasons::INVALID_INPUT_FORMAT);
        };

        let timeout = ctx.timeout().unwrap_or(self.config.default_timeout);
        let request = TransportRequest {
            url: self.config.endpoint.clone(),
            body: self.request_body(&key, &pin),
            timeout,
        };
        debug!(
            provider = name,
            endpoint = %self.config.endpoint,
            timeout_ms = timeout.as_millis() as u64,
            caller_cancellation = ctx.cancellation().is_some(),
            "verification request composed"
        );

        let outcome = match self.exchange(request, ctx.cancellation()).await {
            Ok(response) => {
                info!(provider = name, status = response.status, bytes = response.body.len(), "verification response received");
                self.classify(response)
            }
            Err(Interruption::TimedOut) => {
                warn!(provider = name, "verification request timed out");
                VerificationOutcome::error(name, reasons::TIMEOUT)
            }
            Err(Interruption::Cancelled) => {
                warn!(provider = name, "verification request cancelled by caller");
                VerificationOutcome::error(name, reasons::TEMPORARY_FAILURE)
            }
            Err(Interruption::Transport(e)) => {
                warn!(provider = name, error = %e, "verification request failed");
                VerificationOutcome::error(name, reasons::TEMPORARY_FAILURE)
            }
        };

        info!(
            provider = name,
            status = %outcome.status,
            message = outcome.message.as_deref().unwrap_or(""),
            "verification outcome decided"
        );
        outcome
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::outcome::VerificationStatus;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    pub(crate) enum StubReply {
        Respond(u16, Vec<u8>),
        Fail,
        Hang,
    }

    /// Transport stub recording every request and the token it was handed.
    pub(crate) struct StubTransport {
        reply: StubReply,
        pub requests: Mutex<Vec<TransportRequest>>,
        pub tokens: Mutex<Vec<CancellationToken>>,
    }

    impl StubTransport {
        pub(crate) fn new(reply: StubReply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                requests: Mutex::new(Vec::new()),
                tokens: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn json(status: u16, body: Value) -> Arc<Self> {
            Self::new(StubReply::Respond(status, serde_json::to_vec(&body).unwrap()))
        }

        pub(crate) fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn post_json(
            &self,
            request: TransportRequest,
            cancel: CancellationToken,
        ) -> Result<TransportResponse, TransportError> {
            self.requests.lock().unwrap().push(request);
            self.tokens.lock().unwrap().push(cancel);
            match &self.reply {
                StubReply::Respond(status, body) => Ok(TransportResponse {
                    status: *status,
                    body: body.clone(),
                }),
                StubReply::Fail => Err(TransportError::Request("connection refused".to_string())),
                StubReply::Hang => std::future::pending().await,
            }
        }
    }

    fn test_config() -> AuthorityConfig {
        AuthorityConfig {
            name: "TEST".to_string(),
            endpoint: "https://authority.test/validate".to_string(),
            key_field: "VK0001".to_string(),
            pin_field: "VR0001".to_string(),
            field_width: 9,
            encoding: FieldEncoding::DoubleBase64,
            default_timeout: DEFAULT_TIMEOUT,
        }
    }

    fn provider(transport: Arc<StubTransport>) -> AuthorityProvider {
        AuthorityProvider::new(test_config(), PatternSet::new(None, None), transport)
    }

    #[test]
    fn test_canonicalize_code() {
        assert_eq!(canonicalize_code(" 414979709 ", 9).as_deref(), Some("414979709"));
        assert_eq!(canonicalize_code("86612413", 9).as_deref(), Some("086612413"));
        assert_eq!(canonicalize_code("866-124.13", 9).as_deref(), Some("086612413"));
        assert_eq!(canonicalize_code("42", 9).as_deref(), Some("000000042"));
        assert_eq!(canonicalize_code("1234567890", 9), None);
        assert_eq!(canonicalize_code("12a45", 9), None);
        assert_eq!(canonicalize_code(" - ", 9), None);
        assert_eq!(canonicalize_code("", 9), None);
    }

    #[test]
    fn test_field_encoding() {
        assert_eq!(FieldEncoding::Plain.encode("414979709"), "414979709");
        assert_eq!(FieldEncoding::Base64.encode("414979709"), "NDE0OTc5NzA5");
        assert_eq!(FieldEncoding::DoubleBase64.encode("414979709"), "TkRFME9UYzVOekE1");
    }

    #[test]
    fn test_error_flag_policy() {
        let policy = ErrorFlagPolicy::default();
        assert!(policy.is_confirmed(&serde_json::json!({})));
        assert!(policy.is_confirmed(&serde_json::json!({"error": false, "data": 1})));
        assert!(policy.is_confirmed(&serde_json::json!(true)));
        assert!(!policy.is_confirmed(&serde_json::json!({"error": true})));
        assert!(!policy.is_confirmed(&serde_json::json!({"error": "not found"})));
        assert!(!policy.is_confirmed(&Value::Null));
        assert!(!policy.is_confirmed(&serde_json::json!(false)));
    }

    #[tokio::test]
    async fn test_request_body_is_padded_and_double_encoded() {
        let transport = StubTransport::json(200, serde_json::json!({"error": false}));
        let outcome = provider(transport.clone())
            .verify("414979709", "86612413", &RequestContext::new())
            .await;
        assert_eq!(outcome.status, VerificationStatus::Confirmed);

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://authority.test/validate");
        assert_eq!(requests[0].timeout, DEFAULT_TIMEOUT);
        assert_eq!(
            requests[0].body,
            serde_json::json!({
                "VK0001": "TkRFME9UYzVOekE1",
                "VR0001": "TURnMk5qRXlOREV6"
            })
        );
    }

    #[tokio::test]
    async fn test_invalid_format_skips_network() {
        let transport = StubTransport::json(200, serde_json::json!({}));
        let provider = provider(transport.clone());
        let ctx = RequestContext::new();

        for (key, pin) in [("41497970A", "86612413"), ("1234567890", "86612413"), ("414979709", "--")] {
            let outcome = provider.verify(key, pin, &ctx).await;
            assert_eq!(outcome.status, VerificationStatus::Invalid);
            assert_eq!(outcome.message.as_deref(), Some(reasons::INVALID_INPUT_FORMAT));
        }
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let ctx = RequestContext::new();

        let outcome = provider(StubTransport::json(500, serde_json::json!({"detail": "boom"})))
            .verify("414979709", "86612413", &ctx)
            .await;
        assert_eq!(outcome.status, VerificationStatus::Error);
        assert_eq!(outcome.message.as_deref(), Some(reasons::SERVER_ERROR));
        assert_eq!(outcome.raw, Some(serde_json::json!({"detail": "boom"})));

        let outcome = provider(StubTransport::json(503, serde_json::json!({"message": "maintenance"})))
            .verify("414979709", "86612413", &ctx)
            .await;
        assert_eq!(outcome.status, VerificationStatus::Error);
        assert_eq!(outcome.message.as_deref(), Some("maintenance"));

        let outcome = provider(StubTransport::new(StubReply::Respond(404, b"Not Found".to_vec())))
            .verify("414979709", "86612413", &ctx)
            .await;
        assert_eq!(outcome.status, VerificationStatus::Invalid);
        assert_eq!(outcome.message.as_deref(), Some(reasons::INVALID_REQUEST));

        let outcome = provider(StubTransport::json(200, serde_json::json!({"ok": 1})))
            .verify("414979709", "86612413", &ctx)
            .await;
        assert_eq!(outcome.status, VerificationStatus::Confirmed);
        assert_eq!(outcome.message, None);
        assert_eq!(outcome.raw, Some(serde_json::json!({"ok": 1})));

        let outcome = provider(StubTransport::json(200, serde_json::json!({"error": true})))
            .verify("414979709", "86612413", &ctx)
            .await;
        assert_eq!(outcome.status, VerificationStatus::Invalid);
        assert_eq!(outcome.message.as_deref(), Some(reasons::UNCONFIRMED_RESPONSE));
    }

    #[tokio::test]
    async fn test_unreadable_success_body_is_temporary_failure() {
        let outcome = provider(StubTransport::new(StubReply::Respond(200, b"<html>".to_vec())))
            .verify("414979709", "86612413", &RequestContext::new())
            .await;
        assert_eq!(outcome.status, VerificationStatus::Error);
        assert_eq!(outcome.message.as_deref(), Some(reasons::TEMPORARY_FAILURE));
    }

    #[tokio::test]
    async fn test_transport_failure_is_temporary_failure() {
        let outcome = provider(StubTransport::new(StubReply::Fail))
            .verify("414979709", "86612413", &RequestContext::new())
            .await;
        assert_eq!(outcome.status, VerificationStatus::Error);
        assert_eq!(outcome.message.as_deref(), Some(reasons::TEMPORARY_FAILURE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_and_owned_token_disposed() {
        let transport = StubTransport::new(StubReply::Hang);
        let ctx = RequestContext::new().with_timeout_ms(50);

        let outcome = provider(transport.clone()).verify("414979709", "86612413", &ctx).await;
        assert_eq!(outcome.status, VerificationStatus::Error);
        assert_eq!(outcome.message.as_deref(), Some(reasons::TIMEOUT));

        let tokens = transport.tokens.lock().unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].is_cancelled());
    }

    #[tokio::test]
    async fn test_owned_token_disposed_on_success() {
        let transport = StubTransport::json(200, serde_json::json!({}));
        provider(transport.clone())
            .verify("414979709", "86612413", &RequestContext::new())
            .await;
        assert!(transport.tokens.lock().unwrap()[0].is_cancelled());
    }

    #[tokio::test]
    async fn test_caller_token_is_borrowed_not_cancelled() {
        let transport = StubTransport::json(200, serde_json::json!({}));
        let caller = CancellationToken::new();
        let ctx = RequestContext::new().with_cancellation(caller.clone());

        let outcome = provider(transport.clone()).verify("414979709", "86612413", &ctx).await;
        assert_eq!(outcome.status, VerificationStatus::Confirmed);
        assert!(!caller.is_cancelled());
        assert!(!transport.tokens.lock().unwrap()[0].is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_token_timeout_leaves_caller_token_alone() {
        let caller = CancellationToken::new();
        let ctx = RequestContext::new()
            .with_cancellation(caller.clone())
            .with_timeout_ms(10);

        let outcome = provider(StubTransport::new(StubReply::Hang))
            .verify("414979709", "86612413", &ctx)
            .await;
        assert_eq!(outcome.message.as_deref(), Some(reasons::TIMEOUT));
        assert!(!caller.is_cancelled());
    }

    #[tokio::test]
    async fn test_caller_cancellation_is_temporary_failure() {
        let caller = CancellationToken::new();
        caller.cancel();
        let ctx = RequestContext::new().with_cancellation(caller);

        let outcome = provider(StubTransport::new(StubReply::Hang))
            .verify("414979709", "86612413", &ctx)
            .await;
        assert_eq!(outcome.status, VerificationStatus::Error);
        assert_eq!(outcome.message.as_deref(), Some(reasons::TEMPORARY_FAILURE));
    }

    struct AlwaysUnconfirmed;

    impl ConfirmationPolicy for AlwaysUnconfirmed {
        fn is_confirmed(&self, _payload: &Value) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_confirmation_policy_override() {
        let outcome = provider(StubTransport::json(200, serde_json::json!({})))
            .with_confirmation_policy(Arc::new(AlwaysUnconfirmed))
            .verify("414979709", "86612413", &RequestContext::new())
            .await;
        assert_eq!(outcome.message.as_deref(), Some(reasons::UNCONFIRMED_RESPONSE));
    }
}
