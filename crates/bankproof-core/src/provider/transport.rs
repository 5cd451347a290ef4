//! HTTP transport used by verification providers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::TransportError;

/// A single JSON POST to a verification authority.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: String,
    pub body: serde_json::Value,
    pub timeout: Duration,
}

/// Raw response as received from the authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Sends requests to a verification authority.
///
/// Implementations must stop work and return [`TransportError::Cancelled`]
/// once `cancel` fires.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(
        &self,
        request: TransportRequest,
        cancel: CancellationToken,
    ) -> Result<TransportResponse, TransportError>;
}

/// [`Transport`] over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with a fresh client.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(concat!("bankproof/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .post(&request.url)
            .json(&request.body)
            .timeout(request.timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        trace!("Received {} bytes with status {}", body.len(), status);

        Ok(TransportResponse { status, body })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post_json(
        &self,
        request: TransportRequest,
        cancel: CancellationToken,
    ) -> Result<TransportResponse, TransportError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            result = self.send(request) => result,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// Read one HTTP/1.1 request, headers and `Content-Length` body.
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).into_owned();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Serve a single JSON response on a loopback port. The handle yields the raw request.
    pub(crate) async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/api/validate", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });
        (url, handle)
    }

    /// Accept connections and never answer.
    pub(crate) async fn serve_silent() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/api/validate", listener.local_addr().unwrap());

        tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                open.push(socket);
            }
        });
        url
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let transport = ReqwestTransport::new().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let request = TransportRequest {
            url: "https://127.0.0.1:9/never".to_string(),
            body: serde_json::json!({}),
            timeout: Duration::from_secs(5),
        };
        let result = transport.post_json(request, cancel).await;
        assert!(matches!(result, Err(TransportError::Cancelled)));
    }

    #[tokio::test]
    async fn test_posts_json_and_passes_response_through() {
        let (url, server) = serve_once("500 Internal Server Error", r#"{"message":"down"}"#).await;
        let transport = ReqwestTransport::new().unwrap();

        let request = TransportRequest {
            url,
            body: serde_json::json!({"VK0001": "TkRFME9UYzVOekE1"}),
            timeout: Duration::from_secs(5),
        };
        let response = transport
            .post_json(request, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(response.body, br#"{"message":"down"}"#.to_vec());

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /api/validate HTTP/1.1"));
        assert!(raw.to_ascii_lowercase().contains("content-type: application/json"));
        assert!(raw.ends_with(r#"{"VK0001":"TkRFME9UYzVOekE1"}"#));
    }

    #[tokio::test]
    async fn test_client_timeout_maps_to_timeout() {
        let url = serve_silent().await;
        let transport = ReqwestTransport::new().unwrap();

        let request = TransportRequest {
            url,
            body: serde_json::json!({}),
            timeout: Duration::from_millis(100),
        };
        let result = transport.post_json(request, CancellationToken::new()).await;
        assert!(matches!(result, Err(TransportError::Timeout)));
    }
}
