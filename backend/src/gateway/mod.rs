//! Upload gateway: obtaining single-use signed upload URLs.
//!
//! The client side ([`GatewayClient`]) calls a backend endpoint that answers
//! `{ "url": "..." }`. The server side ([`PinataSigner`]) is that backend:
//! it trades the long-lived pinning credential for a short-lived URL.

pub mod signer;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{GatewayError, GatewayResult};
use crate::models::SignedUploadTarget;

pub use signer::{PinataSigner, SignOptions};

/// Something that hands out signed upload targets.
#[async_trait]
pub trait UrlIssuer: Send + Sync {
    /// Request a fresh single-use upload target.
    async fn request_temporary_url(&self) -> GatewayResult<SignedUploadTarget>;
}

/// Gateway endpoint response body.
#[derive(Debug, Deserialize)]
struct GatewayResponse {
    #[serde(default)]
    url: Option<String>,
}

/// HTTP client for the signed-URL endpoint.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    endpoint: String,
}

impl GatewayClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl UrlIssuer for GatewayClient {
    async fn request_temporary_url(&self) -> GatewayResult<SignedUploadTarget> {
        tracing::debug!(endpoint = %self.endpoint, "requesting temporary upload URL");

        let response = self
            .http
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_gateway_body(&body)
    }
}

/// Extract a usable URL from the gateway body.
fn parse_gateway_body(body: &str) -> GatewayResult<SignedUploadTarget> {
    let parsed: GatewayResponse =
        serde_json::from_str(body).map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

    match parsed.url.map(|u| u.trim().to_string()) {
        Some(url) if !url.is_empty() => Ok(SignedUploadTarget::new(url)),
        _ => Err(GatewayError::MissingUrl),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_body() {
        let target = parse_gateway_body(r#"{"url": "https://up.example/abc"}"#).unwrap();
        assert_eq!(target.url, "https://up.example/abc");
    }

    #[test]
    fn test_empty_or_missing_url_is_an_error() {
        assert!(matches!(parse_gateway_body(r#"{"url": ""}"#), Err(GatewayError::MissingUrl)));
        assert!(matches!(parse_gateway_body(r#"{"url": "   "}"#), Err(GatewayError::MissingUrl)));
        assert!(matches!(parse_gateway_body(r#"{"url": null}"#), Err(GatewayError::MissingUrl)));
        assert!(matches!(parse_gateway_body("{}"), Err(GatewayError::MissingUrl)));
        assert!(matches!(
            parse_gateway_body("not json"),
            Err(GatewayError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_request_temporary_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/upload-url"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "url": "https://up.example/abc" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = GatewayClient::new(format!("{}/api/upload-url", server.uri()));
        let target = client.request_temporary_url().await.unwrap();
        assert_eq!(target, SignedUploadTarget::new("https://up.example/abc"));
    }

    #[tokio::test]
    async fn test_server_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = GatewayClient::new(server.uri());
        let err = client.request_temporary_url().await.unwrap_err();
        assert!(matches!(err, GatewayError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let client = GatewayClient::new("http://127.0.0.1:9/unreachable");
        let err = client.request_temporary_url().await.unwrap_err();
        assert!(matches!(err, GatewayError::Request(_)));
    }
}
