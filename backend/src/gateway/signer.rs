//! Server-side signed URL issuance against the pinning service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::UrlIssuer;
use crate::config::Settings;
use crate::error::{GatewayError, GatewayResult};
use crate::models::SignedUploadTarget;

/// Parameters of a signing request.
#[derive(Debug, Clone)]
pub struct SignOptions {
    /// How long the URL stays valid.
    pub expires: Duration,
    /// Upper bound on the uploaded file size, in bytes.
    pub max_file_size: Option<u64>,
    /// Accepted MIME types (`video/*`, `image/*`, ...).
    pub allow_mime_types: Vec<String>,
}

impl Default for SignOptions {
    fn default() -> Self {
        Self {
            expires: Duration::from_secs(crate::config::DEFAULT_SIGNED_URL_EXPIRY_SECS),
            max_file_size: None,
            allow_mime_types: vec!["video/*".to_string(), "image/*".to_string()],
        }
    }
}

#[derive(Debug, Serialize)]
struct SignRequest<'a> {
    network: &'static str,
    date: i64,
    expires: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_file_size: Option<u64>,
    #[serde(skip_serializing_if = "no_mime_filter")]
    allow_mime_types: &'a [String],
}

fn no_mime_filter(types: &&[String]) -> bool {
    types.is_empty()
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    #[serde(default)]
    data: Option<String>,
}

/// Issues signed upload URLs using the pinning service JWT.
#[derive(Debug, Clone)]
pub struct PinataSigner {
    http: reqwest::Client,
    api_url: String,
    jwt: Option<String>,
    options: SignOptions,
}

impl PinataSigner {
    pub fn new(api_url: impl Into<String>, jwt: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            jwt,
            options: SignOptions::default(),
        }
    }

    /// Signer using the configured JWT, expiry and size cap.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.pinata_api_url.clone(), settings.pinata_jwt.clone()).with_options(SignOptions {
            expires: settings.signed_url_expiry,
            max_file_size: settings.max_upload_size,
            ..SignOptions::default()
        })
    }

    pub fn with_options(mut self, options: SignOptions) -> Self {
        self.options = options;
        self
    }

    /// Request a signed URL with explicit options.
    pub async fn sign(&self, options: &SignOptions) -> GatewayResult<SignedUploadTarget> {
        let jwt = self.jwt.as_deref().ok_or(GatewayError::MissingCredential)?;

        let body = SignRequest {
            network: "public",
            date: chrono::Utc::now().timestamp(),
            expires: options.expires.as_secs(),
            max_file_size: options.max_file_size,
            allow_mime_types: &options.allow_mime_types,
        };

        let response = self
            .http
            .post(format!("{}/files/sign", self.api_url))
            .bearer_auth(jwt)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "pinning service refused to sign URL");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: SignResponse =
            serde_json::from_str(&text).map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        match parsed.data {
            Some(url) if !url.trim().is_empty() => {
                tracing::info!(expires = body.expires, "issued signed upload URL");
                Ok(SignedUploadTarget::new(url))
            }
            _ => Err(GatewayError::MissingUrl),
        }
    }
}

#[async_trait]
impl UrlIssuer for PinataSigner {
    async fn request_temporary_url(&self) -> GatewayResult<SignedUploadTarget> {
        self.sign(&self.options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_sign_sends_jwt_and_expiry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/files/sign"))
            .and(header("authorization", "Bearer secret-jwt"))
            .and(body_partial_json(serde_json::json!({ "network": "public", "expires": 30 })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "data": "https://uploads.example/signed" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let signer = PinataSigner::new(format!("{}/v3/", server.uri()), Some("secret-jwt".into()))
            .with_options(SignOptions {
                expires: Duration::from_secs(30),
                ..SignOptions::default()
            });

        let target = signer.request_temporary_url().await.unwrap();
        assert_eq!(target.url, "https://uploads.example/signed");
    }

    #[tokio::test]
    async fn test_settings_carry_size_cap() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files/sign"))
            .and(body_partial_json(serde_json::json!({
                "expires": 120,
                "max_file_size": 2_000_000_000u64,
                "allow_mime_types": ["video/*", "image/*"]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "data": "https://uploads.example/capped" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let settings = Settings {
            pinata_api_url: server.uri(),
            pinata_jwt: Some("secret-jwt".into()),
            signed_url_expiry: Duration::from_secs(120),
            max_upload_size: Some(2_000_000_000),
            ..Settings::default()
        };
        let target = PinataSigner::from_settings(&settings).request_temporary_url().await.unwrap();
        assert_eq!(target.url, "https://uploads.example/capped");
    }

    #[tokio::test]
    async fn test_missing_jwt_fails_without_network() {
        let signer = PinataSigner::new("http://127.0.0.1:9", None);
        let err = signer.request_temporary_url().await.unwrap_err();
        assert!(matches!(err, GatewayError::MissingCredential));
    }

    #[tokio::test]
    async fn test_upstream_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let signer = PinataSigner::new(server.uri(), Some("bad".into()));
        let err = signer.request_temporary_url().await.unwrap_err();
        assert!(matches!(err, GatewayError::Status { status: 401, .. }));
    }
}
