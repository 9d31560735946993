//! Explicit-content moderation for uploaded videos.
//!
//! Uses the Google Video Intelligence REST API:
//!
//! 1. `POST /videos:annotate` with `EXPLICIT_CONTENT_DETECTION`
//! 2. poll `GET /{operation}` until `done`
//! 3. classify the explicit-annotation frames
//!
//! A video with no frame data is considered safe.

pub mod likelihood;

use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::{ModerationError, ModerationResult};

pub use likelihood::{Likelihood, Verdict};

/// Delay between operation polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Polls before giving up (10 minutes at the default interval).
const DEFAULT_MAX_POLLS: u32 = 120;

/// One frame of the explicit-content annotation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplicitFrame {
    /// `"1.5s"` in REST responses, `{seconds, nanos}` elsewhere.
    #[serde(default)]
    pub time_offset: Option<Value>,
    #[serde(default)]
    pub pornography_likelihood: Option<Likelihood>,
}

impl ExplicitFrame {
    /// Time offset for logs.
    pub fn offset_label(&self) -> String {
        match &self.time_offset {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Object(o)) => o
                .get("seconds")
                .map(|s| format!("{}s", s.as_str().map(str::to_string).unwrap_or_else(|| s.to_string())))
                .unwrap_or_else(|| "N/A".to_string()),
            _ => "N/A".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<OperationError>,
    #[serde(default)]
    response: Option<AnnotateResponse>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateResponse {
    #[serde(default)]
    annotation_results: Vec<AnnotationResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotationResult {
    #[serde(default)]
    explicit_annotation: Option<ExplicitAnnotation>,
}

#[derive(Debug, Deserialize)]
struct ExplicitAnnotation {
    #[serde(default)]
    frames: Vec<ExplicitFrame>,
}

/// Classify annotation frames: the first likely-or-worse frame makes the
/// video unsafe.
pub fn classify_frames(frames: &[ExplicitFrame]) -> Verdict {
    if frames.is_empty() {
        tracing::info!("no explicit content data found, defaulting to SAFE");
        return Verdict::Safe;
    }

    for frame in frames {
        if let Some(likelihood) = frame.pornography_likelihood.filter(Likelihood::is_unsafe) {
            tracing::warn!(offset = %frame.offset_label(), %likelihood, "unsafe content found");
            return Verdict::Unsafe;
        }
    }

    tracing::info!(frames = frames.len(), "analysis complete, no explicit content found");
    Verdict::Safe
}

/// Video Intelligence API client.
#[derive(Debug, Clone)]
pub struct VideoAnalyzer {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    poll_interval: Duration,
    max_polls: u32,
}

impl VideoAnalyzer {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }

    /// Set the polling cadence.
    pub fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls.max(1);
        self
    }

    /// Analyze a `gs://` video and return its verdict.
    pub async fn analyze(&self, gcs_uri: &str) -> ModerationResult<Verdict> {
        if !gcs_uri.starts_with("gs://") {
            return Err(ModerationError::InvalidUri(gcs_uri.to_string()));
        }
        let token = self.token.as_deref().ok_or(ModerationError::MissingToken)?;

        tracing::info!(uri = gcs_uri, "analyzing video");
        let operation = self.start(token, gcs_uri).await?;

        tracing::info!(operation = %operation.name, "waiting for video analysis to complete");
        let response = self.wait(token, operation).await?;

        let frames = response
            .annotation_results
            .into_iter()
            .next()
            .and_then(|r| r.explicit_annotation)
            .map(|a| a.frames)
            .unwrap_or_default();

        Ok(classify_frames(&frames))
    }

    async fn start(&self, token: &str, gcs_uri: &str) -> ModerationResult<Operation> {
        let body = json!({
            "inputUri": gcs_uri,
            "features": ["EXPLICIT_CONTENT_DETECTION"],
        });
        let response = self
            .http
            .post(format!("{}/videos:annotate", self.base_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ModerationError::Request(e.to_string()))?;
        Self::read_operation(response).await
    }

    async fn wait(&self, token: &str, mut operation: Operation) -> ModerationResult<AnnotateResponse> {
        let mut polls = 0;
        loop {
            if let Some(err) = operation.error.take() {
                return Err(ModerationError::Operation(err.message));
            }
            if operation.done {
                return Ok(operation.response.take().unwrap_or_default());
            }
            if polls >= self.max_polls {
                return Err(ModerationError::Timeout(polls));
            }

            tokio::time::sleep(self.poll_interval).await;
            polls += 1;

            let response = self
                .http
                .get(format!("{}/{}", self.base_url, operation.name))
                .bearer_auth(token)
                .send()
                .await
                .map_err(|e| ModerationError::Request(e.to_string()))?;
            operation = Self::read_operation(response).await?;
        }
    }

    async fn read_operation(response: reqwest::Response) -> ModerationResult<Operation> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ModerationError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(ModerationError::Api(format!("HTTP {}: {}", status, body)));
        }
        serde_json::from_str(&body).map_err(|e| ModerationError::Api(format!("invalid operation: {}", e)))
    }
}
