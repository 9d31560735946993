//! Request and response bodies of the HTTP API.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::moderation::Verdict;

/// `GET /api/upload-url`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadUrlResponse {
    pub url: String,
}

/// `POST /api/agent`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRequest {
    pub message: String,
    /// Conversation to resume. A new one is started when absent.
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse {
    pub response: String,
    pub thread_id: String,
}

/// `POST /api/moderate`
#[derive(Debug, Clone, Deserialize)]
pub struct ModerateRequest {
    pub uri: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModerateResponse {
    pub uri: String,
    pub verdict: Verdict,
}

/// Body of every non-2xx answer.
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_request_thread_is_optional() {
        let req: AgentRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert!(req.thread_id.is_none());
        let req: AgentRequest = serde_json::from_str(r#"{"message":"hi","threadId":"t-1"}"#).unwrap();
        assert_eq!(req.thread_id.as_deref(), Some("t-1"));
    }

    #[test]
    fn test_moderate_response_shape() {
        let body = serde_json::to_value(ModerateResponse {
            uri: "gs://b/m.mp4".into(),
            verdict: Verdict::Safe,
        })
        .unwrap();
        assert_eq!(body, json!({ "uri": "gs://b/m.mp4", "verdict": "SAFE" }));
        assert_eq!(error_response("nope")["error"], "nope");
    }
}
