//! Chat-completions model client.
//!
//! Speaks the OpenAI `/chat/completions` wire format with function tools.
//! Failed calls are retried a fixed number of times before giving up.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::{DEFAULT_OPENAI_API_URL, DEFAULT_OPENAI_MODEL};
use crate::error::{AgentError, AgentResult};

/// Default number of attempts per completion.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Delay between attempts.
const RETRY_DELAY_MS: u64 = 1000;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

/// Name and JSON-encoded arguments of a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// Some compatible backends send `"tool_calls": null` on plain answers.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ToolCall>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ToolCall>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ChatMessage {
    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    /// Assistant turn that only requests tools.
    pub fn tool_request(calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            tool_calls: calls,
            tool_call_id: None,
        }
    }

    /// Result of a tool call.
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }
}

/// Function tool advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolSpec {
    fn to_wire(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

/// A chat model able to answer or request tool calls.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produce the next assistant message for `messages`.
    async fn complete(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> AgentResult<ChatMessage>;
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// OpenAI-compatible chat client.
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl OpenAiChat {
    /// Create a new client with explicit API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_API_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Point at another OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Set attempts and the pause between them.
    pub fn with_retries(mut self, max_retries: u32, delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_delay = delay;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Single attempt.
    async fn call_api(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> AgentResult<ChatMessage> {
        let mut body = json!({
            "model": self.model,
            "temperature": 0,
            "messages": messages,
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.iter().map(ToolSpec::to_wire).collect());
        }

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AgentError::Request(e.to_string()))?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ApiErrorBody>(&text) {
                return Err(AgentError::Api(format!("HTTP {}: {}", status, error.error.message)));
            }
            return Err(AgentError::Api(format!("HTTP {}: {}", status, text)));
        }

        let parsed: CompletionResponse =
            serde_json::from_str(&text).map_err(|e| AgentError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| AgentError::InvalidResponse("no choices returned".to_string()))
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> AgentResult<ChatMessage> {
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match self.call_api(messages, tools).await {
                Ok(message) => return Ok(message),
                Err(e) => {
                    tracing::warn!(attempt, max = self.max_retries, error = %e, "chat completion failed");
                    last_error = Some(e);
                    if attempt < self.max_retries {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AgentError::Api("Unknown error".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_message_wire_format() {
        let request = ChatMessage::tool_request(vec![ToolCall {
            id: "call_1".into(),
            kind: "function".into(),
            function: FunctionCall {
                name: "get_wallet_details".into(),
                arguments: "{}".into(),
            },
        }]);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["role"], "assistant");
        assert!(json["content"].is_null());
        assert_eq!(json["tool_calls"][0]["type"], "function");

        let user = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert!(user.get("tool_calls").is_none());
        assert!(user.get("tool_call_id").is_none());
    }

    #[tokio::test]
    async fn test_completion_with_tool_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({ "model": "gpt-4o-mini" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": { "name": "get_wallet_details", "arguments": "{}" }
                        }]
                    },
                    "finish_reason": "tool_calls"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiChat::new("sk-test").with_base_url(&format!("{}/v1", server.uri()));
        let spec = ToolSpec {
            name: "get_wallet_details".into(),
            description: "details".into(),
            parameters: json!({ "type": "object", "properties": {} }),
        };
        let reply = client.complete(&[ChatMessage::user("who am I?")], &[spec]).await.unwrap();
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.tool_calls[0].function.name, "get_wallet_details");
    }

    #[tokio::test]
    async fn test_null_tool_calls_is_a_plain_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": { "role": "assistant", "content": "hi", "tool_calls": null }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiChat::new("sk-test")
            .with_base_url(&server.uri())
            .with_retries(1, Duration::from_millis(1));
        let reply = client.complete(&[ChatMessage::user("hello")], &[]).await.unwrap();
        assert_eq!(reply, ChatMessage::assistant("hi"));
    }

    #[tokio::test]
    async fn test_retries_then_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": { "message": "overloaded" }
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = OpenAiChat::new("sk-test")
            .with_base_url(&server.uri())
            .with_retries(2, Duration::from_millis(1));
        let err = client.complete(&[ChatMessage::user("hi")], &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::Api(msg) if msg.contains("overloaded")));
    }
}
