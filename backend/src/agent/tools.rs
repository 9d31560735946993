//! Tools the agent can call.
//!
//! A tool never fails from the agent's point of view: errors are turned
//! into text and handed back to the model, which decides what to tell the
//! user.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::llm::ToolSpec;
use crate::error::{ModerationError, WalletError};
use crate::moderation::VideoAnalyzer;
use crate::wallet::EvmRpcClient;

/// Name of the video moderation tool.
pub const VIDEO_ANALYZER_TOOL: &str = "google_video_analyzer";

/// A function the model can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    /// Run the tool and describe the outcome.
    async fn call(&self, arguments: Value) -> String;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Tools keyed by name.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool, replacing any tool of the same name.
    pub fn with<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|t| t.spec()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke `name` with raw JSON-encoded arguments.
    pub async fn invoke(&self, name: &str, arguments: &str) -> String {
        let Some(tool) = self.tools.get(name) else {
            tracing::warn!(tool = name, "model requested an unknown tool");
            return format!("Error: unknown tool '{}'", name);
        };

        let args = parse_arguments(arguments);
        tracing::info!(tool = name, "calling tool");
        tool.call(args).await
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry").field("tools", &self.names()).finish()
    }
}

/// Arguments arrive JSON-encoded; a non-JSON payload is passed as a string.
fn parse_arguments(raw: &str) -> Value {
    let raw = raw.trim();
    if raw.is_empty() {
        return json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Pull a string argument out of `{key: ...}` or a bare string.
fn string_argument(arguments: &Value, key: &str) -> Option<String> {
    match arguments {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get(key).and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

// =============================================================================
// Wallet tools
// =============================================================================

/// Reports the agent's own wallet.
pub struct WalletDetailsTool {
    rpc: Arc<EvmRpcClient>,
    address: Option<String>,
    network_id: String,
}

impl WalletDetailsTool {
    pub fn new(rpc: Arc<EvmRpcClient>, address: Option<String>, network_id: impl Into<String>) -> Self {
        Self {
            rpc,
            address,
            network_id: network_id.into(),
        }
    }
}

#[async_trait]
impl Tool for WalletDetailsTool {
    fn name(&self) -> &str {
        "get_wallet_details"
    }

    fn description(&self) -> &str {
        "Get the details of the connected wallet: address, network id, chain id and native token balance."
    }

    async fn call(&self, _arguments: Value) -> String {
        let Some(address) = self.address.as_deref() else {
            return format!("Error getting wallet details: {}", WalletError::NotConfigured);
        };

        let chain_id = match self.rpc.chain_id().await {
            Ok(id) => id,
            Err(e) => return format!("Error getting wallet details: {}", e),
        };
        let balance = match self.rpc.balance(address).await {
            Ok(b) => b,
            Err(e) => return format!("Error getting wallet details: {}", e),
        };

        json!({
            "address": address,
            "network": {
                "networkId": self.network_id,
                "chainId": chain_id.to_string(),
            },
            "nativeBalance": balance.formatted,
            "nativeBalanceWei": balance.wei.to_string(),
        })
        .to_string()
    }
}

/// Balance of an arbitrary address.
pub struct BalanceTool {
    rpc: Arc<EvmRpcClient>,
}

impl BalanceTool {
    pub fn new(rpc: Arc<EvmRpcClient>) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl Tool for BalanceTool {
    fn name(&self) -> &str {
        "get_balance"
    }

    fn description(&self) -> &str {
        "Get the native token balance of an address (0x-prefixed)."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "address": { "type": "string", "description": "0x-prefixed EVM address" }
            },
            "required": ["address"]
        })
    }

    async fn call(&self, arguments: Value) -> String {
        let Some(address) = string_argument(&arguments, "address") else {
            return "Error getting balance: missing 'address' argument".to_string();
        };
        match self.rpc.balance(&address).await {
            Ok(balance) => format!("Balance of {} is {}", address, balance.formatted),
            Err(e) => format!("Error getting balance: {}", e),
        }
    }
}

// =============================================================================
// Moderation tool
// =============================================================================

/// Explicit-content check on a `gs://` video.
pub struct VideoAnalysisTool {
    analyzer: Arc<VideoAnalyzer>,
}

impl VideoAnalysisTool {
    pub fn new(analyzer: Arc<VideoAnalyzer>) -> Self {
        Self { analyzer }
    }
}

#[async_trait]
impl Tool for VideoAnalysisTool {
    fn name(&self) -> &str {
        VIDEO_ANALYZER_TOOL
    }

    fn description(&self) -> &str {
        "Analyze a video stored on Google Cloud Storage for explicit content. \
         Input must be a gs:// path. Returns SAFE or UNSAFE."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "input": {
                    "type": "string",
                    "description": "Google Cloud Storage path, e.g. gs://bucket/movie.mp4"
                }
            },
            "required": ["input"]
        })
    }

    async fn call(&self, arguments: Value) -> String {
        let uri = string_argument(&arguments, "input").unwrap_or_default();
        match self.analyzer.analyze(uri.trim()).await {
            Ok(verdict) => verdict.to_string(),
            Err(ModerationError::InvalidUri(_)) => {
                "Error: Invalid input. Must be a Google Cloud Storage path starting with 'gs://'.".to_string()
            }
            Err(e) => format!("Error analyzing video: {}", e),
        }
    }
}
