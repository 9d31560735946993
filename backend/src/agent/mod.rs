//! Conversational agent.
//!
//! A ReAct-style loop over a chat model: the model either answers or asks
//! for tools, tool outputs are appended to the conversation, and the model is
//! asked again. Each conversation thread keeps its own history.
//!
//! ```text
//! user ──▶ history + system prompt ──▶ model ──┬──▶ answer
//!                 ▲                            │
//!                 └──── tool results ◀── tools ◀┘
//! ```

pub mod llm;
pub mod memory;
pub mod prompt;
pub mod tools;

use std::sync::Arc;

use crate::config::Settings;
use crate::error::{AgentError, AgentResult};
use crate::moderation::VideoAnalyzer;
use crate::wallet::EvmRpcClient;

pub use llm::{ChatMessage, ChatModel, OpenAiChat, Role, ToolCall, ToolSpec};
pub use memory::{MemorySaver, ThreadHistory};
pub use prompt::{system_prompt, PromptContext};
pub use tools::{BalanceTool, Tool, ToolRegistry, VideoAnalysisTool, WalletDetailsTool};

/// Model round-trips allowed per user message.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// The cinema agent.
pub struct Agent {
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
    memory: MemorySaver,
    system_prompt: String,
    max_iterations: usize,
}

impl Agent {
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolRegistry, system_prompt: impl Into<String>) -> Self {
        Self {
            model,
            tools,
            memory: MemorySaver::new(),
            system_prompt: system_prompt.into(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Build the agent with the OpenAI model, wallet tools and the video
    /// analyzer. Fails without an OpenAI API key.
    pub fn from_settings(settings: &Settings, analyzer: Arc<VideoAnalyzer>) -> AgentResult<Self> {
        let api_key = settings.openai_api_key.as_deref().ok_or(AgentError::MissingApiKey)?;

        let model = OpenAiChat::new(api_key)
            .with_model(&settings.openai_model)
            .with_base_url(&settings.openai_api_url);

        let rpc = Arc::new(EvmRpcClient::new(settings.evm_rpc_url.clone()));
        let tools = ToolRegistry::new()
            .with(WalletDetailsTool::new(
                rpc.clone(),
                settings.wallet_address.clone(),
                settings.network_id.clone(),
            ))
            .with(BalanceTool::new(rpc))
            .with(VideoAnalysisTool::new(analyzer));

        let prompt = system_prompt(&PromptContext {
            network_id: &settings.network_id,
            wallet_address: settings.wallet_address.as_deref(),
            can_use_faucet: settings.can_use_faucet(),
        });

        tracing::info!(model = model.model(), tools = ?tools.names(), "agent initialized");
        Ok(Self::new(Arc::new(model), tools, prompt))
    }

    pub fn with_memory(mut self, memory: MemorySaver) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.names()
    }

    pub fn memory(&self) -> &MemorySaver {
        &self.memory
    }

    /// Send `message` on `thread_id` and return the agent's answer.
    ///
    /// The thread's history is only updated when the turn completes.
    pub async fn chat(&self, thread_id: &str, message: &str) -> AgentResult<String> {
        let thread = self.memory.thread(thread_id).await;
        let result = self.run_turn(&thread, thread_id, message).await;
        drop(thread);
        if result.is_err() {
            self.memory.release(thread_id).await;
        }
        result
    }

    async fn run_turn(&self, thread: &ThreadHistory, thread_id: &str, message: &str) -> AgentResult<String> {
        let mut history = thread.lock().await;

        let mut turn = history.clone();
        turn.push(ChatMessage::user(message));
        let specs = self.tools.specs();

        for step in 1..=self.max_iterations {
            let request: Vec<ChatMessage> = std::iter::once(ChatMessage::system(self.system_prompt.as_str()))
                .chain(turn.iter().cloned())
                .collect();

            let reply = self.model.complete(&request, &specs).await?;
            let calls = reply.tool_calls.clone();
            turn.push(reply);

            if calls.is_empty() {
                let answer = turn
                    .last()
                    .and_then(|m| m.content.clone())
                    .unwrap_or_default();
                tracing::debug!(thread = thread_id, steps = step, "agent answered");
                *history = turn;
                return Ok(answer);
            }

            for call in calls {
                let output = self.tools.invoke(&call.function.name, &call.function.arguments).await;
                turn.push(ChatMessage::tool_result(call.id, output));
            }
        }

        tracing::warn!(thread = thread_id, max = self.max_iterations, "agent did not converge");
        Err(AgentError::TooManySteps(self.max_iterations))
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("tools", &self.tools)
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}
