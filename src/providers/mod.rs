mod anthropic;
mod factory;
mod fallback;
mod open_ai;

pub use anthropic::AnthropicProvider;
pub use factory::ProviderFactory;
pub use fallback::FallbackProvider;
pub use open_ai::OpenAIProvider;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// A tool as the remote model sees it: name, description and a JSON
/// Schema for its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// One tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Provider-neutral transcript entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        tool_calls: Vec<ToolCall>,
    },
    ToolResult {
        call_id: String,
        name: String,
        content: String,
    },
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
}

/// What the model did with its turn.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelTurn {
    /// Natural completion, no more tools wanted.
    Final { content: String },
    /// One or more tool invocations, to be executed in order.
    ToolCalls {
        content: Option<String>,
        calls: Vec<ToolCall>,
    },
}

#[derive(Error, Debug)]
pub enum LlmError {
    /// Missing API key, unknown or disabled provider
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection failure or timeout
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx response from the provider
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Every provider in a fallback chain failed
    #[error("All providers failed: {0}")]
    AllFailed(String),
}

impl LlmError {
    /// Whether the same request may succeed if sent again.
    pub fn retryable(&self) -> bool {
        match self {
            LlmError::Network(_) => true,
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            LlmError::AllFailed(_) => true,
            LlmError::Config(_) | LlmError::Parse(_) => false,
        }
    }
}

/// Unified trait for all tool-calling chat providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "openai", "anthropic")
    fn provider_name(&self) -> &str;

    /// Run one model turn over the transcript.
    async fn complete(&self, request: &ChatRequest) -> Result<ModelTurn, LlmError>;
}

/// Read an error body from a non-2xx response.
async fn api_error(response: reqwest::Response) -> LlmError {
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
    LlmError::Api { status, message }
}
