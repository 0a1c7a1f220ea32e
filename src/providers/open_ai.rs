use crate::config::ProviderConfig;
use crate::providers::{
    api_error, ChatRequest, LlmError, LlmProvider, Message, ModelTurn, ToolCall, ToolDefinition,
};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider from configuration
    pub fn new(config: &ProviderConfig, timeout: Duration) -> Result<Self, LlmError> {
        // Try config first, then fall back to environment variable
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                LlmError::Config("OPENAI_API_KEY not found in config or environment".to_string())
            })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com".to_string());

        Ok(OpenAIProvider {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            base_url,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(api_key: String, base_url: String, model: String) -> Self {
        OpenAIProvider {
            client: Client::new(),
            api_key,
            base_url,
            model,
            temperature: 0.2,
            max_tokens: 4000,
        }
    }

    fn wire_messages(request: &ChatRequest) -> Vec<Value> {
        let mut messages = vec![json!({"role": "system", "content": request.system})];

        for message in &request.messages {
            messages.push(match message {
                Message::User { content } => json!({"role": "user", "content": content}),
                Message::Assistant {
                    content,
                    tool_calls,
                } => {
                    let mut wire = json!({"role": "assistant", "content": content});
                    if !tool_calls.is_empty() {
                        wire["tool_calls"] = tool_calls
                            .iter()
                            .map(|call| {
                                json!({
                                    "id": call.id,
                                    "type": "function",
                                    "function": {
                                        "name": call.name,
                                        "arguments": call.arguments.to_string(),
                                    }
                                })
                            })
                            .collect();
                    }
                    wire
                }
                Message::ToolResult {
                    call_id, content, ..
                } => json!({"role": "tool", "tool_call_id": call_id, "content": content}),
            });
        }

        messages
    }

    fn wire_tools(tools: &[ToolDefinition]) -> Vec<Value> {
        tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    }
                })
            })
            .collect()
    }

    fn parse_tool_call(value: &Value) -> Option<ToolCall> {
        let function = value.get("function")?;
        let raw_arguments = function.get("arguments")?.as_str()?;
        let arguments = serde_json::from_str(raw_arguments).unwrap_or_else(|e| {
            warn!("Tool call arguments are not JSON ({}): {}", e, raw_arguments);
            json!({})
        });

        Some(ToolCall {
            id: value.get("id")?.as_str()?.to_string(),
            name: function.get("name")?.as_str()?.to_string(),
            arguments,
        })
    }

    fn parse_turn(body: &Value) -> Result<ModelTurn, LlmError> {
        let message = body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .ok_or_else(|| LlmError::Parse("No message in response".to_string()))?;

        let content = message
            .get("content")
            .and_then(|c| c.as_str())
            .map(|c| c.to_string());

        let calls: Vec<ToolCall> = message
            .get("tool_calls")
            .and_then(|tc| tc.as_array())
            .map(|calls| calls.iter().filter_map(Self::parse_tool_call).collect())
            .unwrap_or_default();

        if calls.is_empty() {
            Ok(ModelTurn::Final {
                content: content.unwrap_or_default(),
            })
        } else {
            Ok(ModelTurn::ToolCalls { content, calls })
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ModelTurn, LlmError> {
        let mut body = json!({
            "model": self.model,
            "messages": Self::wire_messages(request),
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });
        if !request.tools.is_empty() {
            body["tools"] = Value::Array(Self::wire_tools(&request.tools));
            body["tool_choice"] = json!("auto");
        }

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let response_body: Value = response.json().await?;
        debug!("{:?}", response_body);
        Self::parse_turn(&response_body)
    }
}
