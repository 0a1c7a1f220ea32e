use crate::config::ProviderConfig;
use crate::providers::{api_error, ChatRequest, LlmError, LlmProvider, Message, ModelTurn, ToolCall};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider from configuration
    pub fn new(config: &ProviderConfig, timeout: Duration) -> Result<Self, LlmError> {
        // Try config first, then fall back to environment variable
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .ok_or_else(|| {
                LlmError::Config(
                    "ANTHROPIC_API_KEY not found in config or environment".to_string(),
                )
            })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.anthropic.com".to_string());

        Ok(AnthropicProvider {
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
        AnthropicProvider {
            client: Client::new(),
            api_key,
            base_url,
            model,
            temperature: 0.2,
            max_tokens: 4000,
        }
    }

    /// Tool results go back as `tool_result` blocks inside a user message;
    /// consecutive results share one message.
    fn wire_messages(messages: &[Message]) -> Vec<Value> {
        let mut wire: Vec<Value> = Vec::new();
        let mut pending_results: Vec<Value> = Vec::new();

        let flush = |wire: &mut Vec<Value>, pending: &mut Vec<Value>| {
            if !pending.is_empty() {
                wire.push(json!({"role": "user", "content": std::mem::take(pending)}));
            }
        };

        for message in messages {
            match message {
                Message::ToolResult {
                    call_id, content, ..
                } => {
                    pending_results.push(json!({
                        "type": "tool_result",
                        "tool_use_id": call_id,
                        "content": content,
                    }));
                }
                Message::User { content } => {
                    flush(&mut wire, &mut pending_results);
                    wire.push(json!({"role": "user", "content": content}));
                }
                Message::Assistant {
                    content,
                    tool_calls,
                } => {
                    flush(&mut wire, &mut pending_results);
                    let mut blocks: Vec<Value> = Vec::new();
                    if let Some(text) = content.as_deref().filter(|t| !t.is_empty()) {
                        blocks.push(json!({"type": "text", "text": text}));
                    }
                    for call in tool_calls {
                        blocks.push(json!({
                            "type": "tool_use",
                            "id": call.id,
                            "name": call.name,
                            "input": call.arguments,
                        }));
                    }
                    wire.push(json!({"role": "assistant", "content": blocks}));
                }
            }
        }
        flush(&mut wire, &mut pending_results);

        wire
    }

    fn parse_turn(body: &Value) -> Result<ModelTurn, LlmError> {
        let blocks = body
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| LlmError::Parse("No content in Anthropic response".to_string()))?;

        let mut text = Vec::new();
        let mut calls = Vec::new();
        for block in blocks {
            match block.get("type").and_then(|t| t.as_str()) {
                Some("text") => {
                    if let Some(t) = block.get("text").and_then(|t| t.as_str()) {
                        text.push(t.to_string());
                    }
                }
                Some("tool_use") => {
                    let id = block.get("id").and_then(|v| v.as_str());
                    let name = block.get("name").and_then(|v| v.as_str());
                    if let (Some(id), Some(name)) = (id, name) {
                        calls.push(ToolCall {
                            id: id.to_string(),
                            name: name.to_string(),
                            arguments: block.get("input").cloned().unwrap_or_else(|| json!({})),
                        });
                    }
                }
                _ => {}
            }
        }

        let content = text.join("\n");
        if calls.is_empty() {
            Ok(ModelTurn::Final { content })
        } else {
            Ok(ModelTurn::ToolCalls {
                content: (!content.is_empty()).then_some(content),
                calls,
            })
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ModelTurn, LlmError> {
        let tools: Vec<Value> = request
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "input_schema": tool.parameters,
                })
            })
            .collect();

        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "system": request.system,
            "messages": Self::wire_messages(&request.messages),
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools);
        }

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
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
