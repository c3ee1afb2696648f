//! Concrete `AIProvider` backed by the Anthropic Messages API. This is the
//! ambient-stack default implementation needed to run the binary; the core
//! only depends on the `AIProvider` trait in `providers::base`.

use crate::agent::conversation::{Message, ReasoningBlock, Role, ToolCall};
use crate::providers::base::{
    AIProvider, ContentBlock, ProviderResponse, StopReason, ThinkingConfig, ToolDefinition,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT_SECS: u64 = 120;

pub struct AnthropicProvider {
    api_key: String,
    base_url: String,
    client: Client,
}

impl AnthropicProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: API_URL.to_string(),
            client: Client::builder()
                .connect_timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

/// Converts our role-tagged message history into Anthropic's
/// system-text-plus-messages shape, preserving reasoning blocks as leading
/// `thinking` content entries exactly as received (never re-encoded).
fn convert_messages(messages: &[Message]) -> (Option<String>, Vec<Value>) {
    let mut system = None;
    let mut out = Vec::new();

    for m in messages {
        match m.role {
            Role::System => {
                system = Some(m.text.clone());
            }
            Role::Assistant => {
                let mut content = Vec::new();
                for r in &m.reasoning {
                    content.push(json!({
                        "type": "thinking",
                        "thinking": r.text,
                        "signature": r.signature,
                    }));
                }
                if !m.text.is_empty() {
                    content.push(json!({"type": "text", "text": m.text}));
                }
                for call in &m.tool_calls {
                    content.push(json!({
                        "type": "tool_use",
                        "id": call.id,
                        "name": call.name,
                        "input": call.input,
                    }));
                }
                out.push(json!({"role": "assistant", "content": content}));
            }
            Role::User => {
                let mut content = Vec::new();
                if !m.text.is_empty() {
                    content.push(json!({"type": "text", "text": m.text}));
                }
                for result in &m.tool_results {
                    content.push(json!({
                        "type": "tool_result",
                        "tool_use_id": result.tool_call_id,
                        "content": result.text,
                        "is_error": result.is_error,
                    }));
                }
                out.push(json!({"role": "user", "content": content}));
            }
        }
    }
    (system, out)
}

fn convert_tools(tools: &[ToolDefinition]) -> Vec<Value> {
    tools
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "input_schema": t.parameters,
            })
        })
        .collect()
}

/// Parses the Anthropic response content array into ordered `ContentBlock`s.
/// Order is preserved exactly as returned — reasoning blocks first is a
/// property of the request we send, not something this parser imposes.
fn parse_response(json: &Value) -> ProviderResponse {
    let mut content = Vec::new();
    if let Some(blocks) = json.get("content").and_then(|c| c.as_array()) {
        for block in blocks {
            match block.get("type").and_then(|t| t.as_str()) {
                Some("text") => {
                    if let Some(text) = block.get("text").and_then(|t| t.as_str()) {
                        content.push(ContentBlock::Text(text.to_string()));
                    }
                }
                Some("thinking") => {
                    let text = block
                        .get("thinking")
                        .and_then(|t| t.as_str())
                        .unwrap_or_default()
                        .to_string();
                    let signature = block
                        .get("signature")
                        .and_then(|s| s.as_str())
                        .unwrap_or_default()
                        .to_string();
                    content.push(ContentBlock::Thinking(ReasoningBlock { text, signature }));
                }
                Some("tool_use") => {
                    let id = block
                        .get("id")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string();
                    let name = block
                        .get("name")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string();
                    let input = block.get("input").cloned().unwrap_or(Value::Null);
                    content.push(ContentBlock::ToolUse(ToolCall { id, name, input }));
                }
                _ => {}
            }
        }
    }

    let stop_reason = match json.get("stop_reason").and_then(|s| s.as_str()) {
        Some("tool_use") => StopReason::ToolUse,
        Some("end_turn") | Some("stop_sequence") => StopReason::EndTurn,
        Some("max_tokens") => StopReason::MaxTokens,
        _ => StopReason::Other,
    };

    ProviderResponse {
        content,
        stop_reason,
    }
}

#[async_trait]
impl AIProvider for AnthropicProvider {
    async fn send(
        &self,
        model_id: &str,
        max_tokens: u32,
        system_text: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        thinking: ThinkingConfig,
    ) -> anyhow::Result<ProviderResponse> {
        let (_derived_system, anthropic_messages) = convert_messages(messages);
        let system = if system_text.is_empty() {
            _derived_system
        } else {
            Some(system_text.to_string())
        };

        let mut payload = json!({
            "model": model_id,
            "messages": anthropic_messages,
            "max_tokens": max_tokens,
        });

        if let Some(system) = system {
            payload["system"] = json!(system);
        }
        if !tools.is_empty() {
            payload["tools"] = json!(convert_tools(tools));
        }
        if thinking.enabled {
            payload["thinking"] = json!({
                "type": "enabled",
                "budget_tokens": thinking.budget_tokens,
            });
        }

        let resp = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&payload)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("anthropic api error {status}: {body}");
        }

        let body: Value = resp.json().await?;
        Ok(parse_response(&body))
    }
}
