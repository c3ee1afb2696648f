// Shared scaffolding for the cross-module scenario tests in this directory.
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Mutex;
use vigil::agent::conversation::{Message, ToolCall};
use vigil::providers::base::{AIProvider, ContentBlock, ProviderResponse, StopReason, ThinkingConfig, ToolDefinition};

/// Replays a fixed sequence of responses, one per `send` call. Grounded on
/// the engine's own `ScriptedProvider` test double, reused here because
/// integration tests live in a separate crate and can't see that one.
pub struct ScriptedProvider {
    responses: Mutex<Vec<ProviderResponse>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
        }
    }
}

#[async_trait]
impl AIProvider for ScriptedProvider {
    async fn send(
        &self,
        _model_id: &str,
        _max_tokens: u32,
        _system_text: &str,
        _messages: &[Message],
        _tools: &[ToolDefinition],
        _thinking: ThinkingConfig,
    ) -> anyhow::Result<ProviderResponse> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            anyhow::bail!("scripted provider exhausted its responses");
        }
        Ok(responses.remove(0))
    }
}

/// Emits the same tool call forever, for scenarios that exercise budget or
/// timeout limits rather than a specific conversation shape.
pub struct RepeatingToolCallProvider {
    name: String,
    input: serde_json::Value,
}

impl RepeatingToolCallProvider {
    pub fn new(name: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            input,
        }
    }
}

#[async_trait]
impl AIProvider for RepeatingToolCallProvider {
    async fn send(
        &self,
        _model_id: &str,
        _max_tokens: u32,
        _system_text: &str,
        _messages: &[Message],
        _tools: &[ToolDefinition],
        _thinking: ThinkingConfig,
    ) -> anyhow::Result<ProviderResponse> {
        Ok(tool_call_response(
            &format!("t{}", fastrand::u32(..)),
            &self.name,
            self.input.clone(),
        ))
    }
}

pub fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        content: vec![ContentBlock::Text(text.to_string())],
        stop_reason: StopReason::EndTurn,
    }
}

pub fn tool_call_response(id: &str, name: &str, input: serde_json::Value) -> ProviderResponse {
    ProviderResponse {
        content: vec![ContentBlock::ToolUse(ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            input,
        })],
        stop_reason: StopReason::ToolUse,
    }
}
