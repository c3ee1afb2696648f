//! The `AIProvider` contract: the only round-trip the core makes to an LLM.

use crate::agent::conversation::{Message, ReasoningBlock, ToolCall};
use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, Copy)]
pub struct ThinkingConfig {
    pub enabled: bool,
    /// Meaningful only when `enabled`; must be ≥ 1024 when set.
    pub budget_tokens: u32,
}

impl ThinkingConfig {
    pub const DISABLED: ThinkingConfig = ThinkingConfig {
        enabled: false,
        budget_tokens: 0,
    };
}

impl Default for ThinkingConfig {
    fn default() -> Self {
        Self::DISABLED
    }
}

/// One ordered content block from a provider response.
#[derive(Debug, Clone)]
pub enum ContentBlock {
    Text(String),
    ToolUse(ToolCall),
    Thinking(ReasoningBlock),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    Other,
}

#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: StopReason,
}

impl ProviderResponse {
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn reasoning(&self) -> Vec<ReasoningBlock> {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Thinking(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn has_tool_calls(&self) -> bool {
        self.content
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolUse(_)))
    }
}

/// The Conversation Engine's only external call. No retry wrapper is
/// offered here: the caller decides whether and how to retry.
#[async_trait]
pub trait AIProvider: Send + Sync {
    async fn send(
        &self,
        model_id: &str,
        max_tokens: u32,
        system_text: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        thinking: ThinkingConfig,
    ) -> anyhow::Result<ProviderResponse>;
}
