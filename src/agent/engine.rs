//! The Conversation Engine: the tool-use loop at the heart of the system.
//! Iterate, call, execute, append — a provider-agnostic,
//! reasoning-block-preserving loop with no built-in retry.

use crate::agent::conversation::{Conversation, Message, ToolResultBlock};
use crate::agent::executor::ToolExecutor;
use crate::agent::tools::base::ExecutionContext;
use crate::errors::AgentError;
use crate::providers::base::{AIProvider, ThinkingConfig};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything the loop needs beyond the conversation itself. Never read from
/// process-global state — every decision the engine makes is a function of
/// this struct and the conversation history.
#[derive(Clone)]
pub struct EngineContext {
    pub model_id: String,
    pub max_actions: u32,
    pub max_tokens: u32,
    /// Highest-priority system prompt override, if set by the caller.
    pub custom_prompt: Option<String>,
    pub base_prompt: String,
    pub skills_summary: String,
    pub thinking: ThinkingConfig,
    pub cancel: CancellationToken,
}

impl EngineContext {
    /// Strict-priority resolution: custom → plan-mode → base (+ skills).
    /// Never concatenates more than one tier.
    pub fn resolve_system_prompt(&self, plan_mode_prompt: Option<&str>) -> String {
        if let Some(custom) = &self.custom_prompt {
            return custom.clone();
        }
        if let Some(plan_prompt) = plan_mode_prompt {
            return plan_prompt.to_string();
        }
        if self.skills_summary.is_empty() {
            self.base_prompt.clone()
        } else {
            format!("{}\n\n{}", self.base_prompt, self.skills_summary)
        }
    }
}

const PLAN_MODE_PROMPT_SUFFIX: &str = "\n\nPlan mode is active. Explore the repository read-only; \
write your plan to the designated plan file instead of editing anything else.";

pub struct ConversationEngine {
    provider: Arc<dyn AIProvider>,
    executor: Arc<ToolExecutor>,
}

impl ConversationEngine {
    pub fn new(provider: Arc<dyn AIProvider>, executor: Arc<ToolExecutor>) -> Self {
        Self { provider, executor }
    }

    /// Appends `user_text` then drives the loop to completion.
    pub async fn send_user_turn(
        &self,
        conversation: &mut Conversation,
        user_text: &str,
        exec_ctx: &ExecutionContext,
        engine_ctx: &EngineContext,
    ) -> Result<String, AgentError> {
        conversation.push(Message::user(user_text));
        self.run(conversation, exec_ctx, engine_ctx).await
    }

    /// Iterate: call the provider, execute any tool calls it returns,
    /// append the results, and repeat until it stops calling tools.
    pub async fn run(
        &self,
        conversation: &mut Conversation,
        exec_ctx: &ExecutionContext,
        engine_ctx: &EngineContext,
    ) -> Result<String, AgentError> {
        let mut actions = 0u32;

        loop {
            if engine_ctx.cancel.is_cancelled() {
                return Err(AgentError::Canceled("conversation turn canceled".into()));
            }

            if actions >= engine_ctx.max_actions {
                let msg = "tool budget exhausted".to_string();
                conversation.push(Message::assistant(msg.clone(), vec![], vec![]));
                return Err(AgentError::BudgetExhausted(msg));
            }

            let plan_mode = exec_ctx.plan_mode.lock().await.clone();
            let plan_prompt = plan_mode
                .as_ref()
                .map(|_| format!("{}{}", engine_ctx.base_prompt, PLAN_MODE_PROMPT_SUFFIX));
            let system_text = engine_ctx.resolve_system_prompt(plan_prompt.as_deref());

            let tools = self.executor.tool_definitions();

            let response = tokio::select! {
                biased;
                _ = engine_ctx.cancel.cancelled() => {
                    return Err(AgentError::Canceled("conversation turn canceled".into()));
                }
                result = self.provider.send(
                    &engine_ctx.model_id,
                    engine_ctx.max_tokens,
                    &system_text,
                    &conversation.messages,
                    &tools,
                    engine_ctx.thinking,
                ) => result.map_err(|e| AgentError::ProviderFailure(e.to_string()))?,
            };

            let reasoning = response.reasoning();
            let text = response.text();
            let tool_calls = response.tool_calls();

            conversation.push(Message::assistant(text.clone(), tool_calls.clone(), reasoning));

            if tool_calls.is_empty() {
                return Ok(text);
            }

            let mut results = Vec::with_capacity(tool_calls.len());
            for call in &tool_calls {
                actions += 1;
                let (result_text, is_error) = self
                    .executor
                    .execute(&call.name, call.input.clone(), exec_ctx)
                    .await;
                results.push(ToolResultBlock {
                    tool_call_id: call.id.clone(),
                    text: result_text,
                    is_error,
                });
            }
            conversation.push(Message::tool_results(results));

            if let Some(signal) = &exec_ctx.investigation {
                let terminal = signal.terminal.lock().await;
                if let Some(outcome) = terminal.as_ref() {
                    return Ok(outcome_summary(outcome));
                }
            }
        }
    }
}

fn outcome_summary(outcome: &crate::agent::tools::base::InvestigationOutcome) -> String {
    use crate::agent::tools::base::InvestigationOutcome;
    match outcome {
        InvestigationOutcome::Completed { findings, confidence } => {
            format!("completed (confidence {confidence:.2}): {findings}")
        }
        InvestigationOutcome::Escalated { reason } => format!("escalated: {reason}"),
        InvestigationOutcome::Progress { findings } => format!("progress: {findings}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::conversation::{Role, ToolCall};
    use crate::agent::tools::base::{InvestigationSignal, Tool, ToolResult};
    use crate::agent::tools::registry::ToolRegistry;
    use crate::agent::tools::validator::CommandValidator;
    use crate::providers::base::{ContentBlock, ProviderResponse, StopReason, ToolDefinition};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::{Mutex, OnceLock};

    struct ScriptedProvider {
        responses: Mutex<Vec<ProviderResponse>>,
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
            Ok(responses.remove(0))
        }
    }

    fn text_response(text: &str) -> ProviderResponse {
        ProviderResponse {
            content: vec![ContentBlock::Text(text.to_string())],
            stop_reason: StopReason::EndTurn,
        }
    }

    fn tool_call_response(id: &str, name: &str, input: Value) -> ProviderResponse {
        ProviderResponse {
            content: vec![ContentBlock::ToolUse(ToolCall {
                id: id.to_string(),
                name: name.to_string(),
                input,
            })],
            stop_reason: StopReason::ToolUse,
        }
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echo"
        }
        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {"text": {"type": "string"}}, "required": ["text"]})
        }
        async fn execute(&self, input: Value, _ctx: &ExecutionContext) -> anyhow::Result<ToolResult> {
            Ok(ToolResult::ok(input["text"].as_str().unwrap_or_default().to_string()))
        }
    }

    fn engine_ctx() -> EngineContext {
        EngineContext {
            model_id: "test-model".into(),
            max_actions: 5,
            max_tokens: 1024,
            custom_prompt: None,
            base_prompt: "You are a helpful agent.".into(),
            skills_summary: String::new(),
            thinking: ThinkingConfig::DISABLED,
            cancel: CancellationToken::new(),
        }
    }

    fn executor_with_echo() -> Arc<ToolExecutor> {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        Arc::new(ToolExecutor::new(
            registry,
            CommandValidator::blacklist(),
            true,
            Arc::new(OnceLock::new()),
            Arc::new(OnceLock::new()),
            Arc::new(OnceLock::new()),
            Arc::new(OnceLock::new()),
        ))
    }

    #[tokio::test]
    async fn terminates_immediately_when_no_tool_calls() {
        let provider: Arc<dyn AIProvider> = Arc::new(ScriptedProvider {
            responses: Mutex::new(vec![text_response("hello there")]),
        });
        let engine = ConversationEngine::new(provider, executor_with_echo());
        let mut conversation = Conversation::new();
        let exec_ctx = ExecutionContext::new(std::env::temp_dir(), "s1");
        let result = engine
            .send_user_turn(&mut conversation, "hi", &exec_ctx, &engine_ctx())
            .await
            .unwrap();
        assert_eq!(result, "hello there");
        assert_eq!(conversation.messages.len(), 2);
    }

    #[tokio::test]
    async fn executes_tool_call_then_returns_final_text() {
        let provider: Arc<dyn AIProvider> = Arc::new(ScriptedProvider {
            responses: Mutex::new(vec![
                tool_call_response("t1", "echo", json!({"text": "round trip"})),
                text_response("done"),
            ]),
        });
        let engine = ConversationEngine::new(provider, executor_with_echo());
        let mut conversation = Conversation::new();
        let exec_ctx = ExecutionContext::new(std::env::temp_dir(), "s1");
        let result = engine
            .send_user_turn(&mut conversation, "use the tool", &exec_ctx, &engine_ctx())
            .await
            .unwrap();
        assert_eq!(result, "done");
        assert!(conversation.validate().is_ok());

        let tool_result_msg = &conversation.messages[2];
        assert_eq!(tool_result_msg.role, Role::User);
        assert_eq!(tool_result_msg.tool_results[0].text, "round trip");
    }

    #[tokio::test]
    async fn budget_exhaustion_terminates_loop() {
        let provider: Arc<dyn AIProvider> = Arc::new(ScriptedProvider {
            responses: Mutex::new(vec![
                tool_call_response("t1", "echo", json!({"text": "1"})),
                tool_call_response("t2", "echo", json!({"text": "2"})),
            ]),
        });
        let engine = ConversationEngine::new(provider, executor_with_echo());
        let mut conversation = Conversation::new();
        let exec_ctx = ExecutionContext::new(std::env::temp_dir(), "s1");
        let mut ctx = engine_ctx();
        ctx.max_actions = 1;
        let err = engine
            .send_user_turn(&mut conversation, "loop", &exec_ctx, &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::BudgetExhausted(_)));
        assert_eq!(conversation.messages.last().unwrap().text, "tool budget exhausted");
    }

    #[tokio::test]
    async fn terminal_investigation_outcome_ends_loop_early() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        registry.register(Arc::new(
            crate::agent::tools::investigation_tools::CompleteInvestigationTool,
        ));
        let executor = Arc::new(ToolExecutor::new(
            registry,
            CommandValidator::blacklist(),
            true,
            Arc::new(OnceLock::new()),
            Arc::new(OnceLock::new()),
            Arc::new(OnceLock::new()),
            Arc::new(OnceLock::new()),
        ));
        let provider: Arc<dyn AIProvider> = Arc::new(ScriptedProvider {
            responses: Mutex::new(vec![tool_call_response(
                "t1",
                "complete_investigation",
                json!({"findings": "disk full", "confidence": 1}),
            )]),
        });
        let engine = ConversationEngine::new(provider, executor);
        let mut conversation = Conversation::new();
        let signal = Arc::new(InvestigationSignal::default());
        let exec_ctx = ExecutionContext::new(std::env::temp_dir(), "inv-1")
            .with_investigation_signal(signal);
        let result = engine
            .send_user_turn(&mut conversation, "investigate", &exec_ctx, &engine_ctx())
            .await
            .unwrap();
        assert!(result.starts_with("completed"));
    }

    #[test]
    fn system_prompt_priority_is_custom_then_plan_then_base() {
        let mut ctx = engine_ctx();
        assert_eq!(ctx.resolve_system_prompt(None), "You are a helpful agent.");
        assert_eq!(
            ctx.resolve_system_prompt(Some("plan mode text")),
            "plan mode text"
        );
        ctx.custom_prompt = Some("custom override".into());
        assert_eq!(ctx.resolve_system_prompt(Some("plan mode text")), "custom override");
    }
}
