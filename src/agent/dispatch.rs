//! Shared trait objects installed into the `ToolExecutor` and individual
//! tools post-construction: a late-bound dispatcher pattern that breaks the
//! `ToolExecutor` ↔ `SubagentManager` cycle.

use async_trait::async_trait;

/// Confirmation prompt for the `bash` tool's safety gate. `reason` is
/// populated for dangerous commands.
#[async_trait]
pub trait CommandConfirmation: Send + Sync {
    async fn confirm(
        &self,
        command: &str,
        is_dangerous: bool,
        reason: Option<&str>,
        description: &str,
    ) -> bool;
}

/// Confirmation prompt invoked by `enter_plan_mode` before plan mode is
/// actually activated on the session.
#[async_trait]
pub trait PlanModeConfirm: Send + Sync {
    async fn confirm(&self, reason: &str, plan_path: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubagentStatus {
    Completed,
    Failed,
    BudgetExhausted,
}

#[derive(Debug, Clone)]
pub struct SubagentResult {
    pub id: String,
    pub agent_name: String,
    pub status: SubagentStatus,
    pub findings: String,
    pub actions_taken: u32,
    pub duration_ms: u64,
}

/// Installed on `ToolExecutor` via `set_subagent_dispatcher`; the `task`
/// tool calls through this to spawn an isolated child conversation.
#[async_trait]
pub trait SubagentDispatcher: Send + Sync {
    async fn spawn(&self, agent_name: &str, prompt: &str) -> anyhow::Result<SubagentResult>;
}

/// Installed on `ToolExecutor` when `ask_llm_on_unknown` is set (whitelist
/// mode). A command the whitelist doesn't recognize is adjudicated by a
/// separate, constrained model call instead of an outright refusal.
#[async_trait]
pub trait UnknownCommandAdjudicator: Send + Sync {
    async fn admit(&self, command: &str) -> bool;
}
