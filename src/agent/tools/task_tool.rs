//! `task(agent_name, prompt)` — spawns an isolated subagent conversation.
//! Dispatches through the late-bound `SubagentDispatcher` installed
//! post-construction, breaking the `ToolExecutor` ↔ `SubagentManager` cycle.

use crate::agent::dispatch::SubagentDispatcher;
use crate::agent::tools::base::{ExecutionContext, Tool, ToolResult};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::{Arc, OnceLock};

pub struct TaskTool {
    dispatcher: Arc<OnceLock<Arc<dyn SubagentDispatcher>>>,
}

impl TaskTool {
    pub fn new(dispatcher: Arc<OnceLock<Arc<dyn SubagentDispatcher>>>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl Tool for TaskTool {
    fn name(&self) -> &str {
        "task"
    }

    fn description(&self) -> &str {
        "Spawn a named subagent with a capability-restricted tool set and a \
         fresh conversation, returning its summary findings."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "agent_name": {"type": "string"},
                "prompt": {"type": "string"},
            },
            "required": ["agent_name", "prompt"],
        })
    }

    fn is_mutating(&self) -> bool {
        true
    }

    async fn execute(&self, input: Value, _ctx: &ExecutionContext) -> anyhow::Result<ToolResult> {
        let agent_name = input["agent_name"].as_str().unwrap_or_default();
        let prompt = input["prompt"].as_str().unwrap_or_default();

        let Some(dispatcher) = self.dispatcher.get() else {
            return Ok(ToolResult::error("no subagent dispatcher installed"));
        };

        match dispatcher.spawn(agent_name, prompt).await {
            Ok(result) => Ok(ToolResult::ok(format!(
                "[{:?}] {}",
                result.status, result.findings
            ))),
            Err(e) => Ok(ToolResult::error(format!(
                "subagent '{agent_name}' failed: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn errors_when_no_dispatcher_installed() {
        let tool = TaskTool::new(Arc::new(OnceLock::new()));
        let ctx = ExecutionContext::new(std::env::temp_dir(), "s1");
        let result = tool
            .execute(json!({"agent_name": "reviewer", "prompt": "look at x"}), &ctx)
            .await
            .unwrap();
        assert!(result.is_error);
    }
}
