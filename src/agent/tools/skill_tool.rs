//! `activate_skill(name)` — injects a skill's `SKILL.md` body into the
//! conversation as an informational user message.

use crate::agent::skills::SkillManager;
use crate::agent::tools::base::{ExecutionContext, Tool, ToolResult};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::{Arc, OnceLock};

pub struct ActivateSkillTool {
    manager: Arc<OnceLock<Arc<SkillManager>>>,
}

impl ActivateSkillTool {
    pub fn new(manager: Arc<OnceLock<Arc<SkillManager>>>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Tool for ActivateSkillTool {
    fn name(&self) -> &str {
        "activate_skill"
    }

    fn description(&self) -> &str {
        "Load a named skill's reference material into the conversation."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "required": ["name"],
        })
    }

    async fn execute(&self, input: Value, _ctx: &ExecutionContext) -> anyhow::Result<ToolResult> {
        let name = input["name"].as_str().unwrap_or_default();
        let Some(manager) = self.manager.get() else {
            return Ok(ToolResult::error("no skill manager installed"));
        };
        match manager.activate(name).await {
            Some(body) => Ok(ToolResult::ok(body)),
            None => Ok(ToolResult::error(format!("no such skill: '{name}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn errors_when_no_manager_installed() {
        let tool = ActivateSkillTool::new(Arc::new(OnceLock::new()));
        let ctx = ExecutionContext::new(std::env::temp_dir(), "s1");
        let result = tool
            .execute(json!({"name": "deploy"}), &ctx)
            .await
            .unwrap();
        assert!(result.is_error);
    }
}
