//! `enter_plan_mode(reason)` — activates plan mode on the session and
//! writes an empty plan file.

use crate::agent::dispatch::PlanModeConfirm;
use crate::agent::tools::base::{ExecutionContext, PlanMode, Tool, ToolResult};
use crate::fs::FileManager;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::{Arc, OnceLock};

pub struct EnterPlanModeTool {
    fs: Arc<dyn FileManager>,
    plan_path_template: String,
    confirm: Arc<OnceLock<Arc<dyn PlanModeConfirm>>>,
}

impl EnterPlanModeTool {
    /// `plan_path_template` is formatted with `{session_id}`, matching the
    /// persisted-state layout `${working_dir}/.agent/plans/${session_id}.md`.
    pub fn new(
        fs: Arc<dyn FileManager>,
        plan_path_template: impl Into<String>,
        confirm: Arc<OnceLock<Arc<dyn PlanModeConfirm>>>,
    ) -> Self {
        Self {
            fs,
            plan_path_template: plan_path_template.into(),
            confirm,
        }
    }
}

#[async_trait]
impl Tool for EnterPlanModeTool {
    fn name(&self) -> &str {
        "enter_plan_mode"
    }

    fn description(&self) -> &str {
        "Switch the session to read-only exploration and write a plan to a \
         designated file instead of editing the repository directly."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"reason": {"type": "string"}},
            "required": ["reason"],
        })
    }

    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> anyhow::Result<ToolResult> {
        let reason = input["reason"].as_str().unwrap_or_default();
        let plan_path = self
            .plan_path_template
            .replace("{session_id}", &ctx.session_id);

        if let Some(confirm) = self.confirm.get()
            && !confirm.confirm(reason, &plan_path).await
        {
            return Ok(ToolResult::error("plan mode entry declined"));
        }

        if let Err(e) = self.fs.write(&plan_path, "").await {
            return Ok(ToolResult::error(format!(
                "could not create plan file '{plan_path}': {e}"
            )));
        }

        *ctx.plan_mode.lock().await = Some(PlanMode {
            plan_path: plan_path.clone(),
            reason: reason.to_string(),
        });

        Ok(ToolResult::ok(format!(
            "plan mode active; write your plan to '{plan_path}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::SandboxedFileManager;
    use tempfile::tempdir;

    #[tokio::test]
    async fn activates_plan_mode_and_creates_empty_plan_file() {
        let dir = tempdir().unwrap();
        let fs: Arc<dyn FileManager> = Arc::new(SandboxedFileManager::new(dir.path()));
        let tool = EnterPlanModeTool::new(
            fs.clone(),
            ".agent/plans/{session_id}.md",
            Arc::new(OnceLock::new()),
        );
        let ctx = ExecutionContext::new(dir.path(), "sess-1");
        let result = tool
            .execute(json!({"reason": "large refactor"}), &ctx)
            .await
            .unwrap();
        assert!(!result.is_error);
        assert!(fs.exists(".agent/plans/sess-1.md").await);
        assert!(ctx.plan_mode.lock().await.is_some());
    }
}
