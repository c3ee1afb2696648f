//! `bash(command, description)` — the only tool the safety gate classifies.
//! Command validation happens in `ToolExecutor::execute`, not here: this
//! tool only runs a command that has already been admitted.

use crate::agent::tools::base::{ExecutionContext, Tool, ToolResult};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::process::Command;

const MAX_OUTPUT_BYTES: usize = 1024 * 1024;

pub struct BashTool {
    timeout: Duration,
}

impl BashTool {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for BashTool {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        "bash"
    }

    fn description(&self) -> &str {
        "Run a shell command in the working directory and return its \
         combined stdout/stderr."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {"type": "string"},
                "description": {"type": "string"},
            },
            "required": ["command"],
        })
    }

    fn is_mutating(&self) -> bool {
        true
    }

    fn execution_timeout(&self) -> Duration {
        self.timeout
    }

    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> anyhow::Result<ToolResult> {
        let command = input["command"].as_str().unwrap_or_default();
        if command.is_empty() {
            return Ok(ToolResult::error("command must be non-empty"));
        }

        let output = tokio::time::timeout(
            self.timeout,
            Command::new("sh")
                .arg("-c")
                .arg(command)
                .current_dir(&ctx.working_dir)
                .output(),
        )
        .await;

        match output {
            Ok(Ok(output)) => {
                let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
                combined.push_str(&String::from_utf8_lossy(&output.stderr));
                let truncated = truncate_at_char_boundary(&combined, MAX_OUTPUT_BYTES);
                Ok(ToolResult {
                    content: truncated,
                    is_error: !output.status.success(),
                })
            }
            Ok(Err(e)) => Ok(ToolResult::error(format!("failed to spawn command: {e}"))),
            Err(_) => Ok(ToolResult::error(format!(
                "command timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

fn truncate_at_char_boundary(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n...[truncated]", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_command_and_captures_stdout() {
        let tool = BashTool::default();
        let ctx = ExecutionContext::new(std::env::temp_dir(), "s1");
        let result = tool
            .execute(json!({"command": "echo hello"}), &ctx)
            .await
            .unwrap();
        assert!(!result.is_error);
        assert!(result.content.contains("hello"));
    }

    #[tokio::test]
    async fn nonzero_exit_marks_error() {
        let tool = BashTool::default();
        let ctx = ExecutionContext::new(std::env::temp_dir(), "s1");
        let result = tool
            .execute(json!({"command": "exit 1"}), &ctx)
            .await
            .unwrap();
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn empty_command_is_rejected() {
        let tool = BashTool::default();
        let ctx = ExecutionContext::new(std::env::temp_dir(), "s1");
        let result = tool.execute(json!({"command": ""}), &ctx).await.unwrap();
        assert!(result.is_error);
    }
}
