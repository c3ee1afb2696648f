//! `complete_investigation`, `escalate_investigation`, `report_investigation`.
//! Present in the allowed-tools set only for investigation sessions; the
//! engine loop polls `ExecutionContext::investigation` after each dispatch
//! round and ends the turn early on a terminal outcome.

use crate::agent::tools::base::{ExecutionContext, InvestigationOutcome, Tool, ToolResult};
use async_trait::async_trait;
use serde_json::{Value, json};

fn confidence(input: &Value) -> f32 {
    input["confidence"].as_f64().unwrap_or(0.0).clamp(0.0, 1.0) as f32
}

pub struct CompleteInvestigationTool;

#[async_trait]
impl Tool for CompleteInvestigationTool {
    fn name(&self) -> &str {
        "complete_investigation"
    }

    fn description(&self) -> &str {
        "Conclude the investigation successfully with findings and a \
         confidence score in [0, 1]."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "findings": {"type": "string"},
                "confidence": {"type": "number"},
            },
            "required": ["findings", "confidence"],
        })
    }

    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> anyhow::Result<ToolResult> {
        let findings = input["findings"].as_str().unwrap_or_default().to_string();
        let outcome = InvestigationOutcome::Completed {
            findings: findings.clone(),
            confidence: confidence(&input),
        };
        let Some(signal) = &ctx.investigation else {
            return Ok(ToolResult::error(
                "complete_investigation is only available in an investigation session",
            ));
        };
        *signal.terminal.lock().await = Some(outcome);
        Ok(ToolResult::ok(format!(
            "investigation completed: {findings}"
        )))
    }
}

pub struct EscalateInvestigationTool;

#[async_trait]
impl Tool for EscalateInvestigationTool {
    fn name(&self) -> &str {
        "escalate_investigation"
    }

    fn description(&self) -> &str {
        "Give up on resolving the alert autonomously and hand it to a human, \
         with a reason."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"reason": {"type": "string"}},
            "required": ["reason"],
        })
    }

    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> anyhow::Result<ToolResult> {
        let reason = input["reason"].as_str().unwrap_or_default().to_string();
        let Some(signal) = &ctx.investigation else {
            return Ok(ToolResult::error(
                "escalate_investigation is only available in an investigation session",
            ));
        };
        *signal.terminal.lock().await = Some(InvestigationOutcome::Escalated {
            reason: reason.clone(),
        });
        Ok(ToolResult::ok(format!("investigation escalated: {reason}")))
    }
}

pub struct ReportInvestigationTool;

#[async_trait]
impl Tool for ReportInvestigationTool {
    fn name(&self) -> &str {
        "report_investigation"
    }

    fn description(&self) -> &str {
        "Record an intermediate progress report without ending the \
         investigation."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"findings": {"type": "string"}},
            "required": ["findings"],
        })
    }

    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> anyhow::Result<ToolResult> {
        let findings = input["findings"].as_str().unwrap_or_default().to_string();
        let Some(signal) = &ctx.investigation else {
            return Ok(ToolResult::error(
                "report_investigation is only available in an investigation session",
            ));
        };
        signal.progress.lock().await.push(findings.clone());
        Ok(ToolResult::ok(format!(
            "progress recorded ({} chars)",
            findings.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tools::base::InvestigationSignal;
    use std::sync::Arc;

    fn ctx_with_signal() -> (ExecutionContext, Arc<InvestigationSignal>) {
        let signal = Arc::new(InvestigationSignal::default());
        let ctx = ExecutionContext::new(std::env::temp_dir(), "inv-1")
            .with_investigation_signal(signal.clone());
        (ctx, signal)
    }

    #[tokio::test]
    async fn complete_sets_terminal_outcome() {
        let (ctx, signal) = ctx_with_signal();
        let tool = CompleteInvestigationTool;
        let result = tool
            .execute(json!({"findings": "disk full on node-3", "confidence": 0.85}), &ctx)
            .await
            .unwrap();
        assert!(!result.is_error);
        let terminal = signal.terminal.lock().await;
        assert!(matches!(
            &*terminal,
            Some(InvestigationOutcome::Completed { findings, confidence })
                if findings == "disk full on node-3" && (*confidence - 0.85).abs() < f32::EPSILON
        ));
    }

    #[tokio::test]
    async fn escalate_sets_terminal_outcome() {
        let (ctx, signal) = ctx_with_signal();
        let tool = EscalateInvestigationTool;
        let result = tool
            .execute(json!({"reason": "needs production access"}), &ctx)
            .await
            .unwrap();
        assert!(!result.is_error);
        assert!(matches!(
            &*signal.terminal.lock().await,
            Some(InvestigationOutcome::Escalated { reason }) if reason == "needs production access"
        ));
    }

    #[tokio::test]
    async fn report_does_not_set_terminal_outcome() {
        let (ctx, signal) = ctx_with_signal();
        let tool = ReportInvestigationTool;
        let result = tool
            .execute(json!({"findings": "checked logs, nothing yet"}), &ctx)
            .await
            .unwrap();
        assert!(!result.is_error);
        assert!(signal.terminal.lock().await.is_none());
        assert_eq!(signal.progress.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn errors_outside_investigation_session() {
        let ctx = ExecutionContext::new(std::env::temp_dir(), "s1");
        let result = CompleteInvestigationTool
            .execute(json!({"findings": "x", "confidence": 1}), &ctx)
            .await
            .unwrap();
        assert!(result.is_error);
    }
}
