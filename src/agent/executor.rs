//! `ToolExecutor`: the lookup → validate → planning-gate → safety-gate →
//! dispatch pipeline every tool call goes through.

use crate::agent::dispatch::{
    CommandConfirmation, PlanModeConfirm, SubagentDispatcher, UnknownCommandAdjudicator,
};
use crate::agent::skills::SkillManager;
use crate::agent::tools::base::{ExecutionContext, Tool, validate_schema};
use crate::agent::tools::registry::ToolRegistry;
use crate::agent::tools::validator::{CommandValidator, ValidationMode, WhitelistVerdict};
use std::sync::{Arc, OnceLock};

pub struct ToolExecutor {
    registry: ToolRegistry,
    validator: CommandValidator,
    auto_approve_safe: bool,
    command_confirmation: Arc<OnceLock<Arc<dyn CommandConfirmation>>>,
    plan_mode_confirm: Arc<OnceLock<Arc<dyn PlanModeConfirm>>>,
    skill_manager: Arc<OnceLock<Arc<SkillManager>>>,
    subagent_dispatcher: Arc<OnceLock<Arc<dyn SubagentDispatcher>>>,
    unknown_adjudicator: Arc<OnceLock<Arc<dyn UnknownCommandAdjudicator>>>,
}

impl ToolExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: ToolRegistry,
        validator: CommandValidator,
        auto_approve_safe: bool,
        command_confirmation: Arc<OnceLock<Arc<dyn CommandConfirmation>>>,
        plan_mode_confirm: Arc<OnceLock<Arc<dyn PlanModeConfirm>>>,
        skill_manager: Arc<OnceLock<Arc<SkillManager>>>,
        subagent_dispatcher: Arc<OnceLock<Arc<dyn SubagentDispatcher>>>,
    ) -> Self {
        Self {
            registry,
            validator,
            auto_approve_safe,
            command_confirmation,
            plan_mode_confirm,
            skill_manager,
            subagent_dispatcher,
            unknown_adjudicator: Arc::new(OnceLock::new()),
        }
    }

    pub fn set_command_confirmation(&self, handler: Arc<dyn CommandConfirmation>) {
        let _ = self.command_confirmation.set(handler);
    }

    pub fn set_plan_mode_confirm(&self, handler: Arc<dyn PlanModeConfirm>) {
        let _ = self.plan_mode_confirm.set(handler);
    }

    pub fn set_skill_manager(&self, manager: Arc<SkillManager>) {
        let _ = self.skill_manager.set(manager);
    }

    pub fn set_subagent_dispatcher(&self, dispatcher: Arc<dyn SubagentDispatcher>) {
        let _ = self.subagent_dispatcher.set(dispatcher);
    }

    /// Installs the adjudicator fielding whitelist-mode unknowns. Its mere
    /// presence is what `ask_llm_on_unknown` means here: unset, unknowns are
    /// refused outright.
    pub fn set_unknown_adjudicator(&self, adjudicator: Arc<dyn UnknownCommandAdjudicator>) {
        let _ = self.unknown_adjudicator.set(adjudicator);
    }

    pub fn list_tools(&self) -> Vec<Arc<dyn Tool>> {
        self.registry.list_tools()
    }

    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.registry.get(name)
    }

    pub fn tool_definitions(&self) -> Vec<crate::providers::base::ToolDefinition> {
        self.registry.get_tool_definitions()
    }

    /// Runs the full pipeline for one tool call. Always returns `Ok` — every
    /// refusal is surfaced as `(text, is_error=true)`, never a `Result::Err`,
    /// since tool-local failures are fed back to the model.
    pub async fn execute(&self, name: &str, input: serde_json::Value, ctx: &ExecutionContext) -> (String, bool) {
        let Some(tool) = self.registry.get(name) else {
            return (format!("unknown tool: '{name}'"), true);
        };

        if let Err(e) = validate_schema(&tool.parameters(), &input) {
            return (format!("invalid input for '{name}': {e}"), true);
        }

        if let Some(refusal) = self.planning_gate(name, &input, ctx).await {
            return (refusal, true);
        }

        if name == "bash"
            && let Some(refusal) = self.safety_gate(&input).await
        {
            return (refusal, true);
        }

        match tool.execute(input, ctx).await {
            Ok(result) => (result.content, result.is_error),
            Err(e) => (format!("tool '{name}' failed: {e}"), true),
        }
    }

    async fn planning_gate(&self, name: &str, input: &serde_json::Value, ctx: &ExecutionContext) -> Option<String> {
        let plan = ctx.plan_mode.lock().await;
        let Some(plan) = plan.as_ref() else {
            return None;
        };

        let is_mutating = self
            .registry
            .get(name)
            .map(|t| t.is_mutating())
            .unwrap_or(false);
        if !is_mutating {
            return None;
        }

        if name == "edit_file" {
            let target = input["path"].as_str().unwrap_or_default();
            if target == plan.plan_path {
                return None;
            }
        }

        Some(format!(
            "plan mode is active ({}); only edits to '{}' are permitted until the plan is approved",
            plan.reason, plan.plan_path
        ))
    }

    async fn safety_gate(&self, input: &serde_json::Value) -> Option<String> {
        let command = input["command"].as_str().unwrap_or_default();

        match self.validator.mode() {
            ValidationMode::Blacklist => {
                let classification = self.validator.classify(command);
                if self.auto_approve_safe {
                    if classification.is_dangerous {
                        tracing::warn!(command, "refusing dangerous command in headless mode");
                        return Some(format!(
                            "refused: {}",
                            classification.reason.unwrap_or_default()
                        ));
                    }
                    tracing::info!(command, "auto-approved safe command in headless mode");
                    return None;
                }
                let Some(confirm) = self.command_confirmation.get() else {
                    return Some("no confirmation handler installed; refusing by default".into());
                };
                let approved = confirm
                    .confirm(
                        command,
                        classification.is_dangerous,
                        classification.reason.as_deref(),
                        &classification.description,
                    )
                    .await;
                if approved { None } else { Some("command declined by user".into()) }
            }
            ValidationMode::Whitelist => match self.validator.check_whitelist(command) {
                WhitelistVerdict::Admitted { .. } => None,
                WhitelistVerdict::Unknown => {
                    if let Some(adjudicator) = self.unknown_adjudicator.get() {
                        if adjudicator.admit(command).await {
                            tracing::info!(command, "llm adjudicator admitted unknown command");
                            return None;
                        }
                        return Some(format!(
                            "command '{command}' is not in the whitelist and was not admitted by the llm adjudicator"
                        ));
                    }
                    Some(format!("command '{command}' is not in the whitelist"))
                }
            },
        }
    }
}
