//! Builds the canonical tool registry: every canonical tool, wired with the
//! shared late-bound dispatcher cells the executor installs handlers into
//! after construction.

use crate::agent::dispatch::{CommandConfirmation, PlanModeConfirm, SubagentDispatcher};
use crate::agent::skills::SkillManager;
use crate::agent::tools::filesystem::{EditFileTool, ListFilesTool, ReadFileTool};
use crate::agent::tools::investigation_tools::{
    CompleteInvestigationTool, EscalateInvestigationTool, ReportInvestigationTool,
};
use crate::agent::tools::plan_tool::EnterPlanModeTool;
use crate::agent::tools::registry::ToolRegistry;
use crate::agent::tools::shell::BashTool;
use crate::agent::tools::skill_tool::ActivateSkillTool;
use crate::agent::tools::task_tool::TaskTool;
use crate::fs::FileManager;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Late-bound handles the executor fills in once the pieces they depend on
/// (confirmation UI, skill manager, subagent runner) exist. Tools hold
/// clones of these cells at construction time and read through them lazily.
#[derive(Clone, Default)]
pub struct DispatchCells {
    pub command_confirmation: Arc<OnceLock<Arc<dyn CommandConfirmation>>>,
    pub plan_mode_confirm: Arc<OnceLock<Arc<dyn PlanModeConfirm>>>,
    pub skill_manager: Arc<OnceLock<Arc<SkillManager>>>,
    pub subagent_dispatcher: Arc<OnceLock<Arc<dyn SubagentDispatcher>>>,
}

/// Builds the full, unrestricted tool registry: the ten canonical tools.
/// Per-session/subagent/investigation allowed-tools views are produced from
/// this with `ToolRegistry::filtered`.
pub fn build_registry(
    fs: Arc<dyn FileManager>,
    plan_path_template: impl Into<String>,
    bash_timeout: Duration,
    cells: &DispatchCells,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(ReadFileTool::new(fs.clone())));
    registry.register(Arc::new(ListFilesTool::new(fs.clone())));
    registry.register(Arc::new(EditFileTool::new(fs.clone())));
    registry.register(Arc::new(BashTool::new(bash_timeout)));
    registry.register(Arc::new(ActivateSkillTool::new(cells.skill_manager.clone())));
    registry.register(Arc::new(EnterPlanModeTool::new(
        fs,
        plan_path_template,
        cells.plan_mode_confirm.clone(),
    )));
    registry.register(Arc::new(TaskTool::new(cells.subagent_dispatcher.clone())));
    registry.register(Arc::new(CompleteInvestigationTool));
    registry.register(Arc::new(EscalateInvestigationTool));
    registry.register(Arc::new(ReportInvestigationTool));

    registry
}

/// The allowed-tools set an investigation session gets: the same base tool
/// set minus `task`/`activate_skill` plus the three outcome tools, or
/// explicitly whatever the alert's routing config names, extended with the
/// three outcome tools which every investigation session must retain.
pub fn investigation_allowed_tools(mut base: Vec<String>) -> Vec<String> {
    for name in [
        "complete_investigation",
        "escalate_investigation",
        "report_investigation",
    ] {
        if !base.iter().any(|t| t == name) {
            base.push(name.to_string());
        }
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::SandboxedFileManager;
    use tempfile::tempdir;

    #[test]
    fn build_registry_registers_all_ten_tools() {
        let dir = tempdir().unwrap();
        let fs: Arc<dyn FileManager> = Arc::new(SandboxedFileManager::new(dir.path()));
        let cells = DispatchCells::default();
        let registry = build_registry(fs, ".agent/plans/{session_id}.md", Duration::from_secs(30), &cells);
        assert_eq!(
            registry.tool_names(),
            vec![
                "activate_skill",
                "bash",
                "complete_investigation",
                "edit_file",
                "enter_plan_mode",
                "escalate_investigation",
                "list_files",
                "read_file",
                "report_investigation",
                "task",
            ]
        );
    }

    #[test]
    fn investigation_allowed_tools_always_includes_outcome_tools() {
        let allowed = investigation_allowed_tools(vec!["read_file".to_string(), "bash".to_string()]);
        assert!(allowed.contains(&"complete_investigation".to_string()));
        assert!(allowed.contains(&"escalate_investigation".to_string()));
        assert!(allowed.contains(&"report_investigation".to_string()));
        assert!(allowed.contains(&"read_file".to_string()));
    }
}
