//! `SubagentManager`: discovers named subagent definitions and drives a
//! fresh `ConversationEngine::run` for each `task` call. Unlike the
//! teacher's `agent/subagent/mod.rs`, which duplicates the tool-use loop
//! inline, this reuses the Conversation Engine directly, since a subagent is
//! modeled as a recursive instance of the Conversation Engine. Discovery's
//! manifest-with-front-matter, priority-root style follows the teacher's
//! `agent/skills/mod.rs` (workspace root before a builtin fallback root),
//! generalized here to three roots.

use crate::agent::conversation::Conversation;
use crate::agent::dispatch::{SubagentDispatcher, SubagentResult, SubagentStatus};
use crate::agent::engine::{ConversationEngine, EngineContext};
use crate::agent::executor::ToolExecutor;
use crate::agent::skills::{SkillManager, strip_frontmatter};
use crate::agent::tools::base::ExecutionContext;
use crate::agent::tools::registry::ToolRegistry;
use crate::agent::tools::validator::CommandValidator;
use crate::errors::AgentError;
use crate::providers::base::AIProvider;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
struct SubagentFrontmatter {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "allowed-tools", default)]
    allowed_tools: Vec<String>,
    #[serde(default = "default_model")]
    model: String,
}

fn default_model() -> String {
    "inherit".to_string()
}

#[derive(Debug, Clone)]
pub struct SubagentDefinition {
    pub name: String,
    pub description: String,
    pub allowed_tools: Vec<String>,
    pub model: String,
    pub system_prompt: String,
}

/// Discovers `AGENT.md` manifests under three roots in priority order:
/// `agents/`, `.claude/agents/`, both project-local, then the user-home
/// `.claude/agents/`. First-wins: a name discovered in an earlier root
/// shadows the same name in a later one.
pub struct SubagentManager {
    definitions: HashMap<String, SubagentDefinition>,
}

impl SubagentManager {
    pub fn discover(roots: &[PathBuf]) -> Self {
        let mut definitions = HashMap::new();
        for root in roots {
            let Ok(entries) = std::fs::read_dir(root) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_dir() {
                    continue;
                }
                let manifest_path = path.join("AGENT.md");
                let Ok(content) = std::fs::read_to_string(&manifest_path) else {
                    continue;
                };
                let Some(def) = parse_manifest(&content) else {
                    continue;
                };
                definitions.entry(def.name.clone()).or_insert(def);
            }
        }
        Self { definitions }
    }

    pub fn get(&self, name: &str) -> Option<&SubagentDefinition> {
        self.definitions.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.definitions.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }
}

fn parse_manifest(content: &str) -> Option<SubagentDefinition> {
    let body = content.strip_prefix("---")?;
    let end = body.find("---")?;
    let yaml = &body[..end];
    let fm: SubagentFrontmatter = serde_yaml_ng::from_str(yaml).ok()?;
    Some(SubagentDefinition {
        name: fm.name,
        description: fm.description,
        allowed_tools: fm.allowed_tools,
        model: fm.model,
        system_prompt: strip_frontmatter(content).to_string(),
    })
}

/// Drives a fresh `ConversationEngine::run` per spawn, with independent
/// budgets and an `allowed-tools`-filtered registry view. A recursive `task`
/// call inside a subagent reuses this same dispatcher, bounded only by the
/// parent's `max_actions`; no separate recursion-depth counter is needed
/// since every nested call still consumes the same `ExecutionContext`'s
/// action budget via its own engine loop.
pub struct SubagentRunner {
    manager: Arc<SubagentManager>,
    provider: Arc<dyn AIProvider>,
    base_registry: Arc<ToolRegistry>,
    skill_manager: Arc<OnceLock<Arc<SkillManager>>>,
    subagent_dispatcher: Arc<OnceLock<Arc<dyn SubagentDispatcher>>>,
    parent_model_id: String,
    working_dir: PathBuf,
    max_actions: u32,
    max_duration: Duration,
}

impl SubagentRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        manager: Arc<SubagentManager>,
        provider: Arc<dyn AIProvider>,
        base_registry: Arc<ToolRegistry>,
        skill_manager: Arc<OnceLock<Arc<SkillManager>>>,
        subagent_dispatcher: Arc<OnceLock<Arc<dyn SubagentDispatcher>>>,
        parent_model_id: impl Into<String>,
        working_dir: impl Into<PathBuf>,
        max_actions: u32,
        max_duration: Duration,
    ) -> Self {
        Self {
            manager,
            provider,
            base_registry,
            skill_manager,
            subagent_dispatcher,
            parent_model_id: parent_model_id.into(),
            working_dir: working_dir.into(),
            max_actions,
            max_duration,
        }
    }
}

#[async_trait]
impl SubagentDispatcher for SubagentRunner {
    async fn spawn(&self, agent_name: &str, prompt: &str) -> anyhow::Result<SubagentResult> {
        let Some(def) = self.manager.get(agent_name) else {
            anyhow::bail!("no such subagent: '{agent_name}'");
        };

        let allowed: Vec<String> = def
            .allowed_tools
            .iter()
            .cloned()
            .chain(
                ["complete_investigation", "escalate_investigation", "report_investigation"]
                    .iter()
                    .map(|s| s.to_string()),
            )
            .collect();
        let restricted_registry = self.base_registry.filtered(&allowed);

        // Subagents run headlessly: blacklist mode, safe commands
        // auto-approved, dangerous ones refused outright.
        let executor = Arc::new(ToolExecutor::new(
            restricted_registry,
            CommandValidator::blacklist(),
            true,
            Arc::new(OnceLock::new()),
            Arc::new(OnceLock::new()),
            self.skill_manager.clone(),
            self.subagent_dispatcher.clone(),
        ));
        let engine = ConversationEngine::new(self.provider.clone(), executor);

        let model_id = if def.model == "inherit" {
            self.parent_model_id.clone()
        } else {
            def.model.clone()
        };

        let id = Uuid::new_v4().to_string();
        let mut conversation = Conversation::with_session_id(id.clone());
        let exec_ctx = ExecutionContext::new(self.working_dir.clone(), id.clone());
        let engine_ctx = EngineContext {
            model_id,
            max_actions: self.max_actions,
            max_tokens: 4096,
            custom_prompt: Some(def.system_prompt.clone()),
            base_prompt: def.system_prompt.clone(),
            skills_summary: String::new(),
            thinking: crate::providers::base::ThinkingConfig::DISABLED,
            cancel: CancellationToken::new(),
        };

        let started = Instant::now();
        let outcome = tokio::time::timeout(
            self.max_duration,
            engine.send_user_turn(&mut conversation, prompt, &exec_ctx, &engine_ctx),
        )
        .await;

        let duration_ms = started.elapsed().as_millis() as u64;
        let actions_taken = conversation.tool_call_count() as u32;

        match outcome {
            Ok(Ok(findings)) => Ok(SubagentResult {
                id,
                agent_name: agent_name.to_string(),
                status: SubagentStatus::Completed,
                findings,
                actions_taken,
                duration_ms,
            }),
            Ok(Err(AgentError::BudgetExhausted(msg))) => Ok(SubagentResult {
                id,
                agent_name: agent_name.to_string(),
                status: SubagentStatus::BudgetExhausted,
                findings: msg,
                actions_taken,
                duration_ms,
            }),
            Ok(Err(e)) => Ok(SubagentResult {
                id,
                agent_name: agent_name.to_string(),
                status: SubagentStatus::Failed,
                findings: e.to_string(),
                actions_taken,
                duration_ms,
            }),
            Err(_) => Ok(SubagentResult {
                id,
                agent_name: agent_name.to_string(),
                status: SubagentStatus::BudgetExhausted,
                findings: format!("subagent '{agent_name}' exceeded max duration"),
                actions_taken,
                duration_ms,
            }),
        }
    }
}

/// The three well-known discovery roots in priority order: project-local
/// `agents/`, project-local `.claude/agents/`, and the user-home
/// `.claude/agents/`. First-root-wins, so a project definition shadows a
/// user-global one of the same name.
pub fn default_roots(working_dir: &Path) -> Vec<PathBuf> {
    let mut roots = vec![working_dir.join("agents"), working_dir.join(".claude/agents")];
    if let Some(home) = dirs::home_dir() {
        roots.push(home.join(".claude/agents"));
    }
    roots
}
