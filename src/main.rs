//! Binary entry point: wires the ambient stack (config, provider, tool
//! registry, skills, subagents, investigation scheduler, alert ingress)
//! around the Conversation Engine and exposes it as a `chat` REPL or a
//! `serve` webhook listener.

use anyhow::Context;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use vigil::agent::conversation::Conversation;
use vigil::agent::dispatch::{
    CommandConfirmation, PlanModeConfirm, SubagentDispatcher, UnknownCommandAdjudicator,
};
use vigil::agent::engine::{ConversationEngine, EngineContext};
use vigil::agent::executor::ToolExecutor;
use vigil::agent::skills::SkillManager;
use vigil::agent::subagent::{SubagentManager, SubagentRunner, default_roots};
use vigil::agent::tools::base::ExecutionContext;
use vigil::agent::tools::setup::{DispatchCells, build_registry};
use vigil::agent::tools::validator::CommandValidator;
use vigil::config::{CommandValidationMode, Config};
use vigil::fs::{FileManager, SandboxedFileManager};
use vigil::ingress::{AlertSource, GenericJsonDecoder, IngressState, build_router};
use vigil::investigation::scheduler::{InvestigationScheduler, SchedulerBudgets};
use vigil::investigation::store::InvestigationStore;
use vigil::providers::anthropic::AnthropicProvider;
use vigil::providers::base::{AIProvider, ThinkingConfig};

const DEFAULT_BASE_PROMPT: &str = "You are an agent that edits code and answers \
questions about this repository. Use the available tools to explore and \
modify files, and run commands when needed to verify your work.";

#[derive(Parser)]
#[command(name = "vigil", about = "Tool-use agent: interactive coding and autonomous alert investigation")]
struct Cli {
    #[arg(long, default_value = "vigil.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive REPL driving the Conversation Engine against stdin/stdout.
    Chat,
    /// Run the alert ingress HTTP server and investigation scheduler.
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config).context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let fs: Arc<dyn FileManager> = Arc::new(SandboxedFileManager::new(&config.working_dir));

    let cells = DispatchCells::default();
    let registry = build_registry(
        fs.clone(),
        ".agent/plans/{session_id}.md",
        Duration::from_secs(120),
        &cells,
    );

    let validator = match config.command_validation_mode {
        CommandValidationMode::Blacklist => CommandValidator::blacklist(),
        CommandValidationMode::Whitelist => CommandValidator::whitelist(config.command_whitelist_json.clone()),
    };
    let whitelist_mode = matches!(config.command_validation_mode, CommandValidationMode::Whitelist);

    let executor = Arc::new(ToolExecutor::new(
        registry,
        validator,
        config.auto_approve_safe,
        cells.command_confirmation.clone(),
        cells.plan_mode_confirm.clone(),
        cells.skill_manager.clone(),
        cells.subagent_dispatcher.clone(),
    ));

    if !config.auto_approve_safe {
        executor.set_command_confirmation(Arc::new(StdinCommandConfirmation));
        executor.set_plan_mode_confirm(Arc::new(StdinPlanModeConfirm));
    }

    let skills_root = config
        .skills_root
        .clone()
        .unwrap_or_else(|| config.working_dir.join(".agent/skills"));
    let skill_manager = Arc::new(SkillManager::new(skills_root));
    executor.set_skill_manager(skill_manager.clone());

    let api_key = std::env::var("ANTHROPIC_API_KEY").context("ANTHROPIC_API_KEY must be set")?;
    let provider: Arc<dyn AIProvider> = Arc::new(AnthropicProvider::new(api_key));

    if whitelist_mode && config.ask_llm_on_unknown {
        executor.set_unknown_adjudicator(Arc::new(ProviderUnknownCommandAdjudicator {
            provider: provider.clone(),
            model_id: config.model.clone(),
        }));
    }

    let subagents_root = config
        .subagents_root
        .clone()
        .unwrap_or_else(|| config.working_dir.clone());
    let subagent_manager = Arc::new(SubagentManager::discover(&default_roots(&subagents_root)));
    let subagent_runner: Arc<dyn SubagentDispatcher> = Arc::new(SubagentRunner::new(
        subagent_manager,
        provider.clone(),
        Arc::new(executor.list_tools().into_iter().fold(
            vigil::agent::tools::registry::ToolRegistry::new(),
            |mut registry, tool| {
                registry.register(tool);
                registry
            },
        )),
        cells.skill_manager.clone(),
        cells.subagent_dispatcher.clone(),
        config.model.clone(),
        config.working_dir.clone(),
        config.investigation.max_actions,
        Duration::from_secs(config.investigation.max_duration_secs),
    ));
    executor.set_subagent_dispatcher(subagent_runner);

    let skills_summary = skill_manager.build_skills_summary().await;
    let engine = Arc::new(ConversationEngine::new(provider.clone(), executor.clone()));

    match cli.command {
        Command::Chat => run_chat(engine, &config, skills_summary).await,
        Command::Serve { addr } => run_serve(engine, &config, skills_summary, &addr).await,
    }
}

async fn run_chat(engine: Arc<ConversationEngine>, config: &Config, skills_summary: String) -> anyhow::Result<()> {
    let engine_ctx = EngineContext {
        model_id: config.model.clone(),
        max_actions: config.max_actions,
        max_tokens: config.max_tokens,
        custom_prompt: None,
        base_prompt: DEFAULT_BASE_PROMPT.to_string(),
        skills_summary,
        thinking: if config.thinking.enabled {
            ThinkingConfig {
                enabled: true,
                budget_tokens: config.thinking.budget,
            }
        } else {
            ThinkingConfig::DISABLED
        },
        cancel: tokio_util::sync::CancellationToken::new(),
    };
    let exec_ctx = ExecutionContext::new(config.working_dir.clone(), uuid::Uuid::new_v4().to_string());
    let mut conversation = Conversation::new();

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    print!("> ");
    std::io::stdout().flush().ok();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            print!("> ");
            std::io::stdout().flush().ok();
            continue;
        }
        match engine.send_user_turn(&mut conversation, &line, &exec_ctx, &engine_ctx).await {
            Ok(reply) => println!("{reply}"),
            Err(e) => eprintln!("error: {e}"),
        }
        print!("> ");
        std::io::stdout().flush().ok();
    }
    Ok(())
}

async fn run_serve(
    engine: Arc<ConversationEngine>,
    config: &Config,
    _skills_summary: String,
    addr: &str,
) -> anyhow::Result<()> {
    let store = Arc::new(InvestigationStore::new(&config.working_dir));
    let budgets = SchedulerBudgets {
        max_concurrent: config.investigation.max_concurrent,
        queue_cap: config.investigation.queue_cap,
        max_actions: config.investigation.max_actions,
        max_duration: Duration::from_secs(config.investigation.max_duration_secs),
    };
    let mut scheduler = InvestigationScheduler::new(
        budgets,
        store,
        engine,
        config.working_dir.clone(),
        config.model.clone(),
    );
    scheduler.set_auto_investigate_warnings(config.investigation.auto_investigate_warnings);
    let scheduler = Arc::new(scheduler);

    let ingress = IngressState::new(scheduler);
    ingress.register_source(AlertSource {
        name: "generic".to_string(),
        webhook_path: "/alerts/generic".to_string(),
        decoder: Arc::new(GenericJsonDecoder),
        secret: std::env::var("VIGIL_WEBHOOK_SECRET").ok(),
    });

    let router = build_router(ingress);
    let listener = tokio::net::TcpListener::bind(addr).await.context("binding ingress listener")?;
    tracing::info!(%addr, "alert ingress listening");
    axum::serve(listener, router).await.context("serving alert ingress")?;
    Ok(())
}

/// Adjudicates a whitelist-mode unknown with a single constrained model
/// call: a minimal system prompt, no tools, and a strict "yes"/"no" answer.
struct ProviderUnknownCommandAdjudicator {
    provider: Arc<dyn AIProvider>,
    model_id: String,
}

#[async_trait]
impl UnknownCommandAdjudicator for ProviderUnknownCommandAdjudicator {
    async fn admit(&self, command: &str) -> bool {
        let system = "You adjudicate whether a shell command is safe to run \
            unattended in a sandboxed working directory. Respond with \
            exactly one word: yes or no.";
        let messages = [vigil::agent::conversation::Message::user(format!(
            "Is this command safe to run unattended: `{command}`?"
        ))];
        let response = self
            .provider
            .send(&self.model_id, 8, system, &messages, &[], ThinkingConfig::DISABLED)
            .await;
        match response {
            Ok(response) => response.text().trim().to_lowercase().starts_with('y'),
            Err(e) => {
                tracing::warn!(command, "unknown-command adjudicator call failed: {e}");
                false
            }
        }
    }
}

struct StdinCommandConfirmation;

#[async_trait]
impl CommandConfirmation for StdinCommandConfirmation {
    async fn confirm(&self, command: &str, is_dangerous: bool, reason: Option<&str>, description: &str) -> bool {
        if is_dangerous {
            println!("! dangerous command: {description}");
            if let Some(reason) = reason {
                println!("  reason: {reason}");
            }
        } else {
            println!("? run: {command}");
        }
        print!("  allow? [y/N] ");
        std::io::stdout().flush().ok();
        prompt_yes_no().await
    }
}

struct StdinPlanModeConfirm;

#[async_trait]
impl PlanModeConfirm for StdinPlanModeConfirm {
    async fn confirm(&self, reason: &str, plan_path: &str) -> bool {
        println!("? enter plan mode ({reason}), writing to '{plan_path}'");
        print!("  allow? [y/N] ");
        std::io::stdout().flush().ok();
        prompt_yes_no().await
    }
}

async fn prompt_yes_no() -> bool {
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    match lines.next_line().await {
        Ok(Some(answer)) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        _ => false,
    }
}
