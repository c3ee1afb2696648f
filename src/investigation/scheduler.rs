//! `InvestigationScheduler`: bounded-concurrency admission, prompt
//! construction, and outcome handling for autonomous alert investigations.
//! Bounded concurrency follows an `Arc<Semaphore>` + tracked `JoinHandle`s
//! idiom, with a spawn-track-cleanup-on-completion style for re-admitting
//! queued alerts.

use crate::agent::conversation::Conversation;
use crate::agent::engine::{ConversationEngine, EngineContext};
use crate::agent::tools::base::{ExecutionContext, InvestigationOutcome, InvestigationSignal};
use crate::investigation::store::InvestigationStore;
use crate::investigation::types::{AlertEvent, Investigation, InvestigationStatus, Severity};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct SchedulerBudgets {
    pub max_concurrent: usize,
    pub queue_cap: usize,
    pub max_actions: u32,
    pub max_duration: Duration,
}

impl Default for SchedulerBudgets {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            queue_cap: 50,
            max_actions: 20,
            max_duration: Duration::from_secs(900),
        }
    }
}

/// A named prompt builder keyed by alert kind; `None` falls back to the
/// generic builder.
pub trait PromptBuilder: Send + Sync {
    fn alert_kind(&self) -> &str;
    fn build(&self, alert: &AlertEvent) -> String;
}

pub struct GenericPromptBuilder;

impl PromptBuilder for GenericPromptBuilder {
    fn alert_kind(&self) -> &str {
        "generic"
    }

    fn build(&self, alert: &AlertEvent) -> String {
        let mut labels: Vec<String> = alert
            .labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        labels.sort();
        let mut annotations: Vec<String> = alert
            .annotations
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect();
        annotations.sort();
        format!(
            "An alert fired with severity {:?}.\nLabels: {}\nAnnotations:\n{}\n\nInvestigate the root cause and call complete_investigation, escalate_investigation, or report_investigation.",
            alert.severity,
            labels.join(", "),
            annotations.join("\n"),
        )
    }
}

#[async_trait]
pub trait EscalationHandler: Send + Sync {
    async fn escalate(&self, investigation: &Investigation);
}

/// Minimal default: logs at error level. Paging/ticketing integration is
/// outside THE CORE.
pub struct LoggingEscalationHandler;

#[async_trait]
impl EscalationHandler for LoggingEscalationHandler {
    async fn escalate(&self, investigation: &Investigation) {
        error!(
            investigation_id = %investigation.id,
            alert_id = %investigation.alert_id,
            reason = investigation.escalate_reason.as_deref().unwrap_or(""),
            "investigation escalated"
        );
    }
}

/// Pure policy: critical auto-investigates, warning is configurable, info is
/// record-only. Replaceable since it is a free function, not baked into the
/// scheduler.
pub fn route_severity(severity: Severity, auto_investigate_warnings: bool) -> bool {
    match severity {
        Severity::Critical => true,
        Severity::Warning => auto_investigate_warnings,
        Severity::Info => false,
    }
}

/// `active` and `pending` live behind one lock so the admission
/// check-then-act in `submit` (and the cleanup-then-dequeue in the
/// completion handler) happens atomically; two separate locks let a
/// later-submitted alert jump ahead of an earlier one queued just before it.
struct SchedulerState {
    active: HashMap<String, JoinHandle<()>>,
    pending: VecDeque<AlertEvent>,
}

struct Inner {
    state: Mutex<SchedulerState>,
    semaphore: Arc<Semaphore>,
}

/// Cheaply `Clone`: every field is either `Copy` or already `Arc`-backed, so
/// the completion handler spawned per investigation can hold its own handle
/// back to the scheduler to re-admit the next queued alert.
#[derive(Clone)]
pub struct InvestigationScheduler {
    inner: Arc<Inner>,
    budgets: SchedulerBudgets,
    store: Arc<InvestigationStore>,
    engine: Arc<ConversationEngine>,
    working_dir: Arc<PathBuf>,
    model_id: Arc<str>,
    prompt_builders: Arc<HashMap<String, Arc<dyn PromptBuilder>>>,
    generic_builder: Arc<dyn PromptBuilder>,
    escalation_handler: Arc<dyn EscalationHandler>,
    auto_investigate_warnings: bool,
}

impl InvestigationScheduler {
    pub fn new(
        budgets: SchedulerBudgets,
        store: Arc<InvestigationStore>,
        engine: Arc<ConversationEngine>,
        working_dir: impl Into<PathBuf>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SchedulerState {
                    active: HashMap::new(),
                    pending: VecDeque::new(),
                }),
                semaphore: Arc::new(Semaphore::new(budgets.max_concurrent)),
            }),
            budgets,
            store,
            engine,
            working_dir: Arc::new(working_dir.into()),
            model_id: Arc::from(model_id.into()),
            prompt_builders: Arc::new(HashMap::new()),
            generic_builder: Arc::new(GenericPromptBuilder),
            escalation_handler: Arc::new(LoggingEscalationHandler),
            auto_investigate_warnings: false,
        }
    }

    /// Only meaningful before the scheduler is cloned into any spawned task
    /// (typically right after `new`); panics otherwise, since a registered
    /// prompt builder must be visible to every clone.
    pub fn register_prompt_builder(&mut self, kind: impl Into<String>, builder: Arc<dyn PromptBuilder>) {
        Arc::get_mut(&mut self.prompt_builders)
            .expect("register_prompt_builder called after the scheduler was shared")
            .insert(kind.into(), builder);
    }

    pub fn set_escalation_handler(&mut self, handler: Arc<dyn EscalationHandler>) {
        self.escalation_handler = handler;
    }

    /// Governs whether `warning` alerts auto-investigate; `critical` always
    /// does and `info` never does, regardless of this setting.
    pub fn set_auto_investigate_warnings(&mut self, enabled: bool) {
        self.auto_investigate_warnings = enabled;
    }

    pub async fn active_count(&self) -> usize {
        self.inner.state.lock().await.active.len()
    }

    pub async fn pending_count(&self) -> usize {
        self.inner.state.lock().await.pending.len()
    }

    /// Returns `Err` (HTTP 429 at the ingress layer) when the queue is full;
    /// otherwise admits immediately if under `max_concurrent`, or enqueues.
    /// Alerts that `route_severity` rejects (`info`, or `warning` when not
    /// configured to auto-investigate) never enter admission bookkeeping at
    /// all: they are persisted directly as a record-only, already-completed
    /// investigation.
    pub async fn submit(&self, alert: AlertEvent) -> Result<String, String> {
        let investigation_id = Uuid::new_v4().to_string();

        if !route_severity(alert.severity, self.auto_investigate_warnings) {
            self.record_only(investigation_id.clone(), alert).await;
            return Ok(investigation_id);
        }

        let mut state = self.inner.state.lock().await;
        if state.active.len() >= self.budgets.max_concurrent && state.pending.len() >= self.budgets.queue_cap {
            return Err("investigation queue saturated".to_string());
        }

        if state.active.len() < self.budgets.max_concurrent {
            let handle = self.spawn_investigation(investigation_id.clone(), alert);
            state.active.insert(investigation_id.clone(), handle);
        } else {
            state.pending.push_back(alert);
        }
        Ok(investigation_id)
    }

    /// Persists a terminal, already-`Completed` investigation for an alert
    /// that severity policy excludes from auto-investigation, without ever
    /// touching `active`/`pending`.
    async fn record_only(&self, investigation_id: String, alert: AlertEvent) {
        let severity = alert.severity;
        let mut investigation = Investigation::new(investigation_id.clone(), alert.id.clone(), investigation_id.clone());
        investigation.findings = format!(
            "not auto-investigated: severity {severity:?} is excluded by the auto-investigate policy"
        );
        investigation.finish(InvestigationStatus::Completed, chrono::Utc::now());
        if let Err(e) = self.store.store(&investigation).await {
            error!("failed to persist record-only investigation {investigation_id}: {e}");
        }
    }

    /// Builds the prompt and spawns the investigation task synchronously (no
    /// `.await` before `tokio::spawn`), so callers can insert the returned
    /// handle into `SchedulerState.active` under the same lock guard that
    /// made the admission decision. The semaphore permit is acquired inside
    /// the task itself, not here, so this never blocks the caller.
    fn spawn_investigation(&self, investigation_id: String, alert: AlertEvent) -> JoinHandle<()> {
        let prompt = self
            .prompt_builders
            .get("generic")
            .unwrap_or(&self.generic_builder)
            .build(&alert);

        let session_id = investigation_id.clone();
        let mut investigation = Investigation::new(investigation_id.clone(), alert.id.clone(), session_id.clone());
        investigation.status = InvestigationStatus::Running;

        let engine = self.engine.clone();
        let store = self.store.clone();
        let working_dir = (*self.working_dir).clone();
        let model_id = self.model_id.to_string();
        let max_actions = self.budgets.max_actions;
        let max_duration = self.budgets.max_duration;
        let escalation_handler = self.escalation_handler.clone();
        let id_for_cleanup = investigation_id.clone();
        let semaphore = self.inner.semaphore.clone();
        // Cloned into the task so that, on completion, it can re-admit the
        // oldest pending alert without relying on an external poll.
        let scheduler = self.clone();

        tokio::spawn(async move {
            let permit = semaphore.acquire_owned().await;
            let Ok(permit) = permit else {
                warn!("semaphore closed; dropping investigation {id_for_cleanup}");
                return;
            };
            let _permit = permit;
            let signal = Arc::new(InvestigationSignal::default());
            let exec_ctx = ExecutionContext::new(working_dir, session_id.clone())
                .with_investigation_signal(signal.clone());
            let engine_ctx = EngineContext {
                model_id,
                max_actions,
                max_tokens: 4096,
                custom_prompt: None,
                base_prompt: "You are an on-call engineer investigating a production alert.".into(),
                skills_summary: String::new(),
                thinking: crate::providers::base::ThinkingConfig::DISABLED,
                cancel: tokio_util::sync::CancellationToken::new(),
            };

            let mut conversation = Conversation::with_session_id(session_id);
            let run_result = tokio::time::timeout(
                max_duration,
                engine.send_user_turn(&mut conversation, &prompt, &exec_ctx, &engine_ctx),
            )
            .await;

            investigation.actions_taken = conversation.tool_call_count() as u32;
            let now = chrono::Utc::now();

            match run_result {
                Ok(Ok(_)) => {
                    let terminal = signal.terminal.lock().await;
                    match terminal.as_ref() {
                        Some(InvestigationOutcome::Completed { findings, confidence }) => {
                            investigation.findings = findings.clone();
                            investigation.confidence = *confidence;
                            investigation.finish(InvestigationStatus::Completed, now);
                        }
                        Some(InvestigationOutcome::Escalated { reason }) => {
                            investigation.escalated = true;
                            investigation.escalate_reason = Some(reason.clone());
                            investigation.finish(InvestigationStatus::Escalated, now);
                        }
                        _ => {
                            investigation.finish(InvestigationStatus::Completed, now);
                        }
                    }
                }
                Ok(Err(crate::errors::AgentError::BudgetExhausted(msg))) => {
                    investigation.findings = signal.progress.lock().await.join("\n");
                    investigation.escalate_reason = Some(msg);
                    investigation.finish(InvestigationStatus::TimedOut, now);
                }
                Ok(Err(e)) => {
                    investigation.escalate_reason = Some(e.to_string());
                    investigation.finish(InvestigationStatus::Failed, now);
                }
                Err(_) => {
                    investigation.finish(InvestigationStatus::TimedOut, now);
                }
            }

            if matches!(
                investigation.status,
                InvestigationStatus::Escalated | InvestigationStatus::TimedOut | InvestigationStatus::Failed
            ) {
                escalation_handler.escalate(&investigation).await;
            }

            if let Err(e) = store.store(&investigation).await {
                error!("failed to persist investigation {}: {e}", investigation.id);
            }

            let mut state = scheduler.inner.state.lock().await;
            state.active.remove(&id_for_cleanup);
            if let Some(next_alert) = state.pending.pop_front() {
                info!("dequeuing next pending investigation after {id_for_cleanup} completed");
                let next_id = Uuid::new_v4().to_string();
                let next_handle = scheduler.spawn_investigation(next_id.clone(), next_alert);
                state.active.insert(next_id, next_handle);
            }
        })
    }
}
