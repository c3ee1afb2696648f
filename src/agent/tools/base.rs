//! The `Tool` trait and the execution context threaded through every call.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// Plan-mode state: a session-scoped flag with a target file path. Set by
/// the `enter_plan_mode` tool (part of the Tool Executor, not the
/// Conversation Engine) and cleared by the outer session driver; the engine
/// itself never writes it, only reads the live value through the shared
/// handle below.
#[derive(Debug, Clone)]
pub struct PlanMode {
    pub plan_path: String,
    pub reason: String,
}

/// Shared, mutable handle to the session's current plan-mode state. A
/// `Mutex` rather than a plain field so that `enter_plan_mode` mutates the
/// value other tools in the *same* turn observe immediately, without the
/// engine ever reconstructing `ExecutionContext` mid-loop.
pub type PlanModeState = Arc<Mutex<Option<PlanMode>>>;

/// Terminal or progress signal raised by one of the three investigation-only
/// tools. Shared so the scheduler can observe it the moment the tool call is
/// dispatched, without waiting for the engine loop to return.
#[derive(Debug, Clone)]
pub enum InvestigationOutcome {
    Completed { findings: String, confidence: f32 },
    Escalated { reason: String },
    Progress { findings: String },
}

impl InvestigationOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, InvestigationOutcome::Progress { .. })
    }
}

/// Shared sink the investigation tools publish into and the engine loop polls
/// after each tool-dispatch round to decide whether to end the turn early.
#[derive(Default)]
pub struct InvestigationSignal {
    pub terminal: Mutex<Option<InvestigationOutcome>>,
    pub progress: Mutex<Vec<String>>,
}

/// Threaded through every tool invocation and every engine turn. Carries no
/// process-global state — everything the executor or engine needs to make a
/// decision lives here.
#[derive(Clone)]
pub struct ExecutionContext {
    pub working_dir: std::path::PathBuf,
    pub session_id: String,
    pub plan_mode: PlanModeState,
    /// True for headless paths (investigation sessions, subagents) where no
    /// human is available to answer a confirmation prompt.
    pub headless: bool,
    pub metadata: HashMap<String, Value>,
    /// Present only for investigation sessions; `None` for ordinary
    /// interactive turns, where `complete_investigation` et al. are simply
    /// not in the allowed-tools set.
    pub investigation: Option<Arc<InvestigationSignal>>,
}

impl ExecutionContext {
    pub fn new(working_dir: impl Into<std::path::PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            working_dir: working_dir.into(),
            session_id: session_id.into(),
            plan_mode: Arc::new(Mutex::new(None)),
            headless: false,
            metadata: HashMap::new(),
            investigation: None,
        }
    }

    pub fn with_investigation_signal(mut self, signal: Arc<InvestigationSignal>) -> Self {
        self.investigation = Some(signal);
        self
    }
}

/// A tool: name, description, input schema, and an executor function.
/// Registered at startup; immutable thereafter.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    /// JSON-Schema-shaped: `type=object`, `properties` map, `required`
    /// list. Property types are restricted to `string`, `integer`,
    /// `boolean`, `array`, `object`.
    fn parameters(&self) -> Value;

    async fn execute(
        &self,
        input: Value,
        ctx: &ExecutionContext,
    ) -> anyhow::Result<ToolResult>;

    /// True for `edit_file`, `bash`, and `task`. Drives the planning gate:
    /// mutating tools other than `edit_file` against the plan path are
    /// refused while plan mode is active.
    fn is_mutating(&self) -> bool {
        false
    }

    fn execution_timeout(&self) -> Duration {
        Duration::from_secs(120)
    }

    fn to_tool_definition(&self) -> crate::providers::base::ToolDefinition {
        crate::providers::base::ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Validates `input` against a tool's JSON-Schema-subset `parameters`:
/// required keys present, types match the restricted type vocabulary
/// (`string`, `integer`, `number`, `boolean`, `array`, `object`).
pub fn validate_schema(schema: &Value, input: &Value) -> Result<(), String> {
    let Some(input_obj) = input.as_object() else {
        return Err("input must be a JSON object".to_string());
    };

    let required = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|a| a.iter().filter_map(|v| v.as_str()).collect::<Vec<_>>())
        .unwrap_or_default();
    for key in &required {
        if !input_obj.contains_key(*key) {
            return Err(format!("missing required field '{key}'"));
        }
    }

    let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) else {
        return Ok(());
    };
    for (key, value) in input_obj {
        let Some(prop_schema) = properties.get(key) else {
            continue;
        };
        let Some(expected_type) = prop_schema.get("type").and_then(|t| t.as_str()) else {
            continue;
        };
        if !type_matches(expected_type, value) {
            return Err(format!(
                "field '{key}' must be of type '{expected_type}', got {value}"
            ));
        }
    }
    Ok(())
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        // Any JSON number, integer or decimal: there is no separate
        // bounded-decimal JSON type, so a tool that needs e.g. a [0, 1]
        // confidence score declares "number" rather than "integer".
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}
