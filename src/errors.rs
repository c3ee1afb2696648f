//! Crate-wide error taxonomy.
//!
//! Tool-local variants are converted to `is_error=true` tool results and fed
//! back to the model; engine- and scheduler-level variants abort the current
//! turn or investigation. See `AgentError::is_tool_local`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("schema violation: {0}")]
    SchemaViolation(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("refused: {0}")]
    Refused(String),

    #[error("provider failure: {0}")]
    ProviderFailure(String),

    #[error("tool failure: {0}")]
    ToolFailure(String),

    #[error("budget exhausted: {0}")]
    BudgetExhausted(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("canceled: {0}")]
    Canceled(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AgentError {
    /// Tool-local errors convert to an `is_error=true` tool result and are
    /// fed back to the model. Everything else aborts the current turn.
    pub fn is_tool_local(&self) -> bool {
        matches!(
            self,
            AgentError::InvalidInput(_)
                | AgentError::SchemaViolation(_)
                | AgentError::ToolFailure(_)
                | AgentError::Unauthorized(_)
                | AgentError::Refused(_)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::InvalidInput(_) => "invalid_input",
            AgentError::SchemaViolation(_) => "schema_violation",
            AgentError::Unauthorized(_) => "unauthorized",
            AgentError::Refused(_) => "refused",
            AgentError::ProviderFailure(_) => "provider_failure",
            AgentError::ToolFailure(_) => "tool_failure",
            AgentError::BudgetExhausted(_) => "budget_exhausted",
            AgentError::Timeout(_) => "timeout",
            AgentError::Canceled(_) => "canceled",
            AgentError::Internal(_) => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
