//! Alert Event and Investigation data model.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    pub id: String,
    pub severity: Severity,
    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
    pub received_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestigationStatus {
    Pending,
    Running,
    Completed,
    Escalated,
    TimedOut,
    Failed,
}

impl InvestigationStatus {
    /// Any status other than `Pending`/`Running` is terminal.
    pub fn is_terminal(self) -> bool {
        !matches!(self, InvestigationStatus::Pending | InvestigationStatus::Running)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Investigation {
    pub id: String,
    pub alert_id: String,
    pub session_id: String,
    pub status: InvestigationStatus,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub findings: String,
    pub actions_taken: u32,
    pub duration_seconds: i64,
    pub confidence: f32,
    pub escalated: bool,
    pub escalate_reason: Option<String>,
}

impl Investigation {
    pub fn new(id: impl Into<String>, alert_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            alert_id: alert_id.into(),
            session_id: session_id.into(),
            status: InvestigationStatus::Pending,
            started_at: chrono::Utc::now(),
            completed_at: None,
            findings: String::new(),
            actions_taken: 0,
            duration_seconds: 0,
            confidence: 0.0,
            escalated: false,
            escalate_reason: None,
        }
    }

    /// Terminal investigations satisfy `completed_at >= started_at` and
    /// `duration_seconds = completed_at - started_at`.
    pub fn finish(&mut self, status: InvestigationStatus, completed_at: chrono::DateTime<chrono::Utc>) {
        self.status = status;
        self.completed_at = Some(completed_at);
        self.duration_seconds = (completed_at - self.started_at).num_seconds().max(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_computes_duration_from_started_at() {
        let mut inv = Investigation::new("i1", "a1", "s1");
        let completed = inv.started_at + chrono::Duration::seconds(42);
        inv.finish(InvestigationStatus::Completed, completed);
        assert_eq!(inv.duration_seconds, 42);
        assert!(inv.status.is_terminal());
        assert_eq!(inv.completed_at, Some(completed));
    }

    #[test]
    fn pending_and_running_are_not_terminal() {
        assert!(!InvestigationStatus::Pending.is_terminal());
        assert!(!InvestigationStatus::Running.is_terminal());
    }
}
