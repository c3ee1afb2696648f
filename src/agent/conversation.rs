//! Conversation data model: messages, tool calls/results, and the opaque
//! reasoning blocks a provider returns alongside them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// An opaque `(text, signature)` pair returned by the provider. Neither
/// field is ever inspected or transformed by this crate — they are sealed
/// envelopes that must be echoed back byte-identical on the next request
/// that includes the message carrying them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReasoningBlock {
    pub text: String,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolResultBlock {
    pub tool_call_id: String,
    pub text: String,
    pub is_error: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A single turn. `reasoning` always precedes `text`/`tool_calls` when the
/// message is serialized back to the provider; this struct's field order
/// matches that requirement but the wire encoder is responsible for
/// enforcing it, since struct field order isn't load-bearing in Rust.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub reasoning: Vec<ReasoningBlock>,
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub tool_results: Vec<ToolResultBlock>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            reasoning: Vec::new(),
            text: text.into(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            reasoning: Vec::new(),
            text: text.into(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
        }
    }

    pub fn assistant(
        text: impl Into<String>,
        tool_calls: Vec<ToolCall>,
        reasoning: Vec<ReasoningBlock>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            reasoning,
            text: text.into(),
            tool_calls,
            tool_results: Vec::new(),
        }
    }

    pub fn tool_results(results: Vec<ToolResultBlock>) -> Self {
        Self {
            role: Role::User,
            reasoning: Vec::new(),
            text: String::new(),
            tool_calls: Vec::new(),
            tool_results: results,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// An ordered sequence of messages plus immutable session identity.
///
/// Invariants (checked by `validate`, not enforced structurally, since a
/// mid-loop conversation is transiently invalid between appending the
/// assistant's tool calls and appending their results):
/// - the first user message is non-empty
/// - every `tool_use` block in an assistant message has exactly one
///   matching `tool_result` block in the next user message
/// - role alternates strictly after the first message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub session_id: String,
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            messages: Vec::new(),
        }
    }

    pub fn with_session_id(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            messages: Vec::new(),
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Validates the invariants above. Returns the first violation found, if
    /// any. A conversation mid-loop (assistant message appended, tool
    /// results not yet appended) is not validated against the "every
    /// tool_use has a matching tool_result" rule for its last message.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(first) = self.messages.first() {
            if first.role != Role::User {
                return Err("first message must have role=user".into());
            }
            if first.text.is_empty() && first.tool_calls.is_empty() {
                return Err("first user message must be non-empty".into());
            }
        }

        for pair in self.messages.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if prev.role == next.role {
                return Err(format!(
                    "role must alternate: two consecutive {:?} messages",
                    prev.role
                ));
            }
            if prev.role == Role::Assistant && prev.has_tool_calls() {
                let expected: Vec<&str> =
                    prev.tool_calls.iter().map(|c| c.id.as_str()).collect();
                let actual: Vec<&str> = next
                    .tool_results
                    .iter()
                    .map(|r| r.tool_call_id.as_str())
                    .collect();
                if expected != actual {
                    return Err(format!(
                        "tool_use/tool_result mismatch: expected {:?}, got {:?}",
                        expected, actual
                    ));
                }
            }
        }
        Ok(())
    }

    /// Total count of `tool_use` blocks across all assistant messages.
    pub fn tool_call_count(&self) -> usize {
        self.messages.iter().map(|m| m.tool_calls.len()).sum()
    }

    /// Total count of `tool_result` blocks across all messages.
    pub fn tool_result_count(&self) -> usize {
        self.messages.iter().map(|m| m.tool_results.len()).sum()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_conversation_validates() {
        assert!(Conversation::new().validate().is_ok());
    }

    #[test]
    fn first_message_must_be_nonempty_user() {
        let mut c = Conversation::new();
        c.push(Message::user(""));
        assert!(c.validate().is_err());
    }

    #[test]
    fn role_must_alternate() {
        let mut c = Conversation::new();
        c.push(Message::user("hi"));
        c.push(Message::user("again"));
        assert!(c.validate().is_err());
    }

    #[test]
    fn tool_call_and_result_counts_match_when_well_formed() {
        let mut c = Conversation::new();
        c.push(Message::user("do it"));
        c.push(Message::assistant(
            "",
            vec![ToolCall {
                id: "t1".into(),
                name: "read_file".into(),
                input: serde_json::json!({"path": "x"}),
            }],
            vec![],
        ));
        c.push(Message::tool_results(vec![ToolResultBlock {
            tool_call_id: "t1".into(),
            text: "ok".into(),
            is_error: false,
        }]));
        assert!(c.validate().is_ok());
        assert_eq!(c.tool_call_count(), c.tool_result_count());
    }

    #[test]
    fn mismatched_tool_result_id_fails_validation() {
        let mut c = Conversation::new();
        c.push(Message::user("do it"));
        c.push(Message::assistant(
            "",
            vec![ToolCall {
                id: "t1".into(),
                name: "read_file".into(),
                input: serde_json::json!({}),
            }],
            vec![],
        ));
        c.push(Message::tool_results(vec![ToolResultBlock {
            tool_call_id: "wrong-id".into(),
            text: "ok".into(),
            is_error: false,
        }]));
        assert!(c.validate().is_err());
    }
}
