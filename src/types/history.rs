//! Ordered, append-only conversation history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};

use super::message::{ConversationTurn, ToolCallRequest};

/// A turn plus the moment it was appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub turn: ConversationTurn,
    pub timestamp: DateTime<Utc>,
}

/// Message history threaded through one query.
///
/// Insertion order is the wire order. Every assistant tool call must be
/// answered by exactly one Tool turn before another Assistant turn (or a new
/// User turn) is appended.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MessageHistory {
    entries: Vec<HistoryEntry>,
}

impl MessageHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.entries.iter().map(|entry| &entry.turn)
    }

    /// Snapshot of the turns in wire order.
    pub fn to_turns(&self) -> Vec<ConversationTurn> {
        self.turns().cloned().collect()
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.entries.last().map(|entry| &entry.turn)
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> Result<()> {
        self.ensure_no_pending("user")?;
        self.append(ConversationTurn::user(text));
        Ok(())
    }

    pub fn push_assistant(
        &mut self,
        text: Option<String>,
        tool_calls: Vec<ToolCallRequest>,
    ) -> Result<()> {
        self.ensure_no_pending("assistant")?;
        self.append(ConversationTurn::assistant(text, tool_calls));
        Ok(())
    }

    /// Append the result for a pending tool call.
    pub fn push_tool(
        &mut self,
        tool_call_id: &str,
        tool_name: &str,
        content: impl Into<String>,
    ) -> Result<()> {
        let pending = self.pending_tool_calls();
        if !pending.iter().any(|call| call.id == tool_call_id) {
            return Err(ChatError::InvalidState(format!(
                "tool result for '{tool_name}' ({tool_call_id}) has no pending tool call"
            )));
        }
        self.append(ConversationTurn::tool(tool_call_id, tool_name, content));
        Ok(())
    }

    /// Tool calls of the most recent Assistant turn that have no Tool turn yet.
    pub fn pending_tool_calls(&self) -> Vec<&ToolCallRequest> {
        let Some(assistant_idx) = self
            .entries
            .iter()
            .rposition(|entry| matches!(entry.turn, ConversationTurn::Assistant { .. }))
        else {
            return Vec::new();
        };

        let answered: Vec<&str> = self.entries[assistant_idx + 1..]
            .iter()
            .filter_map(|entry| match &entry.turn {
                ConversationTurn::Tool { tool_call_id, .. } => Some(tool_call_id.as_str()),
                _ => None,
            })
            .collect();

        self.entries[assistant_idx]
            .turn
            .tool_calls()
            .iter()
            .filter(|call| !answered.contains(&call.id.as_str()))
            .collect()
    }

    fn ensure_no_pending(&self, appending: &str) -> Result<()> {
        let pending = self.pending_tool_calls();
        if pending.is_empty() {
            return Ok(());
        }
        let names = pending
            .iter()
            .map(|call| call.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Err(ChatError::InvalidState(format!(
            "cannot append {appending} turn while tool calls are unresolved: {names}"
        )))
    }

    fn append(&mut self, turn: ConversationTurn) {
        self.entries.push(HistoryEntry {
            turn,
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use serde_json::json;

    fn call(id: &str, name: &str) -> ToolCallRequest {
        ToolCallRequest::new(id, name, json!({}))
    }

    #[test]
    fn preserves_insertion_order() {
        let mut history = MessageHistory::new();
        history.push_user("What is the weather in CA?").unwrap();
        history
            .push_assistant(None, vec![call("c1", "get_alerts")])
            .unwrap();
        history.push_tool("c1", "get_alerts", "alert text").unwrap();

        let roles: Vec<Role> = history.turns().map(ConversationTurn::role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool]);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn rejects_assistant_turn_before_tool_results() {
        let mut history = MessageHistory::new();
        history.push_user("hi").unwrap();
        history
            .push_assistant(None, vec![call("c1", "get_alerts"), call("c2", "get_forecast")])
            .unwrap();
        history.push_tool("c1", "get_alerts", "ok").unwrap();

        let err = history
            .push_assistant(Some("done".into()), Vec::new())
            .expect_err("unresolved call should block assistant turn");
        assert!(matches!(err, ChatError::InvalidState(message) if message.contains("get_forecast")));

        history.push_tool("c2", "get_forecast", "sunny").unwrap();
        assert!(history.pending_tool_calls().is_empty());
        history.push_assistant(Some("done".into()), Vec::new()).unwrap();
    }

    #[test]
    fn rejects_unmatched_and_duplicate_tool_results() {
        let mut history = MessageHistory::new();
        history.push_user("hi").unwrap();
        assert!(history.push_tool("c1", "get_alerts", "x").is_err());

        history
            .push_assistant(None, vec![call("c1", "get_alerts")])
            .unwrap();
        history.push_tool("c1", "get_alerts", "x").unwrap();
        assert!(history.push_tool("c1", "get_alerts", "x").is_err());
    }

    #[test]
    fn user_turn_blocked_while_calls_pending() {
        let mut history = MessageHistory::new();
        history
            .push_assistant(None, vec![call("c1", "get_alerts")])
            .unwrap();
        assert!(history.push_user("next question").is_err());
    }
}
