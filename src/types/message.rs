//! Conversation turns and tool call payloads.

use serde::{Deserialize, Serialize};
use strum::Display;

/// A tool call requested by the model.
///
/// `arguments` is kept exactly as the model produced it: usually a JSON
/// string, sometimes an already structured object. It is parsed only when the
/// call is invoked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

impl ToolCallRequest {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Arguments rendered the way they travel on the wire.
    pub fn arguments_text(&self) -> String {
        match &self.arguments {
            serde_json::Value::Null => "{}".to_string(),
            serde_json::Value::String(raw) => raw.clone(),
            other => other.to_string(),
        }
    }
}

/// Outcome of one tool invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ToolCallResult {
    pub content: Option<String>,
    #[serde(default)]
    pub is_error: bool,
    /// Failure description when the call itself failed; never sent to the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolCallResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            is_error: false,
            error: None,
        }
    }

    /// A result produced when the call could not be completed.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            content: None,
            is_error: true,
            error: Some(error.into()),
        }
    }

    /// Content as embedded in a Tool turn. Absent content and failed calls
    /// both yield the empty string.
    pub fn text(&self) -> String {
        match (&self.content, &self.error) {
            (_, Some(_)) => String::new(),
            (Some(text), None) => text.clone(),
            (None, None) => String::new(),
        }
    }
}

/// Turn role, used for logging and wire mapping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

/// One atomic unit of the message history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ConversationTurn {
    User {
        text: String,
    },
    Assistant {
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
    },
    Tool {
        tool_call_id: String,
        tool_name: String,
        content: String,
    },
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self::User { text: text.into() }
    }

    pub fn assistant(text: Option<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self::Assistant { text, tool_calls }
    }

    pub fn tool(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::Tool {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::Tool { .. } => Role::Tool,
        }
    }

    /// Text of the turn; absent assistant text is the empty string.
    pub fn text(&self) -> &str {
        match self {
            Self::User { text } => text,
            Self::Assistant { text, .. } => text.as_deref().unwrap_or_default(),
            Self::Tool { content, .. } => content,
        }
    }

    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}
