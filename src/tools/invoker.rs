//! Executes one tool call against the connected session.

use std::time::Duration;

use serde_json::Value;
use tracing::info;

use crate::error::ChatError;
use crate::mcp::ToolSession;
use crate::types::{ToolCallRequest, ToolCallResult};

use super::arguments::parse_tool_arguments;

/// Runs tool calls and folds every failure into the returned result.
#[derive(Debug, Clone, Default)]
pub struct ToolInvoker {
    timeout: Option<Duration>,
}

impl ToolInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound each call; `None` waits for the host indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Invoke `request` on `session`.
    ///
    /// Never fails: unparseable arguments degrade to an empty map, and
    /// unknown tools, transport errors and timeouts become
    /// [`ToolCallResult::failure`], whose text is empty. Host error results
    /// that carry a message pass through with that message.
    pub async fn invoke(
        &self,
        session: &mut dyn ToolSession,
        request: &ToolCallRequest,
    ) -> ToolCallResult {
        let arguments = parse_tool_arguments(request);
        let arguments_json = Value::Object(arguments.clone()).to_string();

        let call = session.call_tool(&request.name, arguments);
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ChatError::Timeout(
                    u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                )),
            },
            None => call.await,
        };

        let result = match outcome {
            Ok(result) => result,
            Err(error) => ToolCallResult::failure(error.to_string()),
        };

        let outcome = if result.is_error { "error" } else { "ok" };
        info!(
            tool = %request.name,
            arguments = %arguments_json,
            outcome,
            error = result.error.as_deref().unwrap_or(""),
            "tool call"
        );
        result
    }
}
