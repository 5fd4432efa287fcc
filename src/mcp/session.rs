//! The session boundary the conversation engine talks to.

use async_trait::async_trait;
use rmcp::model::JsonObject;

use crate::error::ChatError;
use crate::types::ToolCallResult;

use super::schema::ToolDescriptor;

/// Operations on a connected tool host.
///
/// The engine and the tool invoker borrow an implementor for the duration of
/// one query; ownership and disposal stay with whoever connected it.
#[async_trait]
pub trait ToolSession: Send {
    /// Tools currently exposed by the host, in host order.
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, ChatError>;

    /// Invoke a tool. Unknown tools and failed calls are
    /// `ChatError::ToolInvocation`; a host error result that carries a
    /// message is returned with `is_error` set.
    async fn call_tool(
        &mut self,
        name: &str,
        arguments: JsonObject,
    ) -> Result<ToolCallResult, ChatError>;
}
