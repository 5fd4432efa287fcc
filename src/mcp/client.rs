//! MCP client: owns the tool host connection for one connect/dispose cycle.

use async_trait::async_trait;
use rmcp::{
    model::{
        CallToolRequestParams, CallToolResult, Content, JsonObject, ProtocolVersion,
        ResourceContents,
    },
    service::{ClientInitializeError, ServiceError},
};
use tracing::{debug, info, warn};

use crate::error::ChatError;
use crate::types::ToolCallResult;

use super::endpoint::ServerEndpoint;
use super::schema::ToolDescriptor;
use super::session::ToolSession;
use super::transport::{MCPRunningService, MCPTransport, StdioTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MCPConnectionState {
    Disconnected,
    Initialized,
    Closed,
}

/// Client for a Model Context Protocol server.
pub struct MCPClient {
    transport: Box<dyn MCPTransport>,
    session: Option<MCPRunningService>,
    state: MCPConnectionState,
}

impl MCPClient {
    /// Create a new MCP client with the given transport.
    pub fn new(transport: Box<dyn MCPTransport>) -> Self {
        Self {
            transport,
            session: None,
            state: MCPConnectionState::Disconnected,
        }
    }

    /// Spawn the tool host, run the handshake, and discover its tools.
    ///
    /// On any failure after the process was started, the client is disposed
    /// before the error is returned.
    pub async fn connect(
        endpoint: &ServerEndpoint,
    ) -> Result<(Self, Vec<ToolDescriptor>), ChatError> {
        let mut client = Self::new(Box::new(StdioTransport::from_endpoint(endpoint.clone())));
        match client.initialize_and_list().await {
            Ok(tools) => {
                info!(
                    endpoint = %endpoint.describe(),
                    tools = ?tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
                    "connected to tool host"
                );
                Ok((client, tools))
            }
            Err(err) => {
                if let Err(dispose_err) = client.dispose().await {
                    warn!(error = %dispose_err, "dispose after failed connect");
                }
                Err(err)
            }
        }
    }

    async fn initialize_and_list(&mut self) -> Result<Vec<ToolDescriptor>, ChatError> {
        self.initialize().await?;
        self.list_tools()
            .await
            .map_err(|err| ChatError::Connection(format!("initial tool discovery failed: {err}")))
    }

    pub fn connection_state(&self) -> MCPConnectionState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state == MCPConnectionState::Initialized
    }

    pub fn is_closed(&self) -> bool {
        self.state == MCPConnectionState::Closed
    }

    /// Server-provided instructions, when the host sent any.
    pub fn instructions(&self) -> Option<String> {
        self.session
            .as_ref()
            .and_then(|session| session.peer_info())
            .and_then(|info| info.instructions.clone())
    }

    /// Run the protocol handshake. A no-op once initialized.
    pub async fn initialize(&mut self) -> Result<(), ChatError> {
        match self.state {
            MCPConnectionState::Initialized => return Ok(()),
            MCPConnectionState::Closed => {
                return Err(ChatError::Connection("MCP session is closed".into()))
            }
            MCPConnectionState::Disconnected => {}
        }

        let session = self.connect_with_protocol_fallback().await?;
        self.session = Some(session);
        self.state = MCPConnectionState::Initialized;
        Ok(())
    }

    /// List every tool the host exposes, following pagination.
    pub async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, ChatError> {
        let session = self.active_session()?;

        let tools = match session.list_all_tools().await {
            Ok(tools) => tools,
            Err(ServiceError::UnexpectedResponse) => session
                .list_tools(None)
                .await
                .map(|page| page.tools)
                .map_err(|e| map_service_error("list_tools", e))?,
            Err(e) => return Err(map_service_error("list_tools", e)),
        };

        Ok(tools.into_iter().map(map_mcp_tool).collect())
    }

    /// Execute a tool on the host.
    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: JsonObject,
    ) -> Result<ToolCallResult, ChatError> {
        let session = self.active_session()?;

        let result = session
            .call_tool(CallToolRequestParams {
                meta: None,
                name: name.to_owned().into(),
                arguments: Some(arguments),
                task: None,
            })
            .await
            .map_err(|e| ChatError::tool(name, map_service_error("call_tool", e).to_string()))?;

        map_call_result(name, result)
    }

    /// Release the session and transport. Safe to call repeatedly and after
    /// a failed or partial connect; only the first call releases anything.
    pub async fn dispose(&mut self) -> Result<(), ChatError> {
        if self.state == MCPConnectionState::Closed {
            return Ok(());
        }
        self.state = MCPConnectionState::Closed;

        let mut outcome = Ok(());
        if let Some(session) = self.session.take() {
            match session.cancel().await {
                Ok(reason) => debug!(?reason, "MCP session cancelled"),
                Err(err) => {
                    outcome = Err(ChatError::Transport(format!(
                        "MCP session shutdown failed: {err}"
                    )))
                }
            }
        }
        let closed = self.transport.close().await;
        info!(endpoint = %self.transport.describe(), "tool host disposed");
        outcome.and(closed)
    }

    async fn connect_with_protocol_fallback(&mut self) -> Result<MCPRunningService, ChatError> {
        let latest_client_info = rmcp::model::ClientInfo {
            protocol_version: ProtocolVersion::LATEST,
            ..Default::default()
        };

        match self.transport.connect(latest_client_info).await {
            Ok(session) => return Ok(session),
            Err(error) if should_retry_protocol_fallback(&error) => {
                debug!("tool host rejected latest protocol version, retrying with 2024-11-05");
            }
            Err(error) => return Err(map_client_initialize_error(error)),
        }

        let fallback_client_info = rmcp::model::ClientInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            ..Default::default()
        };
        self.transport
            .connect(fallback_client_info)
            .await
            .map_err(map_client_initialize_error)
    }

    fn active_session(&mut self) -> Result<&mut MCPRunningService, ChatError> {
        match self.state {
            MCPConnectionState::Initialized => {}
            MCPConnectionState::Closed => {
                return Err(ChatError::InvalidState("MCP session is closed".into()))
            }
            MCPConnectionState::Disconnected => {
                return Err(ChatError::InvalidState(
                    "MCP client must be initialized first".into(),
                ))
            }
        }
        self.session
            .as_mut()
            .ok_or_else(|| ChatError::InvalidState("Missing MCP session".into()))
    }
}

#[async_trait]
impl ToolSession for MCPClient {
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, ChatError> {
        MCPClient::list_tools(self).await
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: JsonObject,
    ) -> Result<ToolCallResult, ChatError> {
        MCPClient::call_tool(self, name, arguments).await
    }
}

fn should_retry_protocol_fallback(error: &ClientInitializeError) -> bool {
    match error {
        ClientInitializeError::JsonRpcError(error) => {
            let message = error.message.to_ascii_lowercase();
            message.contains("protocol") && message.contains("version")
        }
        _ => false,
    }
}

fn map_mcp_tool(tool: rmcp::model::Tool) -> ToolDescriptor {
    let schema = (*tool.input_schema).clone();
    ToolDescriptor {
        name: tool.name.to_string(),
        description: tool.description.map(|d| d.to_string()),
        input_schema: (!schema.is_empty()).then_some(serde_json::Value::Object(schema)),
    }
}

fn extract_text_content(content: &[Content]) -> Option<String> {
    let mut lines = Vec::new();
    for item in content {
        if let Some(text) = item.as_text() {
            lines.push(text.text.clone());
            continue;
        }
        if let Some(resource) = item.as_resource() {
            if let ResourceContents::TextResourceContents { text, .. } = &resource.resource {
                lines.push(text.clone());
            }
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn map_call_result(name: &str, result: CallToolResult) -> Result<ToolCallResult, ChatError> {
    let text_content = extract_text_content(&result.content);

    // A host error with a message is a result the model should see.
    if result.is_error.unwrap_or(false) {
        let message = text_content
            .or_else(|| result.structured_content.as_ref().map(|v| v.to_string()))
            .ok_or_else(|| ChatError::tool(name, "MCP tool returned an error result"))?;
        return Ok(ToolCallResult {
            content: Some(message),
            is_error: true,
            error: None,
        });
    }

    Ok(ToolCallResult {
        content: text_content,
        is_error: false,
        error: None,
    })
}

fn map_client_initialize_error(error: ClientInitializeError) -> ChatError {
    let message = match error {
        ClientInitializeError::ConnectionClosed(context) => {
            format!("MCP initialize connection closed: {context}")
        }
        ClientInitializeError::TransportError { error, context } => {
            format!("MCP initialize transport error ({context}): {error}")
        }
        ClientInitializeError::JsonRpcError(error) => format!(
            "MCP initialize JSON-RPC error {}: {}",
            error.code.0, error.message
        ),
        ClientInitializeError::Cancelled => "MCP initialize cancelled".to_string(),
        other => format!("MCP initialize error: {other}"),
    };
    ChatError::Connection(message)
}

fn map_service_error(context: &str, error: ServiceError) -> ChatError {
    match error {
        ServiceError::McpError(error) => ChatError::Transport(format!(
            "{context}: MCP error {}: {}",
            error.code.0, error.message
        )),
        ServiceError::TransportSend(error) => {
            ChatError::Transport(format!("{context}: MCP transport send failed: {error}"))
        }
        ServiceError::TransportClosed => {
            ChatError::Transport(format!("{context}: MCP transport closed"))
        }
        ServiceError::UnexpectedResponse => {
            ChatError::Transport(format!("{context}: unexpected MCP response"))
        }
        ServiceError::Cancelled { reason } => {
            let suffix = reason
                .as_deref()
                .map(|r| format!(" ({r})"))
                .unwrap_or_default();
            ChatError::Transport(format!("{context}: MCP request cancelled{suffix}"))
        }
        ServiceError::Timeout { timeout } => {
            ChatError::Timeout(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX))
        }
        other => ChatError::Transport(format!("{context}: MCP service error: {other}")),
    }
}
