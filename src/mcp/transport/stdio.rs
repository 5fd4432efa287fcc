use async_trait::async_trait;
use rmcp::model::ClientInfo;
use rmcp::service::{ClientInitializeError, ServiceExt};
use rmcp::transport::TokioChildProcess;
use tokio::process::Command;
use tracing::debug;

use super::{MCPRunningService, MCPTransport};
use crate::error::ChatError;
use crate::mcp::endpoint::ServerEndpoint;

/// Stdio-based MCP transport: spawns the tool host as a child process.
///
/// The child is owned by the running service and is terminated when that
/// service is cancelled or dropped.
pub struct StdioTransport {
    endpoint: ServerEndpoint,
    closed: bool,
}

impl StdioTransport {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self::from_endpoint(ServerEndpoint::new(command, args))
    }

    pub fn from_endpoint(endpoint: ServerEndpoint) -> Self {
        Self {
            endpoint,
            closed: false,
        }
    }

    pub fn endpoint(&self) -> &ServerEndpoint {
        &self.endpoint
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.endpoint.command);
        command.args(&self.endpoint.args);
        if let Some(env) = &self.endpoint.env {
            command.envs(env);
        }
        command
    }
}

#[async_trait]
impl MCPTransport for StdioTransport {
    async fn connect(
        &mut self,
        client_info: ClientInfo,
    ) -> Result<MCPRunningService, ClientInitializeError> {
        if self.closed {
            return Err(ClientInitializeError::ConnectionClosed(
                "MCP transport closed".into(),
            ));
        }

        debug!(endpoint = %self.endpoint.describe(), "spawning tool host");
        let transport = TokioChildProcess::new(self.command()).map_err(|error| {
            ClientInitializeError::transport::<TokioChildProcess>(error, "spawn stdio transport")
        })?;

        client_info.into_dyn().serve(transport).await
    }

    async fn close(&mut self) -> Result<(), ChatError> {
        self.closed = true;
        Ok(())
    }

    fn describe(&self) -> String {
        self.endpoint.describe()
    }
}
