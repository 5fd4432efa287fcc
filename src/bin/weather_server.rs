//! Stdio MCP server offering US weather alerts and forecasts.
//!
//! Point `mcp-chat` at the built binary to use it as a tool host.

use rmcp::ServiceExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mcp_chat::error::ChatError;
use mcp_chat::weather::{NwsClient, WeatherServer};

#[tokio::main]
async fn main() -> Result<(), ChatError> {
    // stdout carries the protocol; logs must stay on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let server = WeatherServer::new(NwsClient::new()?);
    let service = server
        .serve(rmcp::transport::stdio())
        .await
        .map_err(|e| ChatError::Transport(format!("weather server failed to start: {e}")))?;
    info!("weather server ready");

    let reason = service
        .waiting()
        .await
        .map_err(|e| ChatError::Transport(format!("weather server stopped abnormally: {e}")))?;
    info!(?reason, "weather server stopped");
    Ok(())
}
