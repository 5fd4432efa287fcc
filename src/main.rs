//! mcp-chat binary entry point.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use mcp_chat::agent_loop::EngineSettings;
use mcp_chat::cli::{run_session, Cli, StdinLines};
use mcp_chat::config::ChatConfig;
use mcp_chat::error::ChatError;
use mcp_chat::mcp::{MCPClient, ServerEndpoint};
use mcp_chat::provider::OpenAiCompatibleProvider;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("mcp_chat=debug,info")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), ChatError> {
    let config = ChatConfig::load(&cli.overrides(), cli.config.as_deref())?;
    let endpoint = ServerEndpoint::from_script_path(&cli.server_script)?;
    let provider = Arc::new(OpenAiCompatibleProvider::from_config(&config)?);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let mut lines = StdinLines::spawn();
    let mut stdout = std::io::stdout();
    run_session(
        MCPClient::connect(&endpoint),
        provider,
        EngineSettings::from_config(&config),
        &mut lines,
        &mut stdout,
        &cancel,
    )
    .await
    .map(|_| ())
}
