//! Command-line surface for the `mcp-chat` binary.

pub mod chat;
pub mod session;

use std::path::PathBuf;

use clap::Parser;

use crate::config::ConfigOverrides;

pub use chat::{
    run_chat_loop, write_banner, BoundEngine, ChatLoopExit, LineSource, QueryHandler, StdinLines,
};
pub use session::{run_session, OwnedSession};

/// Chat with a language model that can call tools on an MCP server
#[derive(Parser, Debug)]
#[command(name = "mcp-chat", version, about)]
pub struct Cli {
    /// Tool host to launch: a .py or .js script, or an executable
    pub server_script: PathBuf,

    /// Model id (default: qwen-plus-2025-04-28)
    #[arg(short, long)]
    pub model: Option<String>,

    /// OpenAI-compatible API base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Maximum tool rounds per query
    #[arg(long)]
    pub max_tool_rounds: Option<usize>,

    /// Per-call tool timeout in milliseconds
    #[arg(long)]
    pub tool_timeout_ms: Option<u64>,

    /// Config file (default: platform config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose diagnostics on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            max_tool_rounds: self.max_tool_rounds,
            tool_timeout_ms: self.tool_timeout_ms,
        }
    }
}
