//! mcp-chat: a terminal chat client that lets a language model call tools
//! exposed by a Model Context Protocol server.
//!
//! The pieces, bottom-up:
//! - [`mcp`] connects to a tool host over stdio and exposes it as a
//!   [`mcp::ToolSession`].
//! - [`tools`] adapts host tool descriptors for the model and invokes calls.
//! - [`types`] holds conversation turns and the append-only message history.
//! - [`agent_loop`] runs a query through model calls and tool rounds.
//! - [`provider`] is the model boundary (OpenAI-compatible chat completions).
//!
//! ```no_run
//! use std::sync::Arc;
//! use mcp_chat::agent_loop::{ConversationEngine, EngineSettings};
//! use mcp_chat::config::{ChatConfig, ConfigOverrides};
//! use mcp_chat::mcp::{MCPClient, ServerEndpoint};
//! use mcp_chat::provider::OpenAiCompatibleProvider;
//!
//! # async fn example() -> mcp_chat::error::Result<()> {
//! let config = ChatConfig::load(&ConfigOverrides::default(), None)?;
//! let provider = Arc::new(OpenAiCompatibleProvider::from_config(&config)?);
//! let endpoint = ServerEndpoint::from_script_path("weather.py")?;
//! let (mut client, tools) = MCPClient::connect(&endpoint).await?;
//!
//! let mut engine = ConversationEngine::new(provider, tools, EngineSettings::from_config(&config));
//! let answer = engine.process_query(&mut client, "Any weather alerts in CA?").await;
//! println!("{answer}");
//!
//! client.dispose().await?;
//! # Ok(())
//! # }
//! ```

pub mod agent_loop;
pub mod config;
pub mod error;
pub mod mcp;
pub mod provider;
pub mod tools;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(feature = "weather")]
pub mod weather;
