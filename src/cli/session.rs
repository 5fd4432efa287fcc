//! One chat session from connect to disposal.

use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::agent_loop::{ConversationEngine, EngineSettings};
use crate::error::ChatError;
use crate::mcp::{MCPClient, ToolDescriptor, ToolSession};
use crate::provider::ModelProvider;

use super::chat::{run_chat_loop, write_banner, BoundEngine, ChatLoopExit, LineSource};

/// A tool session the chat owns and must shut down when it ends.
#[async_trait]
pub trait OwnedSession: ToolSession {
    async fn dispose(&mut self) -> Result<(), ChatError>;
}

#[async_trait]
impl OwnedSession for MCPClient {
    async fn dispose(&mut self) -> Result<(), ChatError> {
        MCPClient::dispose(self).await
    }
}

/// Connect, chat until the loop exits, then dispose the session once.
///
/// A failed `connect` returns its error before anything is written to `out`
/// or read from `lines`. Once connected, the session is disposed on every
/// exit path, including loop I/O errors; a disposal failure is logged and
/// never replaces the loop outcome.
pub async fn run_session<S, C, L, W>(
    connect: C,
    provider: Arc<dyn ModelProvider>,
    settings: EngineSettings,
    lines: &mut L,
    out: &mut W,
    cancel: &CancellationToken,
) -> Result<ChatLoopExit, ChatError>
where
    S: OwnedSession,
    C: Future<Output = Result<(S, Vec<ToolDescriptor>), ChatError>>,
    L: LineSource + ?Sized,
    W: Write,
{
    let (mut session, tools) = connect.await?;
    let mut engine = ConversationEngine::new(provider, tools, settings);

    let outcome = converse(&mut session, &mut engine, lines, out, cancel).await;

    if let Err(error) = session.dispose().await {
        warn!(%error, "tool host shutdown failed");
    }
    info!(exit = ?outcome, "chat session ended");
    outcome
}

async fn converse<S, L, W>(
    session: &mut S,
    engine: &mut ConversationEngine,
    lines: &mut L,
    out: &mut W,
    cancel: &CancellationToken,
) -> Result<ChatLoopExit, ChatError>
where
    S: OwnedSession,
    L: LineSource + ?Sized,
    W: Write,
{
    write_banner(out, engine.catalog())?;
    out.flush()?;

    let mut handler = BoundEngine { engine, session };
    run_chat_loop(lines, &mut handler, out, cancel).await
}
