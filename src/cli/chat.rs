//! Interactive chat loop.

use std::io::{BufRead, Write};

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, Lines};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::agent_loop::{ConversationEngine, QueryOutcome};
use crate::error::ChatError;
use crate::mcp::{ToolDescriptor, ToolSession};

pub const PROMPT: &str = "Query: ";
pub const EMPTY_INPUT_HINT: &str = "Please enter a query, or 'quit' to exit.";
pub const NO_RESPONSE: &str = "(no response)";

/// Why the chat loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatLoopExit {
    Quit,
    EndOfInput,
    Interrupted,
}

/// A source of user input lines.
#[async_trait]
pub trait LineSource: Send {
    /// Next line without its terminator, or `None` at end of input.
    async fn next_line(&mut self) -> std::io::Result<Option<String>>;
}

#[async_trait]
impl<R> LineSource for Lines<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        Lines::next_line(self).await
    }
}

/// Lines from the process's stdin, read on a detached thread so a pending
/// read never holds up shutdown.
pub struct StdinLines {
    rx: mpsc::UnboundedReceiver<std::io::Result<String>>,
}

impl StdinLines {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let failed = line.is_err();
                if tx.send(line).is_err() || failed {
                    break;
                }
            }
        });
        Self { rx }
    }
}

#[async_trait]
impl LineSource for StdinLines {
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        self.rx.recv().await.transpose()
    }
}

/// Anything that can answer a query for the chat loop.
#[async_trait]
pub trait QueryHandler: Send {
    async fn handle(&mut self, query: &str) -> QueryOutcome;
}

/// A conversation engine paired with the session it calls tools through.
pub struct BoundEngine<'a> {
    pub engine: &'a mut ConversationEngine,
    pub session: &'a mut dyn ToolSession,
}

#[async_trait]
impl QueryHandler for BoundEngine<'_> {
    async fn handle(&mut self, query: &str) -> QueryOutcome {
        self.engine.respond(&mut *self.session, query).await
    }
}

pub fn write_banner<W: Write>(out: &mut W, tools: &[ToolDescriptor]) -> std::io::Result<()> {
    let names = tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>();
    writeln!(out, "\nConnected to server with tools: {}", names.join(", "))?;
    writeln!(out, "MCP client started. Type your queries or 'quit' to exit.")
}

/// Prompt, read, answer, repeat.
///
/// Blank input re-prompts without reaching `handler`. The loop ends on
/// `quit` (any case), at end of input, or when `cancel` fires. A query still
/// in flight when `cancel` fires is dropped.
pub async fn run_chat_loop<L, H, W>(
    lines: &mut L,
    handler: &mut H,
    out: &mut W,
    cancel: &CancellationToken,
) -> Result<ChatLoopExit, ChatError>
where
    L: LineSource + ?Sized,
    H: QueryHandler + ?Sized,
    W: Write,
{
    loop {
        write!(out, "\n{PROMPT}")?;
        out.flush()?;

        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("chat loop interrupted");
                writeln!(out)?;
                return Ok(ChatLoopExit::Interrupted);
            }
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            writeln!(out)?;
            return Ok(ChatLoopExit::EndOfInput);
        };

        let query = line.trim();
        if query.is_empty() {
            writeln!(out, "{EMPTY_INPUT_HINT}")?;
            continue;
        }
        if query.eq_ignore_ascii_case("quit") {
            return Ok(ChatLoopExit::Quit);
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("query interrupted");
                writeln!(out)?;
                return Ok(ChatLoopExit::Interrupted);
            }
            outcome = handler.handle(query) => outcome,
        };
        for trace in &outcome.tool_trace {
            writeln!(out, "{trace}")?;
        }
        if outcome.answer.is_empty() {
            writeln!(out, "\n{NO_RESPONSE}")?;
        } else {
            writeln!(out, "\n{}", outcome.answer)?;
        }
    }
}
