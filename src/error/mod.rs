//! Error types for mcp-chat.

pub mod category;

pub use category::ErrorCategory;

use thiserror::Error;

/// Primary error type for all mcp-chat operations.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Tool invocation error: {tool_name}: {message}")]
    ToolInvocation { tool_name: String, message: String },

    #[error("Argument parse error: {0}")]
    ArgumentParse(String),

    #[error("Model call error: {0}")]
    ModelCall(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl ChatError {
    /// Create an API error from a status code and response body.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a tool invocation error.
    pub fn tool(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolInvocation {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Connection(_) => ErrorCategory::Connection,
            Self::ToolInvocation { .. } => ErrorCategory::ToolInvocation,
            Self::ArgumentParse(_) => ErrorCategory::ArgumentParse,
            Self::ModelCall(_)
            | Self::Api { .. }
            | Self::Authentication(_)
            | Self::RateLimited { .. } => ErrorCategory::ModelCall,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Network(_) | Self::Transport(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            _ => ErrorCategory::Unknown,
        }
    }

    /// Whether this error ends the process instead of a single query.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Connection | ErrorCategory::Configuration
        )
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ChatError>;
