//! Model provider trait and the chat-completions implementation.

pub mod http;
pub mod openai_compatible;

pub use openai_compatible::OpenAiCompatibleProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::types::{ConversationTurn, ModelResponse};

/// A request sent to a model provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderRequest {
    pub system_prompt: Option<String>,
    pub turns: Vec<ConversationTurn>,
    pub tools: Option<Vec<ToolDefinition>>,
}

/// Tool definition sent to the provider API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// The model boundary: one completion per call.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name used in diagnostics.
    fn provider_name(&self) -> &str;

    /// The model ID this provider instance serves.
    fn model_id(&self) -> &str;

    /// Generate one completion for the given history and tool schema.
    async fn complete(&self, request: &ProviderRequest) -> Result<ModelResponse, ChatError>;
}
