//! OpenAI-compatible Chat Completions provider (DashScope compatible mode by default).

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::types::{ConversationTurn, FinishReason, ModelResponse, ToolCallRequest};

use super::http::{bearer_headers, build_client, status_to_error};
use super::{ModelProvider, ProviderRequest};

/// Provider for any API speaking the `/chat/completions` dialect.
pub struct OpenAiCompatibleProvider {
    model: String,
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        model: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            model: model.into(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn from_config(config: &ChatConfig) -> Result<Self, ChatError> {
        let client = build_client(config.request_timeout())?;
        Ok(Self::new(
            config.model.clone(),
            config.api_key.clone(),
            config.base_url.clone(),
            client,
        ))
    }

    fn build_request_body(&self, request: &ProviderRequest) -> serde_json::Value {
        let mut messages = Vec::with_capacity(request.turns.len() + 1);
        if let Some(system) = request.system_prompt.as_deref() {
            messages.push(serde_json::json!({ "role": "system", "content": system }));
        }
        messages.extend(request.turns.iter().map(turn_to_openai));

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });

        if let Some(tools) = request.tools.as_ref().filter(|tools| !tools.is_empty()) {
            let tool_defs: Vec<serde_json::Value> = tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = tool_defs.into();
        }

        body
    }
}

#[async_trait]
impl ModelProvider for OpenAiCompatibleProvider {
    fn provider_name(&self) -> &str {
        "openai-compatible"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ProviderRequest) -> Result<ModelResponse, ChatError> {
        let body = self.build_request_body(request);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            model = self.model.as_str(),
            turns = request.turns.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "chat completion request"
        );

        let resp = self
            .client
            .post(&url)
            .headers(bearer_headers(&self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let data: ChatCompletionResponse = resp.json().await?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ChatError::ModelCall("no choices in completion response".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCallRequest {
                id: tc
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple())),
                name: tc.function.name,
                arguments: tc.function.arguments.unwrap_or(serde_json::Value::Null),
            })
            .collect();

        Ok(ModelResponse {
            text: choice.message.content,
            tool_calls,
            finish_reason: choice
                .finish_reason
                .as_deref()
                .and_then(|reason| reason.parse::<FinishReason>().ok()),
        })
    }
}

fn turn_to_openai(turn: &ConversationTurn) -> serde_json::Value {
    match turn {
        ConversationTurn::User { text } => serde_json::json!({ "role": "user", "content": text }),
        ConversationTurn::Assistant { text, tool_calls } => {
            let content = text.clone().unwrap_or_default();
            if tool_calls.is_empty() {
                return serde_json::json!({ "role": "assistant", "content": content });
            }
            let tc_json: Vec<serde_json::Value> = tool_calls
                .iter()
                .map(|tc| {
                    serde_json::json!({
                        "id": tc.id,
                        "type": "function",
                        "function": {
                            "name": tc.name,
                            "arguments": tc.arguments_text(),
                        }
                    })
                })
                .collect();
            serde_json::json!({
                "role": "assistant",
                "content": content,
                "tool_calls": tc_json,
            })
        }
        ConversationTurn::Tool {
            tool_call_id,
            tool_name,
            content,
        } => serde_json::json!({
            "role": "tool",
            "tool_call_id": tool_call_id,
            "name": tool_name,
            "content": content,
        }),
    }
}

// Chat Completions response types (internal)

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ChatToolCall>>,
}

#[derive(Deserialize)]
struct ChatToolCall {
    id: Option<String>,
    function: ChatFunction,
}

#[derive(Deserialize)]
struct ChatFunction {
    name: String,
    arguments: Option<serde_json::Value>,
}
