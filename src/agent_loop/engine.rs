//! Query orchestration over the model and the tool session.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::{ChatConfig, DEFAULT_MAX_TOOL_ROUNDS};
use crate::error::ChatError;
use crate::mcp::{ToolDescriptor, ToolSession};
use crate::provider::{ModelProvider, ProviderRequest, ToolDefinition};
use crate::tools::{to_model_schema, ToolInvoker};
use crate::types::{MessageHistory, ModelResponse, ToolCallRequest};

use super::state::LoopState;

/// Knobs for the engine, usually derived from [`ChatConfig`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Upper bound on tool rounds per query. Always at least 1.
    pub max_tool_rounds: usize,
    pub tool_timeout: Option<Duration>,
    pub system_prompt: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            tool_timeout: None,
            system_prompt: None,
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &ChatConfig) -> Self {
        Self {
            max_tool_rounds: config.max_tool_rounds.max(1),
            tool_timeout: config.tool_timeout(),
            system_prompt: config.system_prompt.clone(),
        }
    }
}

/// Result of one successfully processed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    pub answer: String,
    /// One `[tool <name> args <json>]` line per executed call, in call order.
    pub tool_trace: Vec<String>,
    pub rounds: usize,
}

/// Drives one query at a time from user text to final answer.
///
/// The engine never owns the tool session; callers lend it per query.
pub struct ConversationEngine {
    provider: Arc<dyn ModelProvider>,
    invoker: ToolInvoker,
    settings: EngineSettings,
    catalog: Vec<ToolDescriptor>,
    history: MessageHistory,
    state: LoopState,
}

impl ConversationEngine {
    /// `catalog` is the tool list discovered at connect time; it is used
    /// whenever a per-query refresh fails.
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        catalog: Vec<ToolDescriptor>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            provider,
            invoker: ToolInvoker::new().with_timeout(settings.tool_timeout),
            settings,
            catalog,
            history: MessageHistory::new(),
            state: LoopState::AwaitingUserInput,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// History of the most recent query.
    pub fn history(&self) -> &MessageHistory {
        &self.history
    }

    pub fn catalog(&self) -> &[ToolDescriptor] {
        &self.catalog
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Answer `query`, turning any failure into a readable diagnostic so the
    /// chat loop keeps going.
    pub async fn process_query(&mut self, session: &mut dyn ToolSession, query: &str) -> String {
        self.respond(session, query).await.answer
    }

    /// Like [`process_query`](Self::process_query), keeping the tool trace.
    pub async fn respond(&mut self, session: &mut dyn ToolSession, query: &str) -> QueryOutcome {
        match self.answer_query(session, query).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(%error, category = %error.category(), "query failed");
                self.transition(LoopState::Done);
                QueryOutcome {
                    answer: format!("Error processing query ({}): {error}", error.category()),
                    tool_trace: Vec::new(),
                    rounds: 0,
                }
            }
        }
    }

    /// Answer `query`, surfacing model and history failures as errors.
    /// Tool failures never fail a query; they reach the model as tool
    /// results, empty unless the host supplied an error message.
    pub async fn answer_query(
        &mut self,
        session: &mut dyn ToolSession,
        query: &str,
    ) -> Result<QueryOutcome, ChatError> {
        if self.state != LoopState::AwaitingUserInput {
            self.transition(LoopState::AwaitingUserInput);
        }
        self.history = MessageHistory::new();
        self.history.push_user(query)?;

        let tools = self.refresh_tools(session).await;

        self.transition(LoopState::ModelCallPending);
        let mut response = self.complete(Some(&tools)).await?;

        if !response.has_tool_calls() {
            let answer = response.text_or_empty().to_string();
            self.history.push_assistant(response.text, Vec::new())?;
            self.transition(LoopState::Done);
            return Ok(QueryOutcome {
                answer,
                tool_trace: Vec::new(),
                rounds: 0,
            });
        }

        let mut rounds = 0;
        let mut tool_trace = Vec::new();
        let mut answers = Vec::new();

        loop {
            rounds += 1;
            self.transition(LoopState::ToolRound);
            tracing::debug!(round = rounds, calls = response.tool_calls.len(), "tool round");

            let more_rounds_allowed = rounds < self.settings.max_tool_rounds;
            let calls = std::mem::take(&mut response.tool_calls);
            let call_count = calls.len();
            let assistant_text = response.text.take().unwrap_or_default();
            let mut last_follow_up = ModelResponse::default();

            for (index, call) in calls.into_iter().enumerate() {
                tool_trace.push(trace_line(&call));
                self.history
                    .push_assistant(Some(assistant_text.clone()), vec![call.clone()])?;

                let result = self.invoker.invoke(session, &call).await;
                self.history.push_tool(&call.id, &call.name, result.text())?;

                let is_last_call = index + 1 == call_count;
                let follow_up_tools = (is_last_call && more_rounds_allowed).then_some(&tools);
                self.transition(LoopState::ModelCallPending);
                let follow_up = self.complete(follow_up_tools).await?;

                if !follow_up.text_or_empty().is_empty() {
                    answers.push(follow_up.text_or_empty().to_string());
                }
                if is_last_call {
                    last_follow_up = follow_up;
                } else {
                    if follow_up.has_tool_calls() {
                        debug!(tool = %call.name, "ignoring tool calls in intermediate follow-up");
                    }
                    self.transition(LoopState::ToolRound);
                }
            }

            if last_follow_up.has_tool_calls() && more_rounds_allowed {
                response = last_follow_up;
                continue;
            }

            if last_follow_up.has_tool_calls() {
                warn!(
                    rounds,
                    ignored = last_follow_up.tool_calls.len(),
                    "tool round limit reached, ignoring further tool calls"
                );
            }
            let final_text = last_follow_up.text.filter(|text| !text.is_empty());
            if final_text.is_some() {
                self.history.push_assistant(final_text, Vec::new())?;
            }
            break;
        }

        self.transition(LoopState::Done);
        Ok(QueryOutcome {
            answer: answers.join("\n"),
            tool_trace,
            rounds,
        })
    }

    async fn refresh_tools(&mut self, session: &mut dyn ToolSession) -> Vec<ToolDefinition> {
        match session.list_tools().await {
            Ok(tools) => {
                self.catalog = tools;
            }
            Err(error) => {
                warn!(%error, "tool refresh failed, using connect-time catalog");
            }
        }
        to_model_schema(&self.catalog)
    }

    async fn complete(
        &self,
        tools: Option<&Vec<ToolDefinition>>,
    ) -> Result<ModelResponse, ChatError> {
        let request = ProviderRequest {
            system_prompt: self.settings.system_prompt.clone(),
            turns: self.history.to_turns(),
            tools: tools.filter(|tools| !tools.is_empty()).cloned(),
        };
        debug!(
            provider = self.provider.provider_name(),
            model = self.provider.model_id(),
            turns = request.turns.len(),
            with_tools = request.tools.is_some(),
            "model call"
        );
        self.provider
            .complete(&request)
            .await
            .map_err(into_model_call_error)
    }

    fn transition(&mut self, next: LoopState) {
        if !self.state.can_transition_to(next) {
            warn!(from = %self.state, to = %next, "unexpected state transition");
        }
        debug!(from = %self.state, to = %next, "state");
        self.state = next;
    }
}

fn into_model_call_error(error: ChatError) -> ChatError {
    match error {
        ChatError::ModelCall(_)
        | ChatError::Api { .. }
        | ChatError::Authentication(_)
        | ChatError::RateLimited { .. } => error,
        other => ChatError::ModelCall(other.to_string()),
    }
}

fn trace_line(call: &ToolCallRequest) -> String {
    format!("[tool {} args {}]", call.name, call.arguments_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::types::{Role, ToolCallResult};
    use async_trait::async_trait;
    use rmcp::model::JsonObject;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedProvider {
        responses: Mutex<VecDeque<Result<ModelResponse, ChatError>>>,
        requests: Mutex<Vec<ProviderRequest>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<Result<ModelResponse, ChatError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<ProviderRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelProvider for ScriptedProvider {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        fn model_id(&self) -> &str {
            "scripted-model"
        }

        async fn complete(&self, request: &ProviderRequest) -> Result<ModelResponse, ChatError> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ChatError::ModelCall("script exhausted".into())))
        }
    }

    #[derive(Default)]
    struct FakeSession {
        calls: Vec<String>,
        fail_listing: bool,
    }

    #[async_trait]
    impl ToolSession for FakeSession {
        async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, ChatError> {
            if self.fail_listing {
                return Err(ChatError::Transport("pipe closed".into()));
            }
            Ok(vec![ToolDescriptor::new("get_alerts").with_input_schema(json!({
                "type": "object",
                "properties": { "state": { "type": "string" } }
            }))])
        }

        async fn call_tool(
            &mut self,
            name: &str,
            arguments: JsonObject,
        ) -> Result<ToolCallResult, ChatError> {
            self.calls.push(name.to_string());
            let state = arguments
                .get("state")
                .and_then(|v| v.as_str())
                .unwrap_or("none");
            Ok(ToolCallResult::success(format!("alerts:{state}")))
        }
    }

    fn engine(provider: Arc<ScriptedProvider>, settings: EngineSettings) -> ConversationEngine {
        ConversationEngine::new(provider, Vec::new(), settings)
    }

    fn alerts_call(id: &str, state: &str) -> ToolCallRequest {
        ToolCallRequest::new(id, "get_alerts", json!(format!(r#"{{"state":"{state}"}}"#)))
    }

    #[tokio::test]
    async fn plain_answer_needs_no_tools() {
        let provider = ScriptedProvider::new(vec![Ok(ModelResponse::text("Hello there"))]);
        let mut session = FakeSession::default();
        let mut engine = engine(provider.clone(), EngineSettings::default());

        let outcome = engine.answer_query(&mut session, "hi").await.unwrap();

        assert_eq!(outcome.answer, "Hello there");
        assert_eq!(outcome.rounds, 0);
        assert!(session.calls.is_empty());
        assert_eq!(engine.state(), LoopState::Done);
        assert_eq!(provider.requests().len(), 1);
        assert_eq!(provider.requests()[0].tools.as_ref().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn default_bound_stops_after_one_round() {
        let provider = ScriptedProvider::new(vec![
            Ok(ModelResponse::tool_calls(vec![alerts_call("call_1", "CA")])),
            Ok(ModelResponse {
                text: Some("Two alerts in CA".into()),
                tool_calls: vec![alerts_call("call_2", "NV")],
                finish_reason: None,
            }),
        ]);
        let mut session = FakeSession::default();
        let mut engine = engine(provider.clone(), EngineSettings::default());

        let outcome = engine.answer_query(&mut session, "alerts in CA?").await.unwrap();

        assert_eq!(outcome.answer, "Two alerts in CA");
        assert_eq!(outcome.rounds, 1);
        assert_eq!(session.calls, vec!["get_alerts"]);
        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].tools.is_none());
    }

    #[tokio::test]
    async fn higher_bound_allows_another_round() {
        let provider = ScriptedProvider::new(vec![
            Ok(ModelResponse::tool_calls(vec![alerts_call("call_1", "CA")])),
            Ok(ModelResponse::tool_calls(vec![alerts_call("call_2", "NV")])),
            Ok(ModelResponse::text("CA and NV both have alerts")),
        ]);
        let mut session = FakeSession::default();
        let settings = EngineSettings {
            max_tool_rounds: 2,
            ..Default::default()
        };
        let mut engine = engine(provider.clone(), settings);

        let outcome = engine.answer_query(&mut session, "west coast?").await.unwrap();

        assert_eq!(outcome.rounds, 2);
        assert_eq!(outcome.answer, "CA and NV both have alerts");
        assert_eq!(outcome.tool_trace.len(), 2);
        let requests = provider.requests();
        assert!(requests[1].tools.is_some());
        assert!(requests[2].tools.is_none());
    }

    #[tokio::test]
    async fn several_calls_in_one_response_run_in_order() {
        let provider = ScriptedProvider::new(vec![
            Ok(ModelResponse::tool_calls(vec![
                alerts_call("call_1", "CA"),
                alerts_call("call_2", "NV"),
            ])),
            Ok(ModelResponse::text("f1")),
            Ok(ModelResponse::text("f2")),
        ]);
        let mut session = FakeSession::default();
        let mut engine = engine(provider.clone(), EngineSettings::default());

        let outcome = engine.answer_query(&mut session, "CA and NV?").await.unwrap();

        assert_eq!(outcome.answer, "f1\nf2");
        assert_eq!(outcome.rounds, 1);
        assert_eq!(
            outcome.tool_trace,
            vec![
                r#"[tool get_alerts args {"state":"CA"}]"#,
                r#"[tool get_alerts args {"state":"NV"}]"#,
            ]
        );

        let turns = engine.history().to_turns();
        let shape: Vec<_> = turns.iter().map(|t| (t.role(), t.text())).collect();
        assert_eq!(
            shape,
            vec![
                (Role::User, "CA and NV?"),
                (Role::Assistant, ""),
                (Role::Tool, "alerts:CA"),
                (Role::Assistant, ""),
                (Role::Tool, "alerts:NV"),
                (Role::Assistant, "f2"),
            ]
        );
        assert_eq!(turns[1].tool_calls()[0].id, "call_1");
        assert_eq!(turns[3].tool_calls()[0].id, "call_2");

        let requests = provider.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].turns.len(), 3);
        assert_eq!(requests[2].turns.len(), 5);
        assert!(requests[1].tools.is_none());
        assert!(requests[2].tools.is_none());
    }

    #[tokio::test]
    async fn only_the_last_follow_up_opens_another_round() {
        let provider = ScriptedProvider::new(vec![
            Ok(ModelResponse::tool_calls(vec![
                alerts_call("call_1", "CA"),
                alerts_call("call_2", "NV"),
            ])),
            Ok(ModelResponse {
                text: Some("f1".into()),
                tool_calls: vec![alerts_call("ignored", "OR")],
                finish_reason: None,
            }),
            Ok(ModelResponse::tool_calls(vec![alerts_call("call_3", "TX")])),
            Ok(ModelResponse::text("done")),
        ]);
        let mut session = FakeSession::default();
        let settings = EngineSettings {
            max_tool_rounds: 2,
            ..Default::default()
        };
        let mut engine = engine(provider.clone(), settings);

        let outcome = engine.answer_query(&mut session, "southwest?").await.unwrap();

        assert_eq!(outcome.answer, "f1\ndone");
        assert_eq!(outcome.rounds, 2);
        assert_eq!(session.calls.len(), 3);
        assert!(outcome.tool_trace[2].contains("TX"));

        let requests = provider.requests();
        assert_eq!(requests.len(), 4);
        assert!(requests[1].tools.is_none());
        assert!(requests[2].tools.is_some());
        assert!(requests[3].tools.is_none());
        assert_eq!(engine.history().len(), 8);
        assert_eq!(engine.state(), LoopState::Done);
    }

    #[tokio::test]
    async fn model_failure_becomes_diagnostic_string() {
        let provider = ScriptedProvider::new(vec![Err(ChatError::api(500, "upstream exploded"))]);
        let mut session = FakeSession::default();
        let mut engine = engine(provider, EngineSettings::default());

        let answer = engine.process_query(&mut session, "hi").await;

        assert!(answer.contains("upstream exploded"), "{answer}");
        assert!(answer.contains(&ErrorCategory::ModelCall.to_string()));
        assert_eq!(engine.state(), LoopState::Done);
    }

    #[tokio::test]
    async fn transport_failure_is_reported_as_model_call() {
        let err = into_model_call_error(ChatError::Transport("reset".into()));
        assert_eq!(err.category(), ErrorCategory::ModelCall);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_connect_time_catalog() {
        let provider = ScriptedProvider::new(vec![Ok(ModelResponse::text("ok"))]);
        let mut session = FakeSession {
            fail_listing: true,
            ..Default::default()
        };
        let catalog = vec![ToolDescriptor::new("get_forecast")];
        let mut engine = ConversationEngine::new(provider.clone(), catalog, EngineSettings::default());

        engine.answer_query(&mut session, "hi").await.unwrap();

        let tools = provider.requests()[0].tools.clone().unwrap();
        assert_eq!(tools[0].name, "get_forecast");
        assert_eq!(engine.catalog()[0].name, "get_forecast");
    }

    #[tokio::test]
    async fn each_query_starts_a_fresh_history() {
        let provider = ScriptedProvider::new(vec![
            Ok(ModelResponse::text("first")),
            Ok(ModelResponse::text("second")),
        ]);
        let mut session = FakeSession::default();
        let mut engine = engine(provider.clone(), EngineSettings::default());

        engine.process_query(&mut session, "one").await;
        engine.process_query(&mut session, "two").await;

        assert_eq!(engine.history().len(), 2);
        assert_eq!(engine.history().to_turns()[0].text(), "two");
        assert_eq!(provider.requests()[1].turns.len(), 1);
    }

    #[test]
    fn settings_never_allow_zero_rounds() {
        let config = ChatConfig::builder()
            .api_key("sk-test".to_string())
            .max_tool_rounds(0)
            .build();
        assert_eq!(EngineSettings::from_config(&config).max_tool_rounds, 1);
    }
}
