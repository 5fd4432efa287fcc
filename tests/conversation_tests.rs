use std::sync::Arc;

use async_trait::async_trait;
use mcp_chat::agent_loop::{ConversationEngine, EngineSettings, LoopState};
use mcp_chat::error::ChatError;
use mcp_chat::mcp::{ToolDescriptor, ToolSession};
use mcp_chat::provider::OpenAiCompatibleProvider;
use mcp_chat::types::{ConversationTurn, Role, ToolCallResult};
use pretty_assertions::assert_eq;
use rmcp::model::JsonObject;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Weather-like tool host double recording every call.
#[derive(Default)]
struct WeatherSession {
    calls: Vec<(String, JsonObject)>,
    list_calls: usize,
}

#[async_trait]
impl ToolSession for WeatherSession {
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, ChatError> {
        self.list_calls += 1;
        Ok(vec![
            ToolDescriptor::new("get_alerts")
                .with_description("Get weather alerts for a US state")
                .with_input_schema(json!({
                    "type": "object",
                    "properties": { "state": { "type": "string" } },
                    "required": ["state"]
                })),
            ToolDescriptor::new("get_forecast"),
        ])
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: JsonObject,
    ) -> Result<ToolCallResult, ChatError> {
        self.calls.push((name.to_string(), arguments.clone()));
        match name {
            "get_alerts" => match arguments.get("state").and_then(Value::as_str) {
                Some(state) => Ok(ToolCallResult::success(format!(
                    "Event: Heat Advisory\nArea: {state}"
                ))),
                None => Ok(ToolCallResult {
                    content: None,
                    is_error: false,
                    error: None,
                }),
            },
            other => Err(ChatError::tool(other, "unknown tool")),
        }
    }
}

fn tool_call_reply(id: &str, name: &str, arguments: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": id,
                    "type": "function",
                    "function": { "name": name, "arguments": arguments }
                }]
            },
            "finish_reason": "tool_calls"
        }]
    }))
}

fn text_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{
            "message": { "role": "assistant", "content": text },
            "finish_reason": "stop"
        }]
    }))
}

async fn mount_sequence(server: &MockServer, replies: Vec<ResponseTemplate>) {
    for reply in replies {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(reply)
            .up_to_n_times(1)
            .mount(server)
            .await;
    }
}

fn engine(server: &MockServer) -> ConversationEngine {
    let provider = OpenAiCompatibleProvider::new(
        "qwen-plus-2025-04-28",
        "sk-test",
        format!("{}/v1", server.uri()),
        reqwest::Client::new(),
    );
    ConversationEngine::new(Arc::new(provider), Vec::new(), EngineSettings::default())
}

async fn request_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect()
}

#[tokio::test]
async fn alerts_query_runs_one_tool_round() {
    let server = MockServer::start().await;
    mount_sequence(
        &server,
        vec![
            tool_call_reply("call_1", "get_alerts", r#"{"state":"CA"}"#),
            text_reply("There is a heat advisory in California."),
        ],
    )
    .await;

    let mut session = WeatherSession::default();
    let mut engine = engine(&server);
    let outcome = engine
        .answer_query(&mut session, "What are the weather alerts in CA?")
        .await
        .unwrap();

    assert_eq!(outcome.answer, "There is a heat advisory in California.");
    assert_eq!(outcome.rounds, 1);
    assert_eq!(
        outcome.tool_trace,
        vec![r#"[tool get_alerts args {"state":"CA"}]"#.to_string()]
    );
    assert_eq!(session.calls.len(), 1);
    assert_eq!(session.calls[0].1.get("state"), Some(&json!("CA")));
    assert_eq!(session.list_calls, 1);
    assert_eq!(engine.state(), LoopState::Done);

    let roles: Vec<Role> = engine.history().turns().map(ConversationTurn::role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]);

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies.len(), 2);
    assert!(bodies[0].get("tools").is_some());
    assert!(bodies[1].get("tools").is_none());
    let follow_up = bodies[1]["messages"].as_array().unwrap();
    assert_eq!(follow_up.len(), 3);
    assert_eq!(follow_up[1]["role"], "assistant");
    assert_eq!(follow_up[1]["content"], "");
    assert_eq!(follow_up[1]["tool_calls"][0]["id"], "call_1");
    assert_eq!(follow_up[2]["role"], "tool");
    assert_eq!(follow_up[2]["tool_call_id"], "call_1");
    assert_eq!(follow_up[2]["content"], "Event: Heat Advisory\nArea: CA");
}

#[tokio::test]
async fn malformed_arguments_degrade_to_empty_map() {
    let server = MockServer::start().await;
    mount_sequence(
        &server,
        vec![
            tool_call_reply("call_1", "get_alerts", "{state: CA"),
            text_reply("I could not find alerts."),
        ],
    )
    .await;

    let mut session = WeatherSession::default();
    let answer = engine(&server)
        .process_query(&mut session, "alerts?")
        .await;

    assert_eq!(answer, "I could not find alerts.");
    assert!(session.calls[0].1.is_empty());

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies[1]["messages"][2]["content"], "");
}

#[tokio::test]
async fn unknown_tool_does_not_abort_the_query() {
    let server = MockServer::start().await;
    mount_sequence(
        &server,
        vec![
            tool_call_reply("call_1", "get_tides", "{}"),
            text_reply("That tool is unavailable."),
        ],
    )
    .await;

    let mut session = WeatherSession::default();
    let mut engine = engine(&server);
    let outcome = engine.answer_query(&mut session, "tides?").await.unwrap();

    assert_eq!(outcome.answer, "That tool is unavailable.");
    let tool_turn = engine.history().to_turns()[2].clone();
    assert_eq!(tool_turn.text(), "");
}

#[tokio::test]
async fn empty_follow_up_yields_empty_answer() {
    let server = MockServer::start().await;
    mount_sequence(
        &server,
        vec![
            tool_call_reply("call_1", "get_alerts", r#"{"state":"NY"}"#),
            ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": null }, "finish_reason": "stop" }]
            })),
        ],
    )
    .await;

    let mut session = WeatherSession::default();
    let answer = engine(&server).process_query(&mut session, "alerts NY").await;

    assert_eq!(answer, "");
}

#[tokio::test]
async fn model_outage_is_reported_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("service unavailable"))
        .mount(&server)
        .await;

    let mut session = WeatherSession::default();
    let mut engine = engine(&server);
    let answer = engine.process_query(&mut session, "hello").await;

    assert!(answer.starts_with("Error processing query"), "{answer}");
    assert!(answer.contains("503"));
    assert!(session.calls.is_empty());
}
