//! Parsing of model-produced tool arguments.

use rmcp::model::JsonObject;
use serde_json::Value;
use tracing::warn;

use crate::error::ChatError;
use crate::types::ToolCallRequest;

/// Parse raw tool arguments into an argument map.
///
/// Accepts an object, a JSON-encoded object string, or nothing at all
/// (`null` or a blank string, both meaning "no arguments").
pub fn try_parse_arguments(raw: &Value) -> Result<JsonObject, ChatError> {
    match raw {
        Value::Null => Ok(JsonObject::new()),
        Value::Object(map) => Ok(map.clone()),
        Value::String(text) if text.trim().is_empty() => Ok(JsonObject::new()),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(ChatError::ArgumentParse(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
            Err(e) => Err(ChatError::ArgumentParse(e.to_string())),
        },
        other => Err(ChatError::ArgumentParse(format!(
            "expected a JSON object, got {}",
            json_kind(other)
        ))),
    }
}

/// Arguments for `request`, degrading to an empty map on malformed input.
pub fn parse_tool_arguments(request: &ToolCallRequest) -> JsonObject {
    try_parse_arguments(&request.arguments).unwrap_or_else(|error| {
        warn!(
            tool = %request.name,
            raw = %request.arguments_text(),
            %error,
            "tool arguments unparseable, using empty map"
        );
        JsonObject::new()
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
