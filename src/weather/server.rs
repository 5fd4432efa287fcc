//! MCP server exposing `get_alerts` and `get_forecast`.

use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, ErrorData, Implementation, JsonObject,
    ListToolsResult, PaginatedRequestParams, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::NwsClient;
use crate::mcp::SchemaBuilder;

#[derive(Debug, Deserialize)]
struct AlertsArgs {
    state: String,
}

#[derive(Debug, Deserialize)]
struct ForecastArgs {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Clone)]
pub struct WeatherServer {
    nws: NwsClient,
}

impl WeatherServer {
    pub fn new(nws: NwsClient) -> Self {
        Self { nws }
    }

    pub fn tools() -> Vec<Tool> {
        let alerts_schema = SchemaBuilder::new()
            .property(
                "state",
                json!({ "type": "string", "description": "Two-letter US state code (e.g. CA, NY)" }),
                true,
            )
            .build();
        let forecast_schema = SchemaBuilder::new()
            .property(
                "latitude",
                json!({ "type": "number", "description": "Latitude of the location (e.g. 34.0522)" }),
                true,
            )
            .property(
                "longitude",
                json!({ "type": "number", "description": "Longitude of the location (e.g. -118.2437)" }),
                true,
            )
            .build();

        vec![
            Tool::new(
                "get_alerts",
                "Get active weather alerts for a US state (two-letter code such as CA or NY).",
                Arc::new(alerts_schema),
            ),
            Tool::new(
                "get_forecast",
                "Get the weather forecast for a location by latitude and longitude.",
                Arc::new(forecast_schema),
            ),
        ]
    }

    /// Run one tool by name. Weather lookups never fail; only bad names or
    /// arguments are errors.
    pub async fn run_tool(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<String, ErrorData> {
        debug!(tool = name, "weather tool call");
        match name {
            "get_alerts" => {
                let args: AlertsArgs = parse_args(arguments)?;
                Ok(self.nws.get_alerts(&args.state).await)
            }
            "get_forecast" => {
                let args: ForecastArgs = parse_args(arguments)?;
                Ok(self.nws.get_forecast(args.latitude, args.longitude).await)
            }
            other => Err(ErrorData::invalid_params(
                format!("unknown tool: {other}"),
                None,
            )),
        }
    }
}

fn parse_args<T: DeserializeOwned>(arguments: Option<JsonObject>) -> Result<T, ErrorData> {
    let value = serde_json::Value::Object(arguments.unwrap_or_default());
    serde_json::from_value(value)
        .map_err(|e| ErrorData::invalid_params(format!("invalid arguments: {e}"), None))
}

impl ServerHandler for WeatherServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "weather".into(),
                ..Implementation::from_build_env()
            },
            instructions: Some("US weather alerts and forecasts from the National Weather Service.".into()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(Self::tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let text = self.run_tool(&request.name, request.arguments).await?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}
