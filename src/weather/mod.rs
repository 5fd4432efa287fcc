//! National Weather Service client backing the bundled `weather-server` tool
//! host.

pub mod server;

pub use server::WeatherServer;

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::ChatError;

pub const NWS_API_BASE: &str = "https://api.weather.gov";
pub const NWS_USER_AGENT: &str = "weather-app/1.0";
pub const NWS_TIMEOUT: Duration = Duration::from_secs(30);
const FORECAST_PERIODS: usize = 5;
const SEPARATOR: &str = "\n----\n";

pub const ALERTS_UNAVAILABLE: &str = "Unable to fetch alerts or no alerts found.";
pub const NO_ACTIVE_ALERTS: &str = "No active alerts for this state.";
pub const POINTS_UNAVAILABLE: &str = "Unable to fetch forecast data for this location.";
pub const FORECAST_UNAVAILABLE: &str = "Unable to fetch detailed forecast.";

#[derive(Debug, Deserialize)]
struct AlertCollection {
    features: Option<Vec<AlertFeature>>,
}

#[derive(Debug, Deserialize)]
struct AlertFeature {
    #[serde(default)]
    properties: AlertProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlertProperties {
    event: Option<String>,
    severity: Option<String>,
    description: Option<String>,
    area_desc: Option<String>,
    effective: Option<String>,
    instruction: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PointsResponse {
    properties: PointsProperties,
}

#[derive(Debug, Deserialize)]
struct PointsProperties {
    forecast: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    properties: ForecastProperties,
}

#[derive(Debug, Deserialize)]
struct ForecastProperties {
    #[serde(default)]
    periods: Vec<ForecastPeriod>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForecastPeriod {
    name: String,
    temperature: Value,
    temperature_unit: String,
    wind_speed: Option<String>,
    wind_direction: Option<String>,
    detailed_forecast: String,
}

/// Thin client for the two NWS lookups the tools need.
///
/// Every failure (transport, status, decoding) is logged and folded into a
/// human-readable string; nothing here returns an error to the tool caller.
#[derive(Debug, Clone)]
pub struct NwsClient {
    base_url: String,
    client: reqwest::Client,
}

impl NwsClient {
    pub fn new() -> Result<Self, ChatError> {
        Self::with_base_url(NWS_API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ChatError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(NWS_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/geo+json"));
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(NWS_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Active alerts for a two-letter US state code.
    pub async fn get_alerts(&self, state: &str) -> String {
        let url = format!("{}/alerts/active/area/{}", self.base_url, state.trim().to_uppercase());
        let Some(collection) = self.fetch::<AlertCollection>(&url).await else {
            return ALERTS_UNAVAILABLE.to_string();
        };
        let Some(features) = collection.features else {
            return ALERTS_UNAVAILABLE.to_string();
        };
        if features.is_empty() {
            return NO_ACTIVE_ALERTS.to_string();
        }

        features
            .iter()
            .map(|feature| format_alert(&feature.properties))
            .collect::<Vec<_>>()
            .join(SEPARATOR)
    }

    /// Forecast for the next few periods at a location.
    pub async fn get_forecast(&self, latitude: f64, longitude: f64) -> String {
        let points_url = format!("{}/points/{latitude},{longitude}", self.base_url);
        let forecast_url = match self.fetch::<PointsResponse>(&points_url).await {
            Some(PointsResponse {
                properties: PointsProperties { forecast: Some(url) },
            }) => url,
            _ => return POINTS_UNAVAILABLE.to_string(),
        };

        let Some(forecast) = self.fetch::<ForecastResponse>(&forecast_url).await else {
            return FORECAST_UNAVAILABLE.to_string();
        };

        forecast
            .properties
            .periods
            .iter()
            .take(FORECAST_PERIODS)
            .map(format_period)
            .collect::<Vec<_>>()
            .join(SEPARATOR)
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, url: &str) -> Option<T> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(error) => {
                warn!(%url, %error, "NWS request failed");
                return None;
            }
        };
        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "NWS request returned an error status");
            return None;
        }
        match response.json::<T>().await {
            Ok(body) => Some(body),
            Err(error) => {
                warn!(%url, %error, "NWS response could not be decoded");
                None
            }
        }
    }
}

fn or_unknown(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("Unknown")
}

fn format_alert(props: &AlertProperties) -> String {
    format!(
        "Event: {}\nSeverity: {}\nDescription: {}\nArea: {}\nEffective: {}\nInstruction: {}",
        or_unknown(&props.event),
        or_unknown(&props.severity),
        or_unknown(&props.description),
        or_unknown(&props.area_desc),
        or_unknown(&props.effective),
        or_unknown(&props.instruction),
    )
}

fn format_period(period: &ForecastPeriod) -> String {
    let temperature = match &period.temperature {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    format!(
        "{}:\nTemperature: {}°{}\nWind: {} {}\nForecast: {}",
        period.name,
        temperature,
        period.temperature_unit,
        period.wind_speed.as_deref().unwrap_or(""),
        period.wind_direction.as_deref().unwrap_or(""),
        period.detailed_forecast,
    )
}
