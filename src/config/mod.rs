//! Configuration system (layered: overrides > env > config file > defaults).

pub mod file;

pub use file::FileConfig;

use std::fmt;
use std::path::Path;
use std::time::Duration;

use bon::Builder;

use crate::error::{ChatError, Result};

/// DashScope's OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
pub const DEFAULT_MODEL: &str = "qwen-plus-2025-04-28";
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 1;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 120_000;

/// Environment variables consulted for the model credential, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["DASHSCOPE_API_KEY", "OPENAI_API_KEY"];

/// Resolved runtime configuration.
///
/// The credential is read once at startup and handed to the provider; nothing
/// downstream reads the environment again.
#[derive(Clone, Builder)]
pub struct ChatConfig {
    #[builder(into)]
    pub api_key: String,
    #[builder(into, default = DEFAULT_BASE_URL.to_string())]
    pub base_url: String,
    #[builder(into, default = DEFAULT_MODEL.to_string())]
    pub model: String,
    #[builder(default = DEFAULT_MAX_TOOL_ROUNDS)]
    pub max_tool_rounds: usize,
    #[builder(default = DEFAULT_REQUEST_TIMEOUT_MS)]
    pub request_timeout_ms: u64,
    pub tool_timeout_ms: Option<u64>,
    #[builder(into)]
    pub system_prompt: Option<String>,
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("api_key", &"..")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tool_rounds", &self.max_tool_rounds)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("tool_timeout_ms", &self.tool_timeout_ms)
            .field("system_prompt", &self.system_prompt)
            .finish()
    }
}

/// Values supplied explicitly (command line or code); highest precedence.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub max_tool_rounds: Option<usize>,
    pub tool_timeout_ms: Option<u64>,
}

impl ChatConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_ms.map(Duration::from_millis)
    }

    /// Load from `.env`, the process environment, and the config file.
    ///
    /// `config_path` replaces the default platform location when given; a
    /// missing default file is not an error, a missing explicit one is.
    pub fn load(overrides: &ConfigOverrides, config_path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let file = match config_path {
            Some(path) => FileConfig::read(path)?,
            None => match file::default_config_path() {
                Some(path) if path.exists() => FileConfig::read(&path)?,
                _ => FileConfig::default(),
            },
        };
        Self::resolve(overrides, |key| std::env::var(key).ok(), &file)
    }

    /// Merge all layers. `env` abstracts the environment lookup.
    pub fn resolve<F>(overrides: &ConfigOverrides, env: F, file: &FileConfig) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = API_KEY_ENV_VARS
            .iter()
            .find_map(|key| env(key).filter(|value| !value.trim().is_empty()))
            .or_else(|| file.api_key.clone())
            .ok_or_else(|| {
                ChatError::Configuration(format!(
                    "Missing model credential: set {} in the environment or api_key in the config file",
                    API_KEY_ENV_VARS[0]
                ))
            })?;

        let base_url = overrides
            .base_url
            .clone()
            .or_else(|| env("MCP_CHAT_BASE_URL"))
            .or_else(|| file.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let model = overrides
            .model
            .clone()
            .or_else(|| env("MCP_CHAT_MODEL"))
            .or_else(|| file.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let max_tool_rounds = match overrides.max_tool_rounds {
            Some(rounds) => rounds,
            None => match env("MCP_CHAT_MAX_TOOL_ROUNDS") {
                Some(raw) => parse_env_number("MCP_CHAT_MAX_TOOL_ROUNDS", &raw)?,
                None => file.max_tool_rounds.unwrap_or(DEFAULT_MAX_TOOL_ROUNDS),
            },
        };
        if max_tool_rounds == 0 {
            return Err(ChatError::Configuration(
                "max_tool_rounds must be at least 1".into(),
            ));
        }

        let request_timeout_ms = match env("MCP_CHAT_REQUEST_TIMEOUT_MS") {
            Some(raw) => parse_env_number("MCP_CHAT_REQUEST_TIMEOUT_MS", &raw)?,
            None => file
                .request_timeout_ms
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
        };

        let tool_timeout_ms = match overrides.tool_timeout_ms {
            Some(ms) => Some(ms),
            None => match env("MCP_CHAT_TOOL_TIMEOUT_MS") {
                Some(raw) => Some(parse_env_number("MCP_CHAT_TOOL_TIMEOUT_MS", &raw)?),
                None => file.tool_timeout_ms,
            },
        };

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            max_tool_rounds,
            request_timeout_ms,
            tool_timeout_ms,
            system_prompt: file.system_prompt.clone(),
        })
    }
}

fn parse_env_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| ChatError::Configuration(format!("{key} must be a number, got '{raw}'")))
}
