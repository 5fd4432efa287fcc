//! Optional TOML config file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};

/// On-disk configuration; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub max_tool_rounds: Option<usize>,
    pub request_timeout_ms: Option<u64>,
    pub tool_timeout_ms: Option<u64>,
    pub system_prompt: Option<String>,
}

impl FileConfig {
    pub fn read(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| {
            ChatError::Configuration(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::parse(&raw)
            .map_err(|err| ChatError::Configuration(format!("{}: {err}", path.display())))
    }

    pub fn parse(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

/// `config.toml` inside the platform config directory.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "mcp-chat")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn reads_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "model = \"qwen-max\"\nmax_tool_rounds = 3\n").unwrap();

        let config = FileConfig::read(&path).unwrap();
        assert_eq!(
            config,
            FileConfig {
                model: Some("qwen-max".into()),
                max_tool_rounds: Some(3),
                ..Default::default()
            }
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "modle = \"typo\"\n").unwrap();

        let err = FileConfig::read(&path).expect_err("unknown key should fail");
        assert!(matches!(err, ChatError::Configuration(_)));
    }

    #[test]
    fn missing_file_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let err = FileConfig::read(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ChatError::Configuration(message) if message.contains("absent.toml")));
    }

    #[test]
    fn default_path_ends_with_config_toml() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("config.toml"));
        }
    }
}
