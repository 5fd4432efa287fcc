//! Tool host endpoint descriptors.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{ChatError, Result};

/// How to launch a tool host process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    pub command: String,
    pub args: Vec<String>,
    pub env: Option<HashMap<String, String>>,
}

impl ServerEndpoint {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            env: None,
        }
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    /// Pick the launcher from the script's extension.
    ///
    /// `.py` runs under `python`, `.js` under `node`; a path without an
    /// extension is treated as a native executable.
    pub fn from_script_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let display = path.to_string_lossy().to_string();
        if display.trim().is_empty() {
            return Err(ChatError::Configuration(
                "tool host path must not be empty".into(),
            ));
        }

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("py") => Ok(Self::new("python", vec![display])),
            Some("js") => Ok(Self::new("node", vec![display])),
            None => Ok(Self::new(display, Vec::new())),
            Some(other) => Err(ChatError::Configuration(format!(
                "unsupported tool host '{display}' (.{other}): expected a .py or .js script or a native executable"
            ))),
        }
    }

    pub fn describe(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_and_node_scripts_pick_their_interpreter() {
        let py = ServerEndpoint::from_script_path("weather.py").unwrap();
        assert_eq!(py.command, "python");
        assert_eq!(py.args, vec!["weather.py".to_string()]);

        let js = ServerEndpoint::from_script_path("build/index.js").unwrap();
        assert_eq!(js.command, "node");
        assert_eq!(js.describe(), "node build/index.js");
    }

    #[test]
    fn extensionless_path_runs_directly() {
        let native = ServerEndpoint::from_script_path("target/debug/weather-server").unwrap();
        assert_eq!(native.command, "target/debug/weather-server");
        assert!(native.args.is_empty());
        assert!(native.env.is_none());
    }

    #[test]
    fn other_extensions_and_empty_paths_are_rejected() {
        let err = ServerEndpoint::from_script_path("server.rb").unwrap_err();
        assert!(matches!(err, ChatError::Configuration(message) if message.contains(".py or .js")));
        assert!(ServerEndpoint::from_script_path("").is_err());
    }
}
