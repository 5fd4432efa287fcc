//! Error classification used for diagnostics.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Broad error category, aligned with where an error is recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    /// Tool host unreachable or handshake failed. Fatal at startup.
    Connection,
    /// Tool missing or failed on the host. Recovered as an error-bearing result.
    ToolInvocation,
    /// Malformed tool-call arguments. Recovered as an empty argument map.
    ArgumentParse,
    /// Completion request failed. Recovered as a diagnostic answer.
    ModelCall,
    Configuration,
    Network,
    Timeout,
    Unknown,
}
