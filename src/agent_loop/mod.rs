//! The conversation engine: model calls, tool rounds and termination.

pub mod engine;
pub mod state;

pub use engine::{ConversationEngine, EngineSettings, QueryOutcome};
pub use state::LoopState;
