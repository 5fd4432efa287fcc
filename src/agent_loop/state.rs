use serde::{Deserialize, Serialize};
use strum::Display;

/// Where the engine is within one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LoopState {
    AwaitingUserInput,
    ModelCallPending,
    ToolRound,
    Done,
}

impl LoopState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: LoopState) -> bool {
        use LoopState::*;
        matches!(
            (self, next),
            (AwaitingUserInput, ModelCallPending)
                | (ModelCallPending, ToolRound)
                | (ModelCallPending, Done)
                | (ToolRound, ModelCallPending)
                | (Done, AwaitingUserInput)
                | (_, Done)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_state_machine_names() {
        assert_eq!(LoopState::ModelCallPending.to_string(), "MODEL_CALL_PENDING");
        assert_eq!(LoopState::ToolRound.to_string(), "TOOL_ROUND");
    }

    #[test]
    fn tool_round_must_go_back_through_the_model() {
        assert!(LoopState::ToolRound.can_transition_to(LoopState::ModelCallPending));
        assert!(!LoopState::ToolRound.can_transition_to(LoopState::ToolRound));
        assert!(!LoopState::AwaitingUserInput.can_transition_to(LoopState::ToolRound));
    }
}
