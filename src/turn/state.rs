//! Turn state types

use serde::Serialize;

/// Where the session is in its request/response cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnState {
    /// Waiting for a submission
    #[default]
    Idle,

    /// Non-empty text was submitted and is about to be sent
    AwaitingInput { text: String },

    /// A request is in flight against the conversation
    Sending,

    /// A reply was appended; settles back to idle
    Completed,

    /// The call failed; settles back to idle
    Failed { message: String },
}

impl TurnState {
    /// Whether a turn currently owns the session
    pub fn is_busy(&self) -> bool {
        matches!(self, TurnState::AwaitingInput { .. } | TurnState::Sending)
    }
}
