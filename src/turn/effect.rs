//! Effects produced by state transitions

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Show the user's text at the end of the transcript while in flight
    StageUserMessage { text: String },

    /// Send the turn to the conversation service
    RequestTurn { text: String },

    /// Append the staged user message and the assistant reply
    CommitExchange { reply: String },

    /// Drop the staged user message
    DiscardPending,

    SetError { message: String },

    ClearError,

    /// Empty the transcript and open a fresh conversation
    ResetSession,

    /// Tell connected views to re-render
    Render,
}
