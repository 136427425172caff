//! Events that can occur during a turn

use super::TurnError;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    Submit { text: String },
    DismissError,
    Clear,

    // Controller events
    Dispatch,
    Settle,

    // Conversation events
    ReplyReceived { text: String },
    TurnFailed { error: TurnError },
}
