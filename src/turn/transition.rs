//! Pure state transition function
//!
//! Given the same state and event this always yields the same new state and
//! effects, with no I/O.

use super::{Effect, Event, TurnState};
use thiserror::Error;

/// Assistant text used when the model answers with nothing
pub const NO_RESPONSE_TEXT: &str = "No response received.";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: TurnState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: TurnState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("A reply is still pending, wait for it before sending again")]
    TurnInFlight,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

pub fn transition(state: &TurnState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Submission
        // ============================================================

        // Blank input is dropped without touching anything
        (TurnState::Idle, Event::Submit { text }) if text.trim().is_empty() => {
            Ok(TransitionResult::new(TurnState::Idle))
        }

        (TurnState::Idle, Event::Submit { text }) => {
            Ok(TransitionResult::new(TurnState::AwaitingInput { text }))
        }

        (TurnState::AwaitingInput { text }, Event::Dispatch) => {
            Ok(TransitionResult::new(TurnState::Sending)
                .with_effect(Effect::StageUserMessage { text: text.clone() })
                .with_effect(Effect::RequestTurn { text: text.clone() })
                .with_effect(Effect::Render))
        }

        // One turn per conversation at a time
        (state, Event::Submit { .. } | Event::Clear | Event::DismissError) if state.is_busy() => {
            Err(TransitionError::TurnInFlight)
        }

        // ============================================================
        // Outcome
        // ============================================================
        (TurnState::Sending, Event::ReplyReceived { text }) => {
            let reply = if text.trim().is_empty() {
                NO_RESPONSE_TEXT.to_string()
            } else {
                text
            };
            Ok(TransitionResult::new(TurnState::Completed)
                .with_effect(Effect::CommitExchange { reply })
                .with_effect(Effect::ClearError)
                .with_effect(Effect::Render))
        }

        (TurnState::Sending, Event::TurnFailed { error }) => {
            let message = error.to_string();
            Ok(TransitionResult::new(TurnState::Failed {
                message: message.clone(),
            })
            .with_effect(Effect::DiscardPending)
            .with_effect(Effect::SetError { message })
            .with_effect(Effect::Render))
        }

        (TurnState::Completed | TurnState::Failed { .. }, Event::Settle) => {
            Ok(TransitionResult::new(TurnState::Idle).with_effect(Effect::Render))
        }

        // ============================================================
        // Session actions
        // ============================================================
        (TurnState::Idle, Event::DismissError) => Ok(TransitionResult::new(TurnState::Idle)
            .with_effect(Effect::ClearError)
            .with_effect(Effect::Render)),

        (TurnState::Idle, Event::Clear) => Ok(TransitionResult::new(TurnState::Idle)
            .with_effect(Effect::ResetSession)
            .with_effect(Effect::Render)),

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{event:?} in state {state:?}"
        ))),
    }
}
