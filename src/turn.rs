//! Turn controller
//!
//! Implements the Elm Architecture pattern: a pure transition function
//! decides, the controller executes the resulting effects.

mod controller;
mod effect;
mod error;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use controller::{PendingTurn, SessionSnapshot, TurnController, TurnOutcome};
pub use effect::Effect;
pub use error::TurnError;
pub use event::Event;
pub use state::TurnState;
pub use transition::{transition, TransitionError};
