//! Turn failure classification

use crate::llm::{LlmError, LlmErrorKind};
use thiserror::Error;

/// Why a turn failed. The display form is what the user sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    /// The model service reported a structured failure
    #[error("API Error: {0}")]
    Provider(String),

    /// No usable answer came back (connectivity, malformed body, ...)
    #[error("Unexpected Error: {0}")]
    Unexpected(String),

    /// The call did not finish within the turn timeout
    #[error("Timeout Error: {0}")]
    Timeout(String),
}

impl From<LlmError> for TurnError {
    fn from(e: LlmError) -> Self {
        match e.kind {
            LlmErrorKind::Timeout => TurnError::Timeout(e.message),
            kind if kind.is_provider_reported() => TurnError::Provider(e.message),
            _ => TurnError::Unexpected(e.message),
        }
    }
}
