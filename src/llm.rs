//! LLM conversation abstraction
//!
//! The chat core talks to the model only through [`ConversationService`]:
//! open a conversation, then send turns against its handle.

mod conversation;
mod error;
mod gemini;
mod types;

pub use conversation::ConversationHandle;
pub use error::{LlmError, LlmErrorKind};
pub use gemini::{GeminiChat, GeminiSettings};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// A stateful, order-dependent multi-turn conversation collaborator
#[async_trait]
pub trait ConversationService: Send + Sync {
    /// Open a fresh conversation with no prior context
    fn start_conversation(&self) -> ConversationHandle {
        ConversationHandle::new()
    }

    /// Send one user turn in the context of `handle` and return the reply.
    ///
    /// The handle is not modified; the caller records the exchange once the
    /// turn has been accepted.
    async fn send_turn(
        &self,
        handle: &ConversationHandle,
        text: &str,
    ) -> Result<TurnReply, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

#[async_trait]
impl<T: ConversationService + ?Sized> ConversationService for Arc<T> {
    fn start_conversation(&self) -> ConversationHandle {
        (**self).start_conversation()
    }

    async fn send_turn(
        &self,
        handle: &ConversationHandle,
        text: &str,
    ) -> Result<TurnReply, LlmError> {
        (**self).send_turn(handle, text).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

/// Logging wrapper for conversation services
pub struct LoggingConversation {
    inner: Arc<dyn ConversationService>,
    model_id: String,
}

impl LoggingConversation {
    pub fn new(inner: Arc<dyn ConversationService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl ConversationService for LoggingConversation {
    fn start_conversation(&self) -> ConversationHandle {
        let handle = self.inner.start_conversation();
        tracing::debug!(
            model = %self.model_id,
            conversation_id = %handle.id(),
            "Conversation started"
        );
        handle
    }

    async fn send_turn(
        &self,
        handle: &ConversationHandle,
        text: &str,
    ) -> Result<TurnReply, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.send_turn(handle, text).await;
        let duration = start.elapsed();

        match &result {
            Ok(reply) => {
                tracing::info!(
                    model = %self.model_id,
                    conversation_id = %handle.id(),
                    turn = handle.turns() + 1,
                    duration_ms = %duration.as_millis(),
                    input_tokens = reply.usage.input_tokens,
                    output_tokens = reply.usage.output_tokens,
                    "LLM turn completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    conversation_id = %handle.id(),
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "LLM turn failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
