//! Conversation handles
//!
//! A handle is the core's reference to one multi-turn context on the model
//! side. The provider API is stateless, so the handle carries the history
//! that gets replayed on every turn.

use super::types::LlmMessage;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Opaque reference to a model-side conversation
#[derive(Debug, Clone)]
pub struct ConversationHandle {
    id: Uuid,
    started_at: DateTime<Utc>,
    history: Vec<LlmMessage>,
}

impl ConversationHandle {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            history: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Number of completed exchanges applied to this conversation
    pub fn turns(&self) -> usize {
        self.history.len() / 2
    }

    pub(crate) fn history(&self) -> &[LlmMessage] {
        &self.history
    }

    /// Apply a successful exchange. Failed turns never reach the history.
    pub fn record_exchange(&mut self, user_text: impl Into<String>, reply: impl Into<String>) {
        self.history.push(LlmMessage::user(user_text));
        self.history.push(LlmMessage::assistant(reply));
    }
}

impl Default for ConversationHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MessageRole;

    #[test]
    fn test_fresh_handles_are_distinct_and_empty() {
        let a = ConversationHandle::new();
        let b = ConversationHandle::new();

        assert_ne!(a.id(), b.id());
        assert_eq!(a.turns(), 0);
        assert!(a.history().is_empty());
    }

    #[test]
    fn test_record_exchange_alternates_roles() {
        let mut handle = ConversationHandle::new();
        handle.record_exchange("hi", "hello there");
        handle.record_exchange("how are you", "fine");

        assert_eq!(handle.turns(), 2);
        let roles: Vec<MessageRole> = handle.history().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User,
                MessageRole::Assistant
            ]
        );
        assert_eq!(handle.history()[3].text, "fine");
    }
}
