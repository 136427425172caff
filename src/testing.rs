//! Mock implementations for testing
//!
//! These mocks enable turn and API testing without network I/O.

use crate::llm::{ConversationHandle, ConversationService, LlmError, TurnReply};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use uuid::Uuid;

/// One call observed by [`MockConversation`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTurn {
    pub conversation_id: Uuid,
    /// Completed exchanges on the handle when the call was made
    pub prior_turns: usize,
    pub text: String,
}

/// Mock conversation service that returns queued replies
pub struct MockConversation {
    replies: Mutex<VecDeque<Result<TurnReply, LlmError>>>,
    model_id: String,
    turns: Mutex<Vec<RecordedTurn>>,
    started: Mutex<Vec<Uuid>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

#[allow(dead_code)]
impl MockConversation {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            turns: Mutex::new(Vec::new()),
            started: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
        }
    }

    /// Queue a successful reply
    pub fn queue_reply(&self, text: impl Into<String>) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(TurnReply::text(text)));
    }

    /// Queue an error reply
    pub fn queue_error(&self, error: LlmError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    /// Make every following call wait until [`release`](Self::release)
    pub fn hold(&self) {
        *self.gate.lock().unwrap() = Some(Arc::new(Notify::new()));
    }

    /// Let one held call through
    pub fn release(&self) {
        if let Some(gate) = self.gate.lock().unwrap().as_ref() {
            gate.notify_one();
        }
    }

    /// Get recorded calls
    pub fn recorded_turns(&self) -> Vec<RecordedTurn> {
        self.turns.lock().unwrap().clone()
    }

    /// Ids of every conversation opened through this mock
    pub fn started_conversations(&self) -> Vec<Uuid> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConversationService for MockConversation {
    fn start_conversation(&self) -> ConversationHandle {
        let handle = ConversationHandle::new();
        self.started.lock().unwrap().push(handle.id());
        handle
    }

    async fn send_turn(
        &self,
        handle: &ConversationHandle,
        text: &str,
    ) -> Result<TurnReply, LlmError> {
        self.turns.lock().unwrap().push(RecordedTurn {
            conversation_id: handle.id(),
            prior_turns: handle.turns(),
            text: text.to_string(),
        });

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock reply queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
