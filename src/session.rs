//! Session state store
//!
//! Owns the transcript, the active conversation handle and the last turn
//! error for one chat session. Reads are free; mutation goes through the
//! turn controller so the transcript stays append-only.

use crate::llm::{ConversationHandle, ConversationService};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Who wrote a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One transcript entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    role: Role,
    content: String,
    created_at: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Per-user chat state
#[derive(Debug, Clone)]
pub struct Session {
    messages: Vec<Message>,
    /// User message of the turn currently in flight
    pending: Option<Message>,
    conversation: ConversationHandle,
    last_error: Option<String>,
}

impl Session {
    pub fn new(conversation: ConversationHandle) -> Self {
        Self {
            messages: Vec::new(),
            pending: None,
            conversation,
            last_error: None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn pending(&self) -> Option<&Message> {
        self.pending.as_ref()
    }

    pub fn conversation(&self) -> &ConversationHandle {
        &self.conversation
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn stage_user_message(&mut self, text: impl Into<String>) {
        self.pending = Some(Message::user(text));
    }

    /// Commit the pending user message and its reply in one step.
    ///
    /// Returns `false` without touching the transcript if nothing is pending.
    pub(crate) fn commit_exchange(&mut self, reply: impl Into<String>) -> bool {
        let Some(user) = self.pending.take() else {
            return false;
        };
        let assistant = Message::assistant(reply);
        self.conversation
            .record_exchange(user.content(), assistant.content());
        self.messages.push(user);
        self.messages.push(assistant);
        true
    }

    pub(crate) fn discard_pending(&mut self) {
        self.pending = None;
    }

    pub(crate) fn set_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    pub(crate) fn clear_error(&mut self) {
        self.last_error = None;
    }
}

/// Holds the single session of this process and creates it on demand
pub struct SessionStore {
    service: Arc<dyn ConversationService>,
    session: Option<Session>,
}

impl SessionStore {
    pub fn new(service: Arc<dyn ConversationService>) -> Self {
        Self {
            service,
            session: None,
        }
    }

    /// Create the session if it does not exist yet. No-op otherwise.
    pub fn init(&mut self) -> &mut Session {
        let service = &self.service;
        self.session.get_or_insert_with(|| {
            let session = Session::new(service.start_conversation());
            tracing::info!(
                conversation_id = %session.conversation().id(),
                "Session created"
            );
            session
        })
    }

    /// Empty the transcript, clear the error and open a fresh conversation
    pub fn reset(&mut self) -> &mut Session {
        let session = Session::new(self.service.start_conversation());
        tracing::info!(
            conversation_id = %session.conversation().id(),
            "Session reset"
        );
        self.session.insert(session)
    }

    pub fn get(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Drop the session; the next `init` starts over
    pub fn end(&mut self) {
        self.session = None;
    }
}
