//! Turn controller: executes transitions against the session

use super::transition::{transition, TransitionError};
use super::{Effect, Event, TurnError, TurnState};
use crate::llm::{ConversationHandle, ConversationService};
use crate::session::{Message, SessionStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

/// What views render: the transcript plus turn status
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub conversation_id: Uuid,
    pub conversation_started_at: DateTime<Utc>,
    /// Completed exchanges in the current conversation
    pub turns: usize,
    pub messages: Vec<Message>,
    pub pending: Option<Message>,
    pub last_error: Option<String>,
    pub state: TurnState,
    pub model: String,
}

/// How a dispatched turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Failed(String),
}

struct Inner {
    store: SessionStore,
    state: TurnState,
}

/// What one executed transition left behind
struct Step {
    state: TurnState,
    /// Text to send, if the transition requested a turn
    request: Option<String>,
}

/// Owns the session and serializes turns against it
pub struct TurnController {
    inner: Mutex<Inner>,
    service: Arc<dyn ConversationService>,
    render_tx: broadcast::Sender<SessionSnapshot>,
    turn_timeout: Duration,
}

/// A turn that has been accepted and is waiting to be sent
#[must_use = "a pending turn keeps the session busy until it is run"]
pub struct PendingTurn {
    controller: Arc<TurnController>,
    handle: ConversationHandle,
    text: String,
    finished: bool,
}

impl TurnController {
    pub fn new(service: Arc<dyn ConversationService>, turn_timeout: Duration) -> Self {
        let (render_tx, _) = broadcast::channel(64);
        Self {
            inner: Mutex::new(Inner {
                store: SessionStore::new(service.clone()),
                state: TurnState::Idle,
            }),
            service,
            render_tx,
            turn_timeout,
        }
    }

    /// Receive a snapshot every time the view should re-render
    pub fn subscribe(&self) -> broadcast::Receiver<SessionSnapshot> {
        self.render_tx.subscribe()
    }

    /// Current snapshot, creating the session on first use
    pub async fn snapshot(&self) -> SessionSnapshot {
        let mut inner = self.inner.lock().await;
        self.snapshot_of(&mut inner)
    }

    /// Accept a submission.
    ///
    /// Returns `None` when the text is blank; nothing is changed or sent.
    pub async fn begin(
        self: &Arc<Self>,
        text: impl Into<String>,
    ) -> Result<Option<PendingTurn>, TransitionError> {
        let mut inner = self.inner.lock().await;
        inner.store.init();

        let step = self.step(&mut inner, Event::Submit { text: text.into() })?;
        if !matches!(step.state, TurnState::AwaitingInput { .. }) {
            return Ok(None);
        }

        let Some(text) = self.step(&mut inner, Event::Dispatch)?.request else {
            return Err(TransitionError::InvalidTransition(
                "dispatch produced no request".to_string(),
            ));
        };
        let handle = inner.store.init().conversation().clone();

        tracing::info!(
            conversation_id = %handle.id(),
            turn = handle.turns() + 1,
            chars = text.chars().count(),
            "Turn dispatched"
        );

        Ok(Some(PendingTurn {
            controller: Arc::clone(self),
            handle,
            text,
            finished: false,
        }))
    }

    /// Accept a submission and run it to completion
    pub async fn submit(
        self: &Arc<Self>,
        text: impl Into<String>,
    ) -> Result<Option<TurnOutcome>, TransitionError> {
        match self.begin(text).await? {
            Some(pending) => Ok(Some(pending.run().await)),
            None => Ok(None),
        }
    }

    /// Empty the transcript and start a fresh conversation
    pub async fn clear(&self) -> Result<SessionSnapshot, TransitionError> {
        let mut inner = self.inner.lock().await;
        self.step(&mut inner, Event::Clear)?;
        Ok(self.snapshot_of(&mut inner))
    }

    /// Clear the last error
    pub async fn dismiss_error(&self) -> Result<SessionSnapshot, TransitionError> {
        let mut inner = self.inner.lock().await;
        inner.store.init();
        self.step(&mut inner, Event::DismissError)?;
        Ok(self.snapshot_of(&mut inner))
    }

    /// Discard the session; the next read starts a fresh one
    pub async fn end_session(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(session) = inner.store.get() {
            tracing::info!(
                conversation_id = %session.conversation().id(),
                turns = session.conversation().turns(),
                busy = inner.state.is_busy(),
                "Session ended"
            );
        }
        inner.store.end();
    }

    async fn finish(&self, result: Result<String, TurnError>) -> TurnOutcome {
        let mut inner = self.inner.lock().await;
        self.finish_locked(&mut inner, result)
    }

    /// Fail a turn whose `PendingTurn` went away before reporting back
    async fn abandon(&self, conversation_id: Uuid) {
        let mut inner = self.inner.lock().await;
        if inner.state != TurnState::Sending {
            return;
        }
        tracing::warn!(%conversation_id, "Turn dropped before its outcome arrived");
        self.finish_locked(
            &mut inner,
            Err(TurnError::Unexpected("turn aborted".to_string())),
        );
    }

    fn finish_locked(&self, inner: &mut Inner, result: Result<String, TurnError>) -> TurnOutcome {
        let event = match result {
            Ok(text) => Event::ReplyReceived { text },
            Err(error) => Event::TurnFailed { error },
        };

        let outcome = match self.step(inner, event).map(|step| step.state) {
            Ok(TurnState::Failed { message }) => TurnOutcome::Failed(message),
            Ok(_) => TurnOutcome::Completed,
            Err(e) => {
                tracing::error!(error = %e, "Turn outcome rejected");
                return TurnOutcome::Failed(e.to_string());
            }
        };

        if let Err(e) = self.step(inner, Event::Settle) {
            tracing::error!(error = %e, "Failed to settle turn");
        }
        outcome
    }

    /// Run one transition and execute its effects
    fn step(&self, inner: &mut Inner, event: Event) -> Result<Step, TransitionError> {
        let result = transition(&inner.state, event)?;
        inner.state = result.new_state.clone();

        let mut request = None;
        let mut render = false;
        for effect in result.effects {
            match effect {
                Effect::StageUserMessage { text } => {
                    inner.store.init().stage_user_message(text);
                }
                Effect::RequestTurn { text } => request = Some(text),
                Effect::CommitExchange { reply } => {
                    if !inner.store.init().commit_exchange(reply) {
                        tracing::warn!("Reply arrived with no pending user message");
                    }
                }
                Effect::DiscardPending => inner.store.init().discard_pending(),
                Effect::SetError { message } => {
                    tracing::warn!(error = %message, "Turn failed");
                    inner.store.init().set_error(message);
                }
                Effect::ClearError => inner.store.init().clear_error(),
                Effect::ResetSession => {
                    inner.store.reset();
                }
                Effect::Render => render = true,
            }
        }

        if render {
            let snapshot = self.snapshot_of(inner);
            // No subscribers is fine
            let _ = self.render_tx.send(snapshot);
        }

        Ok(Step {
            state: result.new_state,
            request,
        })
    }

    fn snapshot_of(&self, inner: &mut Inner) -> SessionSnapshot {
        let state = inner.state.clone();
        let session = inner.store.init();
        SessionSnapshot {
            conversation_id: session.conversation().id(),
            conversation_started_at: session.conversation().started_at(),
            turns: session.conversation().turns(),
            messages: session.messages().to_vec(),
            pending: session.pending().cloned(),
            last_error: session.last_error().map(str::to_string),
            state,
            model: self.service.model_id().to_string(),
        }
    }
}

impl PendingTurn {
    /// Send the turn and apply its outcome to the session
    pub async fn run(mut self) -> TurnOutcome {
        let controller = Arc::clone(&self.controller);
        let timeout = controller.turn_timeout;
        let result = match tokio::time::timeout(
            timeout,
            controller.service.send_turn(&self.handle, &self.text),
        )
        .await
        {
            Ok(Ok(reply)) => Ok(reply.text),
            Ok(Err(e)) => Err(TurnError::from(e)),
            Err(_) => Err(TurnError::Timeout(format!(
                "no response within {}s",
                timeout.as_secs()
            ))),
        };

        let outcome = controller.finish(result).await;
        self.finished = true;

        let conversation_id = self.handle.id();
        match &outcome {
            TurnOutcome::Completed => {
                tracing::info!(%conversation_id, "Turn completed");
            }
            TurnOutcome::Failed(message) => {
                tracing::info!(%conversation_id, error = %message, "Turn failed");
            }
        }
        outcome
    }
}

/// Releases the session if the turn is aborted or panics mid-flight
impl Drop for PendingTurn {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let controller = Arc::clone(&self.controller);
        let conversation_id = self.handle.id();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move { controller.abandon(conversation_id).await });
            }
            Err(_) => {
                tracing::error!(%conversation_id, "Turn dropped outside the runtime; session stays busy");
            }
        }
    }
}
