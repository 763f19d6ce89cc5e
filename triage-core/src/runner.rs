//! TurnRunner – convenience wrapper that loads (or creates) a conversation session, handles
//! exactly **one** user message, and persists the updated session back to storage.
//!
//! Services create one `TurnRunner` at startup and share it across requests; each request maps
//! to a single [`run`](TurnRunner::run) call. A disambiguation that needs more detail stays
//! parked in the stored session until the next call for the same session id.

use std::sync::Arc;

use tracing::info;

use crate::{
    dispatcher::Dispatcher,
    error::{Result, TriageError},
    intent::Intent,
    response::DispatchResponse,
    session::{ConversationSession, MessageRole, SessionStorage},
};

/// What one turn produced, along with the session it belongs to.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub session_id: String,
    pub intent: Option<Intent>,
    pub intent_confidence: Option<f64>,
    pub response: DispatchResponse,
    pub waiting_for_input: bool,
}

/// High-level helper that orchestrates the _load → handle → save_ pattern.
#[derive(Clone)]
pub struct TurnRunner {
    dispatcher: Arc<Dispatcher>,
    storage: Arc<dyn SessionStorage>,
    max_transcript_messages: usize,
}

impl TurnRunner {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        storage: Arc<dyn SessionStorage>,
        max_transcript_messages: usize,
    ) -> Self {
        Self {
            dispatcher,
            storage,
            max_transcript_messages,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.storage
    }

    /// Handle `text` within the session `session_id`, or within a new session when `None`.
    ///
    /// An id that is not in storage is a [`TriageError::SessionNotFound`].
    pub async fn run(&self, session_id: Option<&str>, text: &str) -> Result<TurnOutcome> {
        // 1. Load or create session
        let mut session = match session_id {
            Some(id) => self
                .storage
                .get(id)
                .await?
                .ok_or_else(|| TriageError::SessionNotFound(id.to_string()))?,
            None => {
                let session = ConversationSession::new_random();
                info!(session_id = %session.id, "Creating new session");
                session
            }
        };

        // 2. Handle exactly one message
        session.record(MessageRole::User, text, self.max_transcript_messages);
        let turn = self.dispatcher.handle_turn(&mut session, text).await;
        session.record(
            MessageRole::Assistant,
            turn.response.message(),
            self.max_transcript_messages,
        );

        let outcome = TurnOutcome {
            session_id: session.id.clone(),
            intent: turn.intent,
            intent_confidence: turn.intent_confidence,
            waiting_for_input: session.is_waiting_for_input(),
            response: turn.response,
        };

        // 3. Persist so the next call starts where we left off
        self.storage.save(session).await?;

        Ok(outcome)
    }
}
