use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tracing::debug;
use uuid::Uuid;

use crate::{disambiguation::ClarificationState, error::Result, intent::Intent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One line of a conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: MessageRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// State of one conversation across request/response turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    pub id: String,
    /// Set while a disambiguation is waiting for the user's reply.
    pub pending: Option<ClarificationState>,
    pub last_intent: Option<Intent>,
    pub transcript: Vec<TranscriptEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationSession {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            pending: None,
            last_intent: None,
            transcript: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn new_random() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn is_waiting_for_input(&self) -> bool {
        self.pending.is_some()
    }

    /// Append to the transcript, keeping at most `max_messages` entries.
    pub fn record(&mut self, role: MessageRole, text: impl Into<String>, max_messages: usize) {
        let timestamp = Utc::now();
        self.transcript.push(TranscriptEntry {
            role,
            text: text.into(),
            timestamp,
        });
        if self.transcript.len() > max_messages {
            let excess = self.transcript.len() - max_messages;
            self.transcript.drain(..excess);
        }
        self.updated_at = timestamp;
    }
}

/// Trait for storing and retrieving conversation sessions
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn save(&self, session: ConversationSession) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<ConversationSession>>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// In-memory implementation of SessionStorage
///
/// With a TTL, sessions whose `updated_at` is older than the TTL are invisible
/// to `get` and are swept out on every `save`.
#[derive(Default)]
pub struct InMemorySessionStorage {
    sessions: Arc<DashMap<String, ConversationSession>>,
    ttl: Option<TimeDelta>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl: None,
        }
    }

    /// Storage that evicts sessions idle for longer than `ttl`.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl: TimeDelta::from_std(ttl).ok(),
        }
    }

    /// Drop every session last updated before `cutoff`, returning how many went.
    pub fn purge_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.updated_at >= cutoff);
        let purged = before.saturating_sub(self.sessions.len());
        if purged > 0 {
            debug!(purged, remaining = self.sessions.len(), "Expired sessions purged");
        }
        purged
    }

    fn cutoff(&self) -> Option<DateTime<Utc>> {
        self.ttl.and_then(|ttl| Utc::now().checked_sub_signed(ttl))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn save(&self, session: ConversationSession) -> Result<()> {
        if let Some(cutoff) = self.cutoff() {
            self.purge_older_than(cutoff);
        }
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ConversationSession>> {
        let session = self.sessions.get(id).map(|entry| entry.clone());
        match (session, self.cutoff()) {
            (Some(session), Some(cutoff)) if session.updated_at < cutoff => {
                self.sessions.remove(id);
                Ok(None)
            }
            (session, _) => Ok(session),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }
}
