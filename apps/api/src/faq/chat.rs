use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::{AppError, ValidationError};
use crate::faq::knowledge_base::{FaqEntry, GREETING};
use crate::faq::matcher::answer;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: u64,
    pub origin: Origin,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// One conversation with the assistant. Lives only as long as the store keeps it.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub messages: Vec<ChatMessage>,
    #[serde(skip)]
    next_message_id: u64,
}

impl ChatSession {
    pub fn new(owner_id: Uuid) -> Self {
        let mut session = Self {
            id: Uuid::new_v4(),
            owner_id,
            messages: Vec::new(),
            next_message_id: 1,
        };
        session.push(Origin::Assistant, GREETING.to_string());
        session
    }

    fn push(&mut self, origin: Origin, text: String) -> ChatMessage {
        let message = ChatMessage {
            id: self.next_message_id,
            origin,
            text,
            created_at: Utc::now(),
        };
        self.next_message_id += 1;
        self.messages.push(message.clone());
        message
    }

    /// Records the user's text and the assistant's reply, returning both.
    pub fn submit(
        &mut self,
        text: &str,
        knowledge_base: &[FaqEntry],
    ) -> Result<(ChatMessage, ChatMessage), ValidationError> {
        if text.trim().is_empty() {
            return Err(ValidationError::MissingField("text"));
        }
        let user = self.push(Origin::User, text.to_string());
        let reply = answer(text, knowledge_base).to_string();
        let assistant = self.push(Origin::Assistant, reply);
        Ok((user, assistant))
    }
}

/// In-memory registry of open chat sessions, scoped per owner.
pub struct ChatStore {
    knowledge_base: &'static [FaqEntry],
    sessions: RwLock<HashMap<Uuid, ChatSession>>,
}

impl ChatStore {
    pub fn new(knowledge_base: &'static [FaqEntry]) -> Self {
        Self {
            knowledge_base,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn open(&self, owner_id: Uuid) -> ChatSession {
        let session = ChatSession::new(owner_id);
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        session
    }

    pub async fn get(&self, owner_id: Uuid, session_id: Uuid) -> Result<ChatSession, AppError> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .ok_or_else(|| not_found(session_id))
    }

    pub async fn submit(
        &self,
        owner_id: Uuid,
        session_id: Uuid,
        text: &str,
    ) -> Result<(ChatMessage, ChatMessage), AppError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .filter(|s| s.owner_id == owner_id)
            .ok_or_else(|| not_found(session_id))?;
        Ok(session.submit(text, self.knowledge_base)?)
    }

    pub async fn close(&self, owner_id: Uuid, session_id: Uuid) -> Result<(), AppError> {
        let mut sessions = self.sessions.write().await;
        let owned = sessions
            .get(&session_id)
            .is_some_and(|s| s.owner_id == owner_id);
        if !owned {
            return Err(not_found(session_id));
        }
        sessions.remove(&session_id);
        Ok(())
    }

    /// Drops every session owned by `owner_id`; called when the owner signs out.
    pub async fn close_all_for(&self, owner_id: Uuid) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.owner_id != owner_id);
        before - sessions.len()
    }
}

fn not_found(session_id: Uuid) -> AppError {
    AppError::NotFound(format!("Chat session {session_id} not found"))
}
