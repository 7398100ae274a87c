//! Ordered conversation log shared by the orchestrator and dialogue handlers.
//!
//! Every append and delete goes through one mutex, so `recent(n)` always
//! returns a consistent snapshot and never a partially applied append.

use crate::error::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Speaker id used for coaching messages the agent issues to itself.
pub const COACH_SPEAKER: &str = "System";

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire name used by chat-completion APIs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single exchanged message. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub speaker_id: String,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, speaker_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role,
            speaker_id: speaker_id.into(),
            content: content.into(),
        }
    }

    /// System prompts and self-coaching lines, whatever role they were
    /// issued with. These are instructions to the model, not conversation.
    pub fn is_coaching(&self) -> bool {
        self.role == Role::System || self.speaker_id.eq_ignore_ascii_case(COACH_SPEAKER)
    }
}

/// Append-only message log with bounded-window reads.
#[derive(Debug, Default)]
pub struct TurnHistory {
    messages: Mutex<Vec<Message>>,
}

impl TurnHistory {
    /// Create a history seeded with one system message.
    pub fn seeded(speaker_id: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            messages: Mutex::new(vec![Message::new(Role::System, speaker_id, system_prompt)]),
        }
    }

    /// Create an empty history. Sessions normally use [`TurnHistory::seeded`].
    pub fn empty() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Message>> {
        // A poisoned lock only means a reader panicked; the Vec itself is intact.
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn append(&self, role: Role, speaker_id: impl Into<String>, content: impl Into<String>) {
        self.push(Message::new(role, speaker_id, content));
    }

    pub fn push(&self, message: Message) {
        self.lock().push(message);
    }

    /// Remove and return the most recently appended message.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::EmptyHistory`] when there is nothing to delete.
    pub fn delete_most_recent(&self) -> Result<Message> {
        self.lock().pop().ok_or(AgentError::EmptyHistory)
    }

    /// The last `n` messages in original order (`n` clamped to the length).
    pub fn recent(&self, n: usize) -> Vec<Message> {
        let messages = self.lock();
        let start = messages.len().saturating_sub(n);
        messages[start..].to_vec()
    }

    pub fn most_recent(&self) -> Option<Message> {
        self.lock().last().cloned()
    }

    pub fn most_recent_role(&self) -> Option<Role> {
        self.lock().last().map(|m| m.role)
    }

    pub fn most_recent_content(&self) -> Option<String> {
        self.lock().last().map(|m| m.content.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
