//! Conversation types for Playdo.
//!
//! A conversation is an ordered sequence of messages between a student and
//! the tutor. It owns its messages exclusively.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::message::{Message, StoredMessage};

/// Unique identifier for a conversation, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub Uuid);

impl ConversationId {
    /// Create a new ConversationId using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConversationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A conversation with its full, ordered message history.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Messages ordered by `sequence_number`.
    pub messages: Vec<StoredMessage>,
}

impl Conversation {
    /// A new conversation with no messages.
    pub fn empty() -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
        }
    }

    /// The sequence number the next appended message must take.
    pub fn next_sequence_number(&self) -> u32 {
        self.messages
            .last()
            .map(|m| m.sequence_number + 1)
            .unwrap_or(0)
    }

    /// The messages in turn order, without persistence metadata.
    pub fn history(&self) -> Vec<Message> {
        self.messages.iter().map(|m| m.message.clone()).collect()
    }

    /// Append a message that has just been persisted.
    pub fn push(&mut self, message: StoredMessage) {
        self.updated_at = message.created_at;
        self.messages.push(message);
    }
}

/// Lightweight listing row for a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: u32,
}
