//! Message and content block types for Playdo conversations.
//!
//! A [`Message`] is one turn of a conversation. User turns may carry the
//! student's editor context: the code in the editor and the output of the
//! last run. Each of those is an `Option<String>` where `None` means "not
//! applicable / not run" and `Some("")` means "captured, and it was empty".
//! The two states are never conflated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::conversation::ConversationId;

/// Role of a message within a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// Atomic unit of message text.
///
/// Serialized as `{"type": "text", "text": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

impl ContentBlock {
    /// Create a text block.
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    /// The text carried by this block.
    pub fn as_text(&self) -> &str {
        match self {
            ContentBlock::Text { text } => text,
        }
    }
}

/// Violations of the editor-context invariants on a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("stdout/stderr were supplied without editor code")]
    OutputWithoutCode,

    #[error("stdout and stderr must both be present or both be absent")]
    UnpairedOutput,
}

/// One turn in a conversation.
///
/// Fields are private so that every `Message` in existence satisfies the
/// context invariants:
/// - no `stdout`/`stderr` without `editor_code`;
/// - `stdout` and `stderr` are both present or both absent.
///
/// Deserialization runs through the same validation as [`Message::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MessageFields")]
pub struct Message {
    role: MessageRole,
    content: Vec<ContentBlock>,
    editor_code: Option<String>,
    stdout: Option<String>,
    stderr: Option<String>,
}

/// Unvalidated wire shape of a [`Message`].
#[derive(Deserialize)]
struct MessageFields {
    role: MessageRole,
    content: Vec<ContentBlock>,
    #[serde(default)]
    editor_code: Option<String>,
    #[serde(default)]
    stdout: Option<String>,
    #[serde(default)]
    stderr: Option<String>,
}

impl TryFrom<MessageFields> for Message {
    type Error = ValidationError;

    fn try_from(fields: MessageFields) -> Result<Self, Self::Error> {
        Message::new(
            fields.role,
            fields.content,
            fields.editor_code,
            fields.stdout,
            fields.stderr,
        )
    }
}

impl Message {
    /// Build a message, enforcing the editor-context invariants.
    pub fn new(
        role: MessageRole,
        content: Vec<ContentBlock>,
        editor_code: Option<String>,
        stdout: Option<String>,
        stderr: Option<String>,
    ) -> Result<Self, ValidationError> {
        if editor_code.is_none() && (stdout.is_some() || stderr.is_some()) {
            return Err(ValidationError::OutputWithoutCode);
        }
        if stdout.is_some() != stderr.is_some() {
            return Err(ValidationError::UnpairedOutput);
        }

        Ok(Self {
            role,
            content,
            editor_code,
            stdout,
            stderr,
        })
    }

    /// A user message with a single text block and optional editor context.
    pub fn user(
        text: impl Into<String>,
        editor_code: Option<String>,
        stdout: Option<String>,
        stderr: Option<String>,
    ) -> Result<Self, ValidationError> {
        Self::new(
            MessageRole::User,
            vec![ContentBlock::text(text)],
            editor_code,
            stdout,
            stderr,
        )
    }

    /// An assistant reply. Assistant turns never carry editor context.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: vec![ContentBlock::text(text)],
            editor_code: None,
            stdout: None,
            stderr: None,
        }
    }

    pub fn role(&self) -> MessageRole {
        self.role
    }

    pub fn content(&self) -> &[ContentBlock] {
        &self.content
    }

    pub fn editor_code(&self) -> Option<&str> {
        self.editor_code.as_deref()
    }

    pub fn stdout(&self) -> Option<&str> {
        self.stdout.as_deref()
    }

    pub fn stderr(&self) -> Option<&str> {
        self.stderr.as_deref()
    }

    /// The rendered text of the turn: all text blocks joined by a single space.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether this message carries any editor context.
    pub fn has_context(&self) -> bool {
        self.editor_code.is_some()
    }
}

/// A message as persisted within a conversation.
///
/// `sequence_number` is unique and contiguous within the conversation and
/// defines turn order (starting at 0).
#[derive(Debug, Clone, Serialize)]
pub struct StoredMessage {
    pub id: Uuid,
    pub conversation_id: ConversationId,
    pub sequence_number: u32,
    #[serde(flatten)]
    pub message: Message,
    pub created_at: DateTime<Utc>,
}
