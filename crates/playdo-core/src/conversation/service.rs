//! Tutor service running the conversation turn protocol.
//!
//! A turn is strictly sequential:
//!
//! 1. validate the user message
//! 2. persist it at the conversation's next sequence number
//! 3. send the full history upstream (bounded by a timeout)
//! 4. persist the assistant reply at the following sequence number
//! 5. return the updated conversation
//!
//! The user message is saved before any network call and stays saved if
//! the upstream call fails or the caller goes away.

use std::time::{Duration, Instant};

use playdo_types::conversation::{Conversation, ConversationId, ConversationSummary};
use playdo_types::error::RepositoryError;
use playdo_types::llm::UpstreamError;
use playdo_types::message::{Message, MessageRole, ValidationError};
use tracing::{debug, info, warn};

use crate::conversation::repository::ConversationRepository;
use crate::llm::provider::LlmProvider;

/// Default bound on a single upstream call.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(120);

/// A student's message with optional editor context, as submitted by a client.
#[derive(Debug, Clone, Default)]
pub struct SendMessage {
    pub message: String,
    pub editor_code: Option<String>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl SendMessage {
    /// A message with no editor context.
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// Validate into a user [`Message`].
    pub fn into_message(self) -> Result<Message, ValidationError> {
        Message::user(self.message, self.editor_code, self.stdout, self.stderr)
    }
}

/// Ways a conversation turn can fail.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("conversation {0} not found")]
    ConversationNotFound(ConversationId),

    /// Another writer took the sequence number; the turn may be retried.
    #[error("sequence conflict: {0}")]
    Conflict(String),

    /// Storage failed before the user message was saved.
    #[error("persistence error: {0}")]
    Persistence(#[source] RepositoryError),

    /// The upstream call failed after the user message was saved.
    #[error("upstream error (user message saved at sequence {user_sequence}): {source}")]
    Upstream {
        user_sequence: u32,
        #[source]
        source: UpstreamError,
    },

    /// The reply arrived but could not be saved.
    #[error("assistant reply could not be saved: {source}")]
    ReplyNotSaved {
        reply: String,
        #[source]
        source: RepositoryError,
    },
}

impl TurnError {
    fn from_repository(conversation_id: ConversationId, err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => TurnError::ConversationNotFound(conversation_id),
            RepositoryError::Conflict(msg) => TurnError::Conflict(msg),
            other => TurnError::Persistence(other),
        }
    }
}

/// Orchestrates conversations between a student and the upstream tutor.
///
/// Generic over `ConversationRepository` and `LlmProvider` so playdo-core
/// never depends on playdo-infra.
pub struct TutorService<R: ConversationRepository, P: LlmProvider> {
    repo: R,
    provider: P,
    upstream_timeout: Duration,
}

impl<R: ConversationRepository, P: LlmProvider> TutorService<R, P> {
    /// Create a service with the default upstream timeout.
    pub fn new(repo: R, provider: P) -> Self {
        Self {
            repo,
            provider,
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }

    /// Override the bound on a single upstream call.
    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }

    /// Access the conversation repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Access the upstream provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn upstream_timeout(&self) -> Duration {
        self.upstream_timeout
    }

    /// Create a new empty conversation.
    pub async fn create_conversation(&self) -> Result<Conversation, RepositoryError> {
        let conversation = self
            .repo
            .create_conversation(&Conversation::empty())
            .await?;
        info!(conversation_id = %conversation.id, "Conversation created");
        Ok(conversation)
    }

    /// Get a conversation with its messages.
    pub async fn get_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        self.repo.get_conversation(id).await
    }

    /// List all conversations, most recently updated first.
    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, RepositoryError> {
        self.repo.list_conversations().await
    }

    /// Delete a conversation and all its messages.
    pub async fn delete_conversation(&self, id: &ConversationId) -> Result<(), RepositoryError> {
        self.repo.delete_conversation(id).await?;
        info!(conversation_id = %id, "Conversation deleted");
        Ok(())
    }

    /// Run one turn: save the user message, ask the tutor, save the reply.
    ///
    /// Returns the full conversation including both new messages.
    pub async fn send_message(
        &self,
        conversation_id: &ConversationId,
        request: SendMessage,
    ) -> Result<Conversation, TurnError> {
        let user_message = request.into_message()?;

        let mut conversation = self
            .repo
            .get_conversation(conversation_id)
            .await
            .map_err(|e| TurnError::from_repository(*conversation_id, e))?
            .ok_or(TurnError::ConversationNotFound(*conversation_id))?;

        let user_sequence = conversation.next_sequence_number();
        let saved_user = self
            .repo
            .append_message(conversation_id, user_sequence, &user_message)
            .await
            .map_err(|e| TurnError::from_repository(*conversation_id, e))?;
        conversation.push(saved_user);
        debug!(
            conversation_id = %conversation_id,
            sequence_number = user_sequence,
            has_context = user_message.has_context(),
            "User message saved"
        );

        let history = conversation.history();
        let started = Instant::now();
        let reply = match tokio::time::timeout(self.upstream_timeout, self.provider.reply(&history))
            .await
        {
            Ok(Ok(reply)) if reply.role() == MessageRole::Assistant => reply,
            Ok(Ok(reply)) => {
                return Err(self.upstream_failed(
                    conversation_id,
                    user_sequence,
                    UpstreamError::MalformedResponse(format!(
                        "expected an assistant reply, got role '{}'",
                        reply.role()
                    )),
                ));
            }
            Ok(Err(source)) => {
                return Err(self.upstream_failed(conversation_id, user_sequence, source));
            }
            Err(_) => {
                return Err(self.upstream_failed(
                    conversation_id,
                    user_sequence,
                    UpstreamError::Timeout(self.upstream_timeout),
                ));
            }
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let reply_sequence = user_sequence + 1;
        let saved_reply = self
            .repo
            .append_message(conversation_id, reply_sequence, &reply)
            .await
            .map_err(|source| {
                warn!(
                    conversation_id = %conversation_id,
                    sequence_number = reply_sequence,
                    error = %source,
                    "Assistant reply could not be saved"
                );
                TurnError::ReplyNotSaved {
                    reply: reply.text(),
                    source,
                }
            })?;
        conversation.push(saved_reply);

        info!(
            conversation_id = %conversation_id,
            sequence_number = reply_sequence,
            model = self.provider.model(),
            elapsed_ms,
            "Turn complete"
        );

        Ok(conversation)
    }

    fn upstream_failed(
        &self,
        conversation_id: &ConversationId,
        user_sequence: u32,
        source: UpstreamError,
    ) -> TurnError {
        warn!(
            conversation_id = %conversation_id,
            sequence_number = user_sequence,
            provider = self.provider.name(),
            error = %source,
            "Upstream call failed; user message kept"
        );
        TurnError::Upstream {
            user_sequence,
            source,
        }
    }
}
