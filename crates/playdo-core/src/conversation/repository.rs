//! ConversationRepository trait definition.
//!
//! Provides conversation and message persistence for the turn protocol.
//! Follows the RPITIT pattern used across Playdo's repository traits.

use playdo_types::conversation::{Conversation, ConversationId, ConversationSummary};
use playdo_types::error::RepositoryError;
use playdo_types::message::{Message, StoredMessage};

/// Repository trait for conversation and message persistence.
///
/// Implementations live in playdo-infra (e.g., `SqliteConversationRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait ConversationRepository: Send + Sync {
    /// Persist a new, empty conversation.
    fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> impl std::future::Future<Output = Result<Conversation, RepositoryError>> + Send;

    /// Get a conversation with all its messages, ordered by sequence number.
    fn get_conversation(
        &self,
        id: &ConversationId,
    ) -> impl std::future::Future<Output = Result<Option<Conversation>, RepositoryError>> + Send;

    /// List all conversations, most recently updated first.
    fn list_conversations(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<ConversationSummary>, RepositoryError>> + Send;

    /// Append a message at `sequence_number`.
    ///
    /// Succeeds only if `sequence_number` is the conversation's next free
    /// position. Returns `Conflict` when another writer got there first (or
    /// the number is stale) and `NotFound` when the conversation does not
    /// exist. Bumps the conversation's `updated_at` atomically with the insert.
    fn append_message(
        &self,
        conversation_id: &ConversationId,
        sequence_number: u32,
        message: &Message,
    ) -> impl std::future::Future<Output = Result<StoredMessage, RepositoryError>> + Send;

    /// Messages of a conversation, ordered by sequence number.
    fn list_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> impl std::future::Future<Output = Result<Vec<StoredMessage>, RepositoryError>> + Send;

    /// Delete a conversation and its messages. `NotFound` if it does not exist.
    fn delete_conversation(
        &self,
        id: &ConversationId,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
