//! LlmProvider and UpstreamAdapter trait definitions.
//!
//! `LlmProvider` is the seam the turn service talks to. `UpstreamAdapter`
//! is the conversion bubble around a provider's wire schema: two pure
//! functions and no I/O, so the schema mapping can be tested without a
//! network.

use playdo_types::llm::UpstreamError;
use playdo_types::message::Message;

/// Trait for upstream model backends.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
/// Implementations live in playdo-infra (e.g., `AnthropicProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "anthropic").
    fn name(&self) -> &str;

    /// Model identifier sent upstream.
    fn model(&self) -> &str;

    /// Send the full ordered history and receive the tutor's reply.
    ///
    /// The returned message always has the assistant role and no editor
    /// context. Implementations never retry and never persist anything.
    fn reply(
        &self,
        history: &[Message],
    ) -> impl std::future::Future<Output = Result<Message, UpstreamError>> + Send;
}

/// Conversion between Playdo messages and one upstream wire schema.
pub trait UpstreamAdapter: Send + Sync {
    /// Request body sent upstream.
    type Request;
    /// Parsed response body received from upstream.
    type Response;

    /// Build the upstream request for the full ordered history.
    fn to_upstream_request(&self, history: &[Message]) -> Self::Request;

    /// Turn an upstream response into an assistant message.
    fn from_upstream_response(&self, response: Self::Response) -> Result<Message, UpstreamError>;
}
