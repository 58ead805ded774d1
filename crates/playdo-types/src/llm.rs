//! Upstream language-model error type.
//!
//! Every failure of the remote model call (transport, HTTP status, timeout,
//! unparseable body) is reported as an [`UpstreamError`]. The turn protocol
//! never retries these itself.

use std::time::Duration;

/// Errors from the upstream language-model call.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Transport(String),

    #[error("upstream returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("upstream overloaded: {0}")]
    Overloaded(String),

    #[error("authentication with upstream failed")]
    AuthenticationFailed,

    #[error("upstream call timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),

    #[error("no upstream provider configured: {0}")]
    NotConfigured(String),
}

impl UpstreamError {
    /// Whether resubmitting the same turn later may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            UpstreamError::AuthenticationFailed | UpstreamError::NotConfigured(_)
        )
    }
}
