//! AnthropicProvider -- concrete [`LlmProvider`] implementation for Anthropic Claude.
//!
//! Sends non-streaming requests to the Anthropic Messages API (`/v1/messages`)
//! with proper authentication headers. Request and response mapping is done
//! by [`AnthropicAdapter`]; this module only moves bytes and maps HTTP failures.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use playdo_core::llm::provider::{LlmProvider, UpstreamAdapter};
use playdo_types::llm::UpstreamError;
use playdo_types::message::Message;

use super::adapter::AnthropicAdapter;
use super::types::{AnthropicErrorBody, AnthropicResponse};

/// Anthropic Claude upstream provider.
///
/// Does not derive Debug; the API key is only exposed when building
/// request headers.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    adapter: AnthropicAdapter,
    timeout: Duration,
}

impl AnthropicProvider {
    /// The Anthropic API version header value.
    const API_VERSION: &'static str = "2023-06-01";

    /// Create a new Anthropic provider.
    ///
    /// `timeout` bounds each HTTP request.
    pub fn new(
        api_key: SecretString,
        adapter: AnthropicAdapter,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: "https://api.anthropic.com".to_string(),
            adapter,
            timeout,
        })
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Build the full API URL for a given path.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        self.adapter.model()
    }

    async fn reply(&self, history: &[Message]) -> Result<Message, UpstreamError> {
        let body = self.adapter.to_upstream_request(history);
        let url = self.url("/v1/messages");

        tracing::debug!(
            model = %body.model,
            messages = body.messages.len(),
            "Sending request to Anthropic"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", Self::API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let error_body = response.text().await.unwrap_or_default();
            return Err(error_for_status(
                status.as_u16(),
                retry_after.as_deref(),
                &error_body,
            ));
        }

        let anthropic_resp: AnthropicResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout(self.timeout)
            } else {
                UpstreamError::MalformedResponse(format!("failed to parse response: {e}"))
            }
        })?;

        tracing::debug!(
            id = %anthropic_resp.id,
            stop_reason = ?anthropic_resp.stop_reason,
            input_tokens = anthropic_resp.usage.input_tokens,
            output_tokens = anthropic_resp.usage.output_tokens,
            "Anthropic response received"
        );

        self.adapter.from_upstream_response(anthropic_resp)
    }
}

impl AnthropicProvider {
    fn transport_error(&self, e: reqwest::Error) -> UpstreamError {
        if e.is_timeout() {
            UpstreamError::Timeout(self.timeout)
        } else {
            UpstreamError::Transport(format!("HTTP request failed: {e}"))
        }
    }
}

/// Map a non-2xx response to an [`UpstreamError`].
fn error_for_status(status: u16, retry_after: Option<&str>, body: &str) -> UpstreamError {
    let message = serde_json::from_str::<AnthropicErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        401 => UpstreamError::AuthenticationFailed,
        429 => UpstreamError::RateLimited {
            retry_after_ms: retry_after
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(|secs| secs * 1000),
        },
        529 => UpstreamError::Overloaded(message),
        _ => UpstreamError::Http { status, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> AnthropicProvider {
        AnthropicProvider::new(
            SecretString::from("sk-ant-test-not-real"),
            AnthropicAdapter::new("claude-sonnet-4-20250514".into(), 2000, "tutor".into()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_url_joins_base_and_path() {
        let p = provider().with_base_url("http://localhost:8080/".into());
        assert_eq!(p.url("/v1/messages"), "http://localhost:8080/v1/messages");
    }

    #[test]
    fn test_name_and_model() {
        let p = provider();
        assert_eq!(p.name(), "anthropic");
        assert_eq!(p.model(), "claude-sonnet-4-20250514");
    }

    #[test]
    fn test_status_401_is_auth_failure() {
        assert!(matches!(
            error_for_status(401, None, ""),
            UpstreamError::AuthenticationFailed
        ));
    }

    #[test]
    fn test_status_429_reads_retry_after() {
        match error_for_status(429, Some("7"), "") {
            UpstreamError::RateLimited { retry_after_ms } => assert_eq!(retry_after_ms, Some(7000)),
            other => panic!("expected RateLimited, got {other:?}"),
        }
        match error_for_status(429, Some("soon"), "") {
            UpstreamError::RateLimited { retry_after_ms } => assert_eq!(retry_after_ms, None),
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn test_status_529_is_overloaded_with_api_message() {
        let body = r#"{"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}}"#;
        match error_for_status(529, None, body) {
            UpstreamError::Overloaded(message) => assert_eq!(message, "Overloaded"),
            other => panic!("expected Overloaded, got {other:?}"),
        }
    }

    #[test]
    fn test_other_status_keeps_raw_body() {
        match error_for_status(500, None, "upstream exploded") {
            UpstreamError::Http { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "upstream exploded");
            }
            other => panic!("expected Http, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        // Port 9 (discard) on localhost is almost never listening
        let p = provider().with_base_url("http://127.0.0.1:9".into());
        let history = vec![Message::user("Hello", None, None, None).unwrap()];
        let err = p.reply(&history).await.unwrap_err();
        assert!(matches!(
            err,
            UpstreamError::Transport(_) | UpstreamError::Timeout(_)
        ));
    }
}
