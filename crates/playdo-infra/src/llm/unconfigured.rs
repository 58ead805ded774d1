//! Placeholder provider used when no upstream credentials are configured.

use playdo_core::llm::provider::LlmProvider;
use playdo_types::llm::UpstreamError;
use playdo_types::message::Message;

use crate::config::ANTHROPIC_API_KEY_ENV;

/// Fails every call with [`UpstreamError::NotConfigured`].
pub struct UnconfiguredProvider {
    model: String,
}

impl UnconfiguredProvider {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
        }
    }
}

impl LlmProvider for UnconfiguredProvider {
    fn name(&self) -> &str {
        "unconfigured"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn reply(&self, _history: &[Message]) -> Result<Message, UpstreamError> {
        Err(UpstreamError::NotConfigured(format!(
            "set {ANTHROPIC_API_KEY_ENV} to enable tutor replies"
        )))
    }
}
