//! Conversion between Playdo messages and the Anthropic Messages API.
//!
//! Each message goes upstream as one text block holding its XML projection,
//! so the model sees the student's code and run output alongside the text.

use playdo_core::llm::provider::UpstreamAdapter;
use playdo_core::xml::to_xml;
use playdo_types::llm::UpstreamError;
use playdo_types::message::Message;

use super::types::{AnthropicContentBlock, AnthropicMessage, AnthropicRequest, AnthropicRequestBlock, AnthropicResponse};

/// Request settings shared by every call.
#[derive(Debug, Clone)]
pub struct AnthropicAdapter {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl AnthropicAdapter {
    pub fn new(model: String, max_tokens: u32, system_prompt: String) -> Self {
        Self {
            model,
            max_tokens,
            system_prompt,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl UpstreamAdapter for AnthropicAdapter {
    type Request = AnthropicRequest;
    type Response = AnthropicResponse;

    fn to_upstream_request(&self, history: &[Message]) -> AnthropicRequest {
        let messages = history
            .iter()
            .map(|m| AnthropicMessage {
                role: m.role().to_string(),
                content: vec![AnthropicRequestBlock::Text { text: to_xml(m) }],
            })
            .collect();

        AnthropicRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages,
            system: Some(self.system_prompt.clone()),
            stream: false,
        }
    }

    fn from_upstream_response(&self, response: AnthropicResponse) -> Result<Message, UpstreamError> {
        if response.role != "assistant" {
            return Err(UpstreamError::MalformedResponse(format!(
                "expected role 'assistant', got '{}'",
                response.role
            )));
        }

        let texts: Vec<String> = response
            .content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicContentBlock::Text { text } => Some(text),
                AnthropicContentBlock::Other => None,
            })
            .collect();

        if texts.is_empty() {
            return Err(UpstreamError::MalformedResponse(format!(
                "response {} contained no text content",
                response.id
            )));
        }

        Ok(Message::assistant(texts.concat()))
    }
}
