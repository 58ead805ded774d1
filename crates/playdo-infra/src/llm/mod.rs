//! Upstream provider implementations.
//!
//! Contains the Anthropic implementation of the [`LlmProvider`] trait defined
//! in `playdo-core`, plus a placeholder provider used when no API key is set.
//! [`create_provider`] picks between them from configuration.
//!
//! [`LlmProvider`]: playdo_core::llm::provider::LlmProvider

pub mod anthropic;
pub mod unconfigured;

use std::time::Duration;

use secrecy::SecretString;

use playdo_core::llm::box_provider::BoxLlmProvider;
use playdo_core::prompt::system_prompt;
use playdo_types::config::PlaydoConfig;
use playdo_types::llm::UpstreamError;

use self::anthropic::{AnthropicAdapter, AnthropicProvider};
use self::unconfigured::UnconfiguredProvider;

/// Create a [`BoxLlmProvider`] from configuration.
///
/// Without an API key the result is an [`UnconfiguredProvider`] that fails
/// every call with [`UpstreamError::NotConfigured`], so the HTTP API can
/// still serve reads.
pub fn create_provider(
    config: &PlaydoConfig,
    api_key: Option<SecretString>,
) -> Result<BoxLlmProvider, UpstreamError> {
    let Some(api_key) = api_key else {
        tracing::warn!("ANTHROPIC_API_KEY is not set; send_message will fail until it is");
        return Ok(BoxLlmProvider::new(UnconfiguredProvider::new(&config.model)));
    };

    let adapter = AnthropicAdapter::new(
        config.model.clone(),
        config.max_tokens,
        system_prompt(config.system_prompt.as_deref()).to_string(),
    );
    let provider = AnthropicProvider::new(
        api_key,
        adapter,
        Duration::from_secs(config.upstream_timeout_secs),
    )?
    .with_base_url(config.anthropic_base_url.clone());

    Ok(BoxLlmProvider::new(provider))
}
