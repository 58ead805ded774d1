//! Configuration types for Playdo.
//!
//! `PlaydoConfig` represents the `config.toml` in the data directory that
//! controls the upstream model, its limits, and the tutor prompt.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the Playdo backend.
///
/// Loaded from `~/.playdo/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaydoConfig {
    /// Upstream model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens the upstream may generate per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Bound on a single upstream call, in seconds.
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,

    /// Base URL of the Anthropic Messages API.
    #[serde(default = "default_anthropic_base_url")]
    pub anthropic_base_url: String,

    /// Replaces the built-in tutor system prompt when set.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_upstream_timeout_secs() -> u64 {
    120
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

impl Default for PlaydoConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
            anthropic_base_url: default_anthropic_base_url(),
            system_prompt: None,
        }
    }
}
