//! Anthropic Claude upstream provider.
//!
//! - [`AnthropicAdapter`]: pure conversion between Playdo messages and the
//!   Messages API schema
//! - [`AnthropicProvider`]: HTTP client implementing
//!   [`LlmProvider`](playdo_core::llm::provider::LlmProvider)

pub mod adapter;
pub mod client;
pub mod types;

pub use adapter::AnthropicAdapter;
pub use client::AnthropicProvider;
