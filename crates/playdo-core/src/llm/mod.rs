//! Upstream model abstractions for Playdo.
//!
//! - `LlmProvider`: RPITIT trait for concrete upstream backends
//! - `UpstreamAdapter`: pure conversion between Messages and an upstream schema
//! - `BoxLlmProvider`: object-safe wrapper for runtime provider selection

pub mod box_provider;
pub mod provider;
