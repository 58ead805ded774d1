//! Shared domain types for Playdo.
//!
//! This crate contains the core domain types used across the Playdo tutor backend:
//! Message, Conversation, configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod message;
