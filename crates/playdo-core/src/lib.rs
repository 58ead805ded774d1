//! Business logic and repository trait definitions for Playdo.
//!
//! This crate defines the "ports" (repository and provider traits) that the
//! infrastructure layer implements, plus the pieces that are pure domain
//! logic: the XML projection of a message, editor-context reconciliation,
//! and the save-then-relay turn protocol. It depends only on `playdo-types`
//! -- never on `playdo-infra` or any database/HTTP crate.

pub mod context;
pub mod conversation;
pub mod llm;
pub mod prompt;
pub mod xml;
