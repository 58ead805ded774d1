//! Conversation persistence and the turn protocol.
//!
//! - `ConversationRepository`: trait the infrastructure layer implements
//! - `TutorService`: validates, persists and relays one turn at a time

pub mod repository;
pub mod service;
