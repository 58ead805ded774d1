//! Infrastructure layer for Playdo.
//!
//! Contains implementations of the traits defined in `playdo-core`:
//! SQLite conversation storage, the Anthropic upstream provider, and
//! configuration loading from the data directory.

pub mod config;
pub mod llm;
pub mod sqlite;
