//! HTTP request handlers.

pub mod conversation;
