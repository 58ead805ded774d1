//! Interactive CLI chat with the tutor.
//!
//! Resumes or starts a conversation, reads messages from the terminal and
//! attaches editor context from a watched code file. Entry point:
//! `loop_runner::run_chat_loop`.

pub mod commands;
pub mod input;
pub mod loop_runner;
