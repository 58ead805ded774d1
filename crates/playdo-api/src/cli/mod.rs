//! CLI command definitions and dispatch for the `playdo` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod chat;
pub mod conversation;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use playdo_types::conversation::ConversationId;

/// Chat with a patient Python tutor that can see your code.
#[derive(Parser)]
#[command(name = "playdo", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value = "3000")]
        port: u16,

        /// Host address to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Start a new, empty conversation.
    New,

    /// List conversations, most recently active first.
    #[command(alias = "ls")]
    List,

    /// Show a conversation and its messages.
    Show {
        /// Conversation id.
        #[arg(value_parser = parse_conversation_id)]
        id: ConversationId,
    },

    /// Send one message to the tutor and print the reply.
    Send {
        /// Conversation id.
        #[arg(value_parser = parse_conversation_id)]
        id: ConversationId,

        /// The message text.
        message: String,

        /// Attach the contents of this file as the editor code.
        #[arg(long)]
        code_file: Option<PathBuf>,

        /// Attach this file as the stdout of the last run (needs --stderr-file).
        #[arg(long)]
        stdout_file: Option<PathBuf>,

        /// Attach this file as the stderr of the last run (needs --stdout-file).
        #[arg(long)]
        stderr_file: Option<PathBuf>,
    },

    /// Interactive chat with the tutor.
    Chat {
        /// Conversation to resume. A new one is started when omitted.
        #[arg(value_parser = parse_conversation_id)]
        id: Option<ConversationId>,

        /// File holding the code you are working on.
        #[arg(long)]
        code_file: Option<PathBuf>,

        /// Command used by /run to execute the code file (e.g. python3).
        #[arg(long, requires = "code_file")]
        run: Option<String>,
    },

    /// Delete a conversation and all its messages.
    #[command(alias = "rm")]
    Delete {
        /// Conversation id.
        #[arg(value_parser = parse_conversation_id)]
        id: ConversationId,

        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn parse_conversation_id(s: &str) -> Result<ConversationId, String> {
    s.parse()
        .map_err(|_| format!("'{s}' is not a valid conversation id"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_send_parses_context_files() {
        let id = ConversationId::new().to_string();
        let cli = Cli::try_parse_from([
            "playdo",
            "send",
            &id,
            "Why does this fail?",
            "--code-file",
            "main.py",
            "--stdout-file",
            "out.txt",
            "--stderr-file",
            "err.txt",
        ])
        .unwrap();

        match cli.command {
            Commands::Send {
                message,
                code_file,
                stdout_file,
                stderr_file,
                ..
            } => {
                assert_eq!(message, "Why does this fail?");
                assert_eq!(code_file, Some(PathBuf::from("main.py")));
                assert_eq!(stdout_file, Some(PathBuf::from("out.txt")));
                assert_eq!(stderr_file, Some(PathBuf::from("err.txt")));
            }
            _ => panic!("expected send"),
        }
    }

    #[test]
    fn test_invalid_id_is_rejected() {
        assert!(Cli::try_parse_from(["playdo", "show", "nope"]).is_err());
    }

    #[test]
    fn test_run_requires_code_file() {
        assert!(Cli::try_parse_from(["playdo", "chat", "--run", "python3"]).is_err());
        assert!(
            Cli::try_parse_from(["playdo", "chat", "--code-file", "a.py", "--run", "python3"])
                .is_ok()
        );
    }

    #[test]
    fn test_aliases_and_global_flags() {
        let cli = Cli::try_parse_from(["playdo", "ls", "--json", "-vv"]).unwrap();
        assert!(matches!(cli.command, Commands::List));
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
    }
}
