//! Slash command parsing for the chat loop.

use console::style;

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    /// Show available commands.
    Help,
    /// Run the code file and record its output.
    Run,
    /// Print the conversation so far.
    History,
    /// Clear the terminal screen.
    Clear,
    /// Exit the chat.
    Exit,
    /// Unknown command.
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let cmd = trimmed
        .split_whitespace()
        .next()
        .unwrap_or(trimmed)
        .to_lowercase();

    match cmd.as_str() {
        "/help" | "/h" | "/?" => Some(ChatCommand::Help),
        "/run" | "/r" => Some(ChatCommand::Run),
        "/history" => Some(ChatCommand::History),
        "/clear" | "/cls" => Some(ChatCommand::Clear),
        "/exit" | "/quit" | "/q" => Some(ChatCommand::Exit),
        other => Some(ChatCommand::Unknown(other.to_string())),
    }
}

/// Print the help text listing all available commands.
pub fn print_help() {
    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    println!("  {}     Show this help message", style("/help").cyan());
    println!("  {}      Run your code file and show the output", style("/run").cyan());
    println!("  {}  Show the conversation so far", style("/history").cyan());
    println!("  {}    Clear the screen", style("/clear").cyan());
    println!("  {}     End the chat", style("/quit").cyan());
    println!();
    println!(
        "  {}",
        style("Anything else is sent to the tutor along with your code when it changed.").dim()
    );
    println!();
}
