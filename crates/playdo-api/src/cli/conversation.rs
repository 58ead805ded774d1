//! Conversation CLI commands: new, list, show, send, delete.

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

use playdo_core::conversation::service::{SendMessage, TurnError};
use playdo_types::conversation::{Conversation, ConversationId};
use playdo_types::message::{MessageRole, StoredMessage};

use crate::state::AppState;

/// Create an empty conversation and print its id.
pub async fn new_conversation(state: &AppState, json: bool) -> Result<()> {
    let conversation = state.tutor_service.create_conversation().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conversation)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Conversation started.",
        style("✓").green().bold()
    );
    println!();
    println!(
        "  {}  {}",
        style("ID:").bold(),
        style(conversation.id.to_string()).cyan()
    );
    println!();
    println!(
        "  Chat: {}",
        style(format!("playdo chat {}", conversation.id)).dim()
    );
    println!();

    Ok(())
}

/// List conversations in a table or as JSON.
pub async fn list_conversations(state: &AppState, json: bool) -> Result<()> {
    let conversations = state.tutor_service.list_conversations().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conversations)?);
        return Ok(());
    }

    if conversations.is_empty() {
        println!();
        println!("  No conversations yet. Start one with {}", style("playdo chat").cyan());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(Color::White),
            Cell::new("Messages").fg(Color::White),
            Cell::new("Last Active").fg(Color::White),
            Cell::new("Created").fg(Color::White),
        ]);

    for conversation in &conversations {
        table.add_row(vec![
            Cell::new(conversation.id.to_string()).fg(Color::Cyan),
            Cell::new(conversation.message_count),
            Cell::new(format_relative_time(&conversation.updated_at)),
            Cell::new(conversation.created_at.format("%Y-%m-%d %H:%M").to_string()),
        ]);
    }

    println!();
    println!("{table}");
    println!();

    Ok(())
}

/// Print a conversation with all its messages and their context.
pub async fn show_conversation(state: &AppState, id: &ConversationId, json: bool) -> Result<()> {
    let conversation = load_conversation(state, id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conversation)?);
        return Ok(());
    }

    println!();
    println!(
        "  {}  {}",
        style("Conversation:").bold(),
        style(conversation.id.to_string()).cyan()
    );
    println!(
        "  {}  {}  ({} messages)",
        style("Last active:").bold(),
        format_relative_time(&conversation.updated_at),
        conversation.messages.len()
    );
    println!();

    for message in &conversation.messages {
        print_message(message);
    }

    Ok(())
}

/// Run one turn and print the tutor's reply.
pub async fn send_message(
    state: &AppState,
    id: &ConversationId,
    message: String,
    code_file: Option<&Path>,
    stdout_file: Option<&Path>,
    stderr_file: Option<&Path>,
    json: bool,
) -> Result<()> {
    state.require_upstream()?;

    let request = SendMessage {
        message,
        editor_code: read_optional_file(code_file).await?,
        stdout: read_optional_file(stdout_file).await?,
        stderr: read_optional_file(stderr_file).await?,
    };

    let spinner = thinking_spinner();
    let result = state.tutor_service.send_message(id, request).await;
    spinner.finish_and_clear();

    let conversation = result.map_err(describe_turn_error)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conversation)?);
        return Ok(());
    }

    if let Some(reply) = conversation.messages.last() {
        println!();
        print_message(reply);
    }

    Ok(())
}

/// Delete a conversation after confirmation.
pub async fn delete_conversation(
    state: &AppState,
    id: &ConversationId,
    force: bool,
    json: bool,
) -> Result<()> {
    let conversation = load_conversation(state, id).await?;

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Permanently delete conversation {} and its {} messages?",
                style(conversation.id.to_string()).red().bold(),
                conversation.messages.len()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.red} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Deleting conversation...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));

    state.tutor_service.delete_conversation(id).await?;

    spinner.finish_and_clear();

    if json {
        println!("{}", serde_json::json!({"deleted": true, "id": id}));
    } else {
        println!(
            "  {} Conversation {} deleted.",
            style("✓").red().bold(),
            id
        );
    }

    Ok(())
}

/// Load a conversation or fail with a readable error.
pub async fn load_conversation(state: &AppState, id: &ConversationId) -> Result<Conversation> {
    state
        .tutor_service
        .get_conversation(id)
        .await?
        .with_context(|| format!("conversation {id} not found"))
}

/// Spinner shown while waiting for the tutor.
pub fn thinking_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("thinking...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

/// Turn a failed turn into an error message that says what was kept.
pub fn describe_turn_error(err: TurnError) -> anyhow::Error {
    match err {
        TurnError::Upstream {
            user_sequence,
            source,
        } => {
            let hint = if source.is_retryable() {
                "Send it again to retry."
            } else {
                "Fix the problem above before retrying."
            };
            anyhow::anyhow!(
                "The tutor could not reply: {source}\nYour message was saved (#{user_sequence}). {hint}"
            )
        }
        TurnError::ReplyNotSaved { reply, source } => anyhow::anyhow!(
            "The tutor replied but the reply could not be saved ({source}). The reply was:\n\n{reply}"
        ),
        TurnError::Conflict(msg) => anyhow::anyhow!(
            "Another message was added to this conversation at the same time ({msg}). Send yours again."
        ),
        other => anyhow::Error::new(other),
    }
}

/// Print one message with its role and any attached context.
pub fn print_message(stored: &StoredMessage) {
    let message = &stored.message;
    let label = match message.role() {
        MessageRole::User => style("You").green().bold(),
        MessageRole::Assistant => style("Playdo").cyan().bold(),
    };
    println!(
        "  {} {}",
        label,
        style(format!("#{}", stored.sequence_number)).dim()
    );

    for line in message.text().lines() {
        println!("    {line}");
    }

    if let Some(code) = message.editor_code() {
        println!("    {}", style("code:").dim());
        print_block(code);
    }
    for (name, output) in [("stdout", message.stdout()), ("stderr", message.stderr())] {
        match output {
            Some(output) => {
                println!("    {}", style(format!("{name}:")).dim());
                print_block(output);
            }
            None if message.has_context() => {
                println!("    {}", style(format!("{name}: not run")).dim());
            }
            None => {}
        }
    }
    println!();
}

fn print_block(text: &str) {
    if text.is_empty() {
        println!("      {}", style("(empty)").dim());
        return;
    }
    for line in text.lines() {
        println!("      {}", style(line).dim());
    }
}

async fn read_optional_file(path: Option<&Path>) -> Result<Option<String>> {
    match path {
        Some(path) => {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok(Some(content))
        }
        None => Ok(None),
    }
}

pub(crate) fn format_relative_time(dt: &chrono::DateTime<chrono::Utc>) -> String {
    let now = chrono::Utc::now();
    let diff = now - *dt;

    if diff.num_minutes() < 1 {
        "just now".to_string()
    } else if diff.num_hours() < 1 {
        format!("{}m ago", diff.num_minutes())
    } else if diff.num_days() < 1 {
        format!("{}h ago", diff.num_hours())
    } else if diff.num_days() < 30 {
        format!("{}d ago", diff.num_days())
    } else {
        dt.format("%Y-%m-%d").to_string()
    }
}
