//! The interactive chat loop.
//!
//! Each line the student types becomes one turn. When a code file is being
//! watched, it is re-read before every message and the [`ContextReconciler`]
//! decides whether the code and the output of the last `/run` are attached.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use console::style;

use playdo_core::context::{ContextReconciler, EditorState};
use playdo_core::conversation::service::{SendMessage, TurnError};
use playdo_types::conversation::ConversationId;

use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use crate::cli::conversation::{
    describe_turn_error, load_conversation, print_message, thinking_spinner,
};
use crate::state::AppState;

/// The student's code file and what was last seen in it.
struct WatchedFile {
    path: PathBuf,
    editor: EditorState,
}

impl WatchedFile {
    async fn open(path: PathBuf) -> Result<Self> {
        let code = read_code(&path).await?;
        Ok(Self {
            path,
            editor: EditorState::new(code),
        })
    }

    /// Pick up edits made since the last read. A failed read keeps the last contents.
    async fn refresh(&mut self) {
        match read_code(&self.path).await {
            Ok(code) if code != self.editor.code => self.editor.set_code(code),
            Ok(_) => {}
            Err(e) => println!("\n  {} {e:#}\n", style("!").yellow().bold()),
        }
    }
}

/// Run the interactive chat loop until the student quits.
pub async fn run_chat_loop(
    state: &AppState,
    id: Option<ConversationId>,
    code_file: Option<PathBuf>,
    run_command: Option<String>,
) -> Result<()> {
    state.require_upstream()?;

    let conversation = match id {
        Some(id) => load_conversation(state, &id).await?,
        None => state.tutor_service.create_conversation().await?,
    };
    let conversation_id = conversation.id;

    let mut watched = match code_file {
        Some(path) => Some(WatchedFile::open(path).await?),
        None => None,
    };
    let mut reconciler = ContextReconciler::from_history(&conversation.messages);

    print_banner(
        &conversation_id,
        &state.config.model,
        watched.as_ref().map(|w| w.path.as_path()),
        run_command.as_deref(),
    );

    for message in &conversation.messages {
        print_message(message);
    }

    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut chat_input, _writer) =
        ChatInput::new(prompt).map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;

    loop {
        let text = match chat_input.read_line().await {
            InputEvent::Eof => {
                println!("\n  {}", style("Chat ended.").dim());
                break;
            }
            InputEvent::Interrupted => {
                println!("\n  {}", style("Press Ctrl+D or type /quit to exit.").dim());
                continue;
            }
            InputEvent::Message(text) if text.is_empty() => continue,
            InputEvent::Message(text) => text,
        };

        if let Some(cmd) = commands::parse(&text) {
            match cmd {
                ChatCommand::Help => commands::print_help(),
                ChatCommand::Clear => chat_input.clear(),
                ChatCommand::Exit => {
                    println!("\n  {}", style("Chat ended.").dim());
                    break;
                }
                ChatCommand::History => {
                    let conversation = load_conversation(state, &conversation_id).await?;
                    println!();
                    for message in &conversation.messages {
                        print_message(message);
                    }
                }
                ChatCommand::Run => match (watched.as_mut(), run_command.as_deref()) {
                    (Some(watched), Some(run_command)) => {
                        watched.refresh().await;
                        run_code(watched, run_command).await;
                    }
                    _ => println!(
                        "\n  {} Start the chat with --code-file FILE --run CMD to use /run.\n",
                        style("!").yellow().bold()
                    ),
                },
                ChatCommand::Unknown(name) => println!(
                    "\n  {} Unknown command: {}. Type /help for available commands.\n",
                    style("?").yellow().bold(),
                    style(name).dim()
                ),
            }
            continue;
        }

        let previous = reconciler.clone();
        let context = match watched.as_mut() {
            Some(watched) => {
                watched.refresh().await;
                reconciler.reconcile(&watched.editor)
            }
            None => Default::default(),
        };
        if !context.is_empty() {
            let note = if context.stdout.is_some() {
                "sharing your code and its output"
            } else {
                "sharing your code"
            };
            println!("  {}", style(note).dim());
        }

        let request = SendMessage {
            message: text,
            editor_code: context.editor_code,
            stdout: context.stdout,
            stderr: context.stderr,
        };

        let spinner = thinking_spinner();
        let result = state
            .tutor_service
            .send_message(&conversation_id, request)
            .await;
        spinner.finish_and_clear();

        match result {
            Ok(conversation) => {
                if let Some(reply) = conversation.messages.last() {
                    println!();
                    print_message(reply);
                }
            }
            Err(err) => {
                // The user message was not saved, so its context was never attached
                if !matches!(
                    err,
                    TurnError::Upstream { .. } | TurnError::ReplyNotSaved { .. }
                ) {
                    reconciler = previous;
                }
                println!(
                    "\n  {} {}\n",
                    style("!").red().bold(),
                    describe_turn_error(err)
                );
            }
        }
    }

    Ok(())
}

fn print_banner(
    id: &ConversationId,
    model: &str,
    code_file: Option<&Path>,
    run_command: Option<&str>,
) {
    println!();
    println!("  {}", style("Playdo").cyan().bold());
    println!(
        "  {}",
        style(format!("conversation {id} · {model}")).dim()
    );
    if let Some(path) = code_file {
        let run = run_command
            .map(|cmd| format!(" · /run runs `{cmd} {}`", path.display()))
            .unwrap_or_default();
        println!(
            "  {}",
            style(format!("watching {}{run}", path.display())).dim()
        );
    }
    println!("  {}", style("Type /help for commands.").dim());
    println!();
}

/// Run the code file and record the output against the current code.
async fn run_code(watched: &mut WatchedFile, run_command: &str) {
    match execute(run_command, &watched.path).await {
        Ok((stdout, stderr)) => {
            println!();
            print_output("stdout", &stdout);
            print_output("stderr", &stderr);
            watched.editor.record_run(stdout, stderr);
        }
        Err(e) => println!("\n  {} {e:#}\n", style("!").red().bold()),
    }
}

/// Execute `CMD FILE`, capturing stdout and stderr.
///
/// `run_command` may carry arguments (`python3 -u`); the file is appended last.
async fn execute(run_command: &str, path: &Path) -> Result<(String, String)> {
    let mut parts = run_command.split_whitespace();
    let program = parts.next().context("the --run command is empty")?;

    let output = tokio::process::Command::new(program)
        .args(parts)
        .arg(path)
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("failed to run {program}"))?;

    tracing::debug!(status = %output.status, "Code run finished");

    Ok((
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    ))
}

fn print_output(name: &str, output: &str) {
    if output.is_empty() {
        println!("  {} {}", style(format!("{name}:")).dim(), style("(empty)").dim());
        return;
    }
    println!("  {}", style(format!("{name}:")).dim());
    for line in output.lines() {
        println!("    {line}");
    }
}

async fn read_code(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_refresh_marks_earlier_run_stale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.py");
        tokio::fs::write(&path, "print(1)").await.unwrap();

        let mut watched = WatchedFile::open(path.clone()).await.unwrap();
        watched.editor.record_run("1\n", "");
        let mut reconciler = ContextReconciler::new();

        let first = reconciler.reconcile(&watched.editor);
        assert_eq!(first.stdout.as_deref(), Some("1\n"));

        tokio::fs::write(&path, "print(2)").await.unwrap();
        watched.refresh().await;
        let second = reconciler.reconcile(&watched.editor);
        assert_eq!(second.editor_code.as_deref(), Some("print(2)"));
        assert_eq!(second.stdout, None);
        assert_eq!(second.stderr, None);
    }

    #[tokio::test]
    async fn test_refresh_keeps_contents_when_file_vanishes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.py");
        tokio::fs::write(&path, "x = 1").await.unwrap();

        let mut watched = WatchedFile::open(path.clone()).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();
        watched.refresh().await;
        assert_eq!(watched.editor.code, "x = 1");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_captures_both_streams() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.sh");
        tokio::fs::write(&path, "echo out\necho err >&2\n").await.unwrap();

        let (stdout, stderr) = execute("sh", &path).await.unwrap();
        assert_eq!(stdout, "out\n");
        assert_eq!(stderr, "err\n");
    }

    #[tokio::test]
    async fn test_execute_rejects_empty_command() {
        assert!(execute("   ", Path::new("main.py")).await.is_err());
    }
}
