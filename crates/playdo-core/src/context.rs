//! Context reconciliation for outgoing user messages.
//!
//! A client that owns a code editor does not want to re-send the same code
//! and output with every chat message. [`ContextReconciler`] remembers what
//! it last attached and decides, from the current editor state, whether a
//! new message should carry editor context at all.

use playdo_types::message::{Message, StoredMessage, ValidationError};

/// The result of running the editor's code once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    /// The code that was run, as it was at run time.
    pub code: String,
    pub stdout: String,
    pub stderr: String,
}

/// Snapshot of the student's editor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorState {
    pub code: String,
    pub last_run: Option<RunOutput>,
}

impl EditorState {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            last_run: None,
        }
    }

    /// Record a run of the current code.
    pub fn record_run(&mut self, stdout: impl Into<String>, stderr: impl Into<String>) {
        self.last_run = Some(RunOutput {
            code: self.code.clone(),
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }

    /// Replace the editor contents. An earlier run becomes stale.
    pub fn set_code(&mut self, code: impl Into<String>) {
        self.code = code.into();
    }
}

/// Editor context to attach to one outgoing user message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachedContext {
    pub editor_code: Option<String>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl AttachedContext {
    /// True when nothing is attached.
    pub fn is_empty(&self) -> bool {
        self.editor_code.is_none()
    }

    /// Build the user message carrying this context.
    pub fn into_message(self, text: impl Into<String>) -> Result<Message, ValidationError> {
        Message::user(text, self.editor_code, self.stdout, self.stderr)
    }
}

/// Decides when editor context is attached to an outgoing message.
#[derive(Debug, Clone, Default)]
pub struct ContextReconciler {
    last_sent: Option<AttachedContext>,
}

impl ContextReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a persisted history: the most recent user message that
    /// carried context is what was last attached.
    pub fn from_history(history: &[StoredMessage]) -> Self {
        let last_sent = history
            .iter()
            .rev()
            .map(|stored| &stored.message)
            .find(|message| message.has_context())
            .map(|message| AttachedContext {
                editor_code: message.editor_code().map(str::to_string),
                stdout: message.stdout().map(str::to_string),
                stderr: message.stderr().map(str::to_string),
            });
        Self { last_sent }
    }

    /// Context to attach given the current editor state.
    ///
    /// Outputs count as fresh only if the last run was of exactly the code
    /// now in the editor. When code and fresh outputs match what was last
    /// attached, nothing is attached.
    pub fn reconcile(&mut self, editor: &EditorState) -> AttachedContext {
        let (stdout, stderr) = match &editor.last_run {
            Some(run) if run.code == editor.code => {
                (Some(run.stdout.clone()), Some(run.stderr.clone()))
            }
            _ => (None, None),
        };

        let candidate = AttachedContext {
            editor_code: Some(editor.code.clone()),
            stdout,
            stderr,
        };

        if self.last_sent.as_ref() == Some(&candidate) {
            return AttachedContext::default();
        }

        self.last_sent = Some(candidate.clone());
        candidate
    }
}
