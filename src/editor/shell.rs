// SPDX-License-Identifier: MIT
//! The editor shell: glue between the document, the generation pipeline,
//! and the execution sandbox.
//!
//! All user actions land here. The shell owns the authoritative document,
//! gates re-entrant generation with an in-flight flag (reject, never queue),
//! and republishes the full document text after every successful mutation so
//! clients cannot diverge from it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::console::{ConsoleLog, LogRecord};
use crate::editor::document::{Document, Position};
use crate::editor::languages;
use crate::error::ShellError;
use crate::generation::GenerationClient;
use crate::ipc::event::EventBroadcaster;
use crate::sandbox::{ExecutionSandbox, RunHandle};

/// The three views the front end switches between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    Source,
    Console,
    Output,
}

/// Snapshot of the shell for `editor.state`.
#[derive(Debug, Clone, Serialize)]
pub struct ShellState {
    pub document: Option<Document>,
    pub tab: Tab,
    pub generating: bool,
    #[serde(rename = "lastError")]
    pub last_error: Option<String>,
    #[serde(rename = "consoleLen")]
    pub console_len: usize,
}

pub struct EditorShell {
    document: RwLock<Option<Document>>,
    client: GenerationClient,
    sandbox: ExecutionSandbox,
    console: Arc<ConsoleLog>,
    broadcaster: Arc<EventBroadcaster>,
    /// In-flight generation gate. Set for the duration of one endpoint round
    /// trip; concurrent requests are rejected, not queued.
    generating: AtomicBool,
    tab: std::sync::Mutex<Tab>,
    last_error: std::sync::Mutex<Option<String>>,
}

impl EditorShell {
    pub fn new(
        client: GenerationClient,
        sandbox: ExecutionSandbox,
        console: Arc<ConsoleLog>,
        broadcaster: Arc<EventBroadcaster>,
    ) -> Self {
        Self {
            document: RwLock::new(None),
            client,
            sandbox,
            console,
            broadcaster,
            generating: AtomicBool::new(false),
            tab: std::sync::Mutex::new(Tab::Source),
            last_error: std::sync::Mutex::new(None),
        }
    }

    fn set_last_error(&self, message: Option<String>) {
        let mut slot = match self.last_error.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = message;
    }

    fn current_tab(&self) -> Tab {
        match self.tab.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Switch the active language: resets the document to that language's
    /// starter template verbatim and republishes it.
    pub async fn set_language(&self, tag: &str) -> Result<Document, ShellError> {
        let spec = languages::find(tag).ok_or_else(|| ShellError::UnknownLanguage(tag.to_string()))?;
        let doc = Document::new(spec.tag, spec.template);
        *self.document.write().await = Some(doc.clone());
        info!(language = tag, "language selected — document reset to template");
        self.broadcaster
            .broadcast("document.changed", json!({ "document": doc }));
        Ok(doc)
    }

    /// Replace the document text (user keystrokes mirrored from the widget).
    pub async fn update_text(&self, text: String) -> Result<(), ShellError> {
        let mut guard = self.document.write().await;
        let doc = guard.as_mut().ok_or(ShellError::MountNotReady)?;
        doc.set_text(text);
        Ok(())
    }

    /// Track the widget's reported cursor position.
    pub async fn set_cursor(&self, cursor: Position) -> Result<(), ShellError> {
        let mut guard = self.document.write().await;
        let doc = guard.as_mut().ok_or(ShellError::MountNotReady)?;
        doc.set_cursor(cursor);
        Ok(())
    }

    /// Generate a snippet for `instruction` and insert it at the cursor.
    ///
    /// The document is only mutated after the whole generate step succeeds,
    /// so a failure leaves no partial state. Returns the republished full
    /// text. Rejected (not queued) while another request is in flight.
    pub async fn generate(&self, instruction: &str) -> Result<String, ShellError> {
        if self.generating.swap(true, Ordering::SeqCst) {
            return Err(ShellError::GenerationInFlight);
        }
        let result = self.generate_inner(instruction).await;
        self.generating.store(false, Ordering::SeqCst);

        match &result {
            Ok(_) => self.set_last_error(None),
            Err(e) => {
                warn!(err = %e, "generation failed");
                self.set_last_error(Some(e.to_string()));
            }
        }
        result
    }

    async fn generate_inner(&self, instruction: &str) -> Result<String, ShellError> {
        // Snapshot the code before suspending on the endpoint; the UI stays
        // interactive during the wait.
        let (existing_code, language) = {
            let guard = self.document.read().await;
            let doc = guard.as_ref().ok_or(ShellError::MountNotReady)?;
            (doc.text.clone(), doc.language.clone())
        };

        let snippet = self.client.generate(&existing_code, instruction, &language).await?;

        // Insert at whatever position the cursor has now — the user may have
        // moved it during the wait.
        let mut guard = self.document.write().await;
        let doc = guard.as_mut().ok_or(ShellError::MountNotReady)?;
        let text = doc.insert_at_cursor(&snippet);
        info!(language = %doc.language, snippet_len = snippet.len(), "generated snippet inserted");
        self.broadcaster
            .broadcast("document.changed", json!({ "document": doc.clone() }));
        Ok(text)
    }

    /// Execute the current document text in a fresh sandbox.
    ///
    /// Only JavaScript is executable; for every other language no sandbox is
    /// spawned and no log records are produced. A new run supersedes (and
    /// best-effort kills) the previous one; switching views never stops a
    /// running sandbox.
    pub async fn run(&self) -> Result<RunHandle, ShellError> {
        let (source, language) = {
            let guard = self.document.read().await;
            let doc = guard.as_ref().ok_or(ShellError::MountNotReady)?;
            (doc.text.clone(), doc.language.clone())
        };

        let executable = languages::find(&language).is_some_and(|spec| spec.executable);
        if !executable {
            return Err(ShellError::NotExecutable(language));
        }

        let handle = self
            .sandbox
            .run(&source, Arc::clone(&self.console), Arc::clone(&self.broadcaster))
            .await?;

        self.broadcaster.broadcast(
            "run.started",
            json!({ "runId": handle.run_id, "language": language }),
        );
        self.select_tab(Tab::Output);
        Ok(handle)
    }

    pub fn select_tab(&self, tab: Tab) {
        let mut guard = match self.tab.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = tab;
    }

    pub fn console_snapshot(&self) -> Vec<LogRecord> {
        self.console.snapshot()
    }

    pub fn clear_console(&self) {
        self.console.clear();
    }

    pub async fn state(&self) -> ShellState {
        ShellState {
            document: self.document.read().await.clone(),
            tab: self.current_tab(),
            generating: self.generating.load(Ordering::SeqCst),
            last_error: match self.last_error.lock() {
                Ok(guard) => guard.clone(),
                Err(poisoned) => poisoned.into_inner().clone(),
            },
            console_len: self.console.len(),
        }
    }

    /// Shut down the sandbox on daemon exit.
    pub async fn shutdown(&self) {
        self.sandbox.stop().await;
    }
}
