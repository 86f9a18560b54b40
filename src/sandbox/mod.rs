// SPDX-License-Identifier: MIT
//! Sandboxed execution of document source in an isolated Node.js subprocess.
//!
//! The host and the sandbox are two independent actors: the only channel
//! between them is the child's stdout pipe, carrying one structured JSON
//! message per console call (see `harness`). A bridge task parses those
//! lines, appends `LogRecord`s to the shared console log in arrival order,
//! and broadcasts each one to connected clients. Starting a new run kills
//! the previous child best-effort without waiting for it, so late messages
//! from a superseded run may still append afterwards — they keep their
//! original run id.

pub mod harness;

use std::io::Write as _;
use std::process::Stdio;
use std::sync::Arc;

use serde::Deserialize;
use tempfile::NamedTempFile;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::console::{ConsoleLog, Severity};
use crate::error::SandboxError;
use crate::ipc::event::EventBroadcaster;

/// Wire shape of one bridged console message.
#[derive(Debug, Deserialize)]
pub struct ConsoleMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub method: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Handle for a started run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunHandle {
    #[serde(rename = "runId")]
    pub run_id: String,
}

struct ActiveRun {
    child: Child,
    // Dropping this deletes the on-disk harness script: the previous run's
    // loadable resource is released when a new run supersedes it.
    _script: NamedTempFile,
}

/// Spawns and supersedes sandboxed Node.js runs.
pub struct ExecutionSandbox {
    node_path: String,
    current: Mutex<Option<ActiveRun>>,
}

impl ExecutionSandbox {
    pub fn new(node_path: impl Into<String>) -> Self {
        Self {
            node_path: node_path.into(),
            current: Mutex::new(None),
        }
    }

    /// Serialize `source` into a fresh sandbox and start it.
    ///
    /// The harness script is written to a temp file owned by the run, the
    /// previous child (if any) is killed without being awaited, and a bridge
    /// task forwards console messages until the child's stdout closes.
    pub async fn run(
        &self,
        source: &str,
        console: Arc<ConsoleLog>,
        broadcaster: Arc<EventBroadcaster>,
    ) -> Result<RunHandle, SandboxError> {
        let run_id = Uuid::new_v4().to_string();

        let mut script = NamedTempFile::new()?;
        script.write_all(harness::build_harness(source).as_bytes())?;
        script.flush()?;

        let mut child = Command::new(&self.node_path)
            .arg(script.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SandboxError::Spawn {
                runtime: self.node_path.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| SandboxError::Spawn {
            runtime: self.node_path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "missing stdout pipe"),
        })?;

        let bridge_run_id = run_id.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                match serde_json::from_str::<ConsoleMessage>(&line) {
                    Ok(msg) if msg.kind == "console" => {
                        let Some(severity) = Severity::from_method(&msg.method) else {
                            trace!(method = %msg.method, "dropping unknown console method");
                            continue;
                        };
                        let record = console.append(&bridge_run_id, severity, msg.args);
                        broadcaster.broadcast("console.record", serde_json::json!(record));
                    }
                    Ok(_) => {}
                    Err(_) => {
                        // User code can write raw bytes to stdout; only the
                        // structured console shape crosses the boundary.
                        trace!("ignoring non-console sandbox output line");
                    }
                }
            }
            debug!(run_id = %bridge_run_id, "sandbox output stream closed");
        });

        let mut slot = self.current.lock().await;
        if let Some(mut previous) = slot.take() {
            // Best-effort kill; the old bridge task drains whatever was
            // already in the pipe.
            if let Err(e) = previous.child.start_kill() {
                debug!(err = %e, "previous sandbox already exited");
            }
        }
        *slot = Some(ActiveRun {
            child,
            _script: script,
        });

        debug!(run_id = %run_id, "sandbox run started");
        Ok(RunHandle { run_id })
    }

    /// Tear down the active sandbox, if any. Called on daemon shutdown.
    pub async fn stop(&self) {
        if let Some(mut run) = self.current.lock().await.take() {
            let _ = run.child.start_kill();
        }
    }

    /// True while the most recent child is still alive.
    pub async fn is_running(&self) -> bool {
        let mut slot = self.current.lock().await;
        match slot.as_mut() {
            Some(run) => matches!(run.child.try_wait(), Ok(None)),
            None => false,
        }
    }
}

/// Probe whether the configured runtime exists. Used by diagnostics and by
/// tests that need a real `node`.
pub async fn runtime_available(node_path: &str) -> bool {
    Command::new(node_path)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}
