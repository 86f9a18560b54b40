//! Error taxonomy for the editor daemon.
//!
//! Component seams carry typed `thiserror` enums; the IPC boundary converts
//! them to JSON-RPC error codes, and the binary uses `anyhow` for anything
//! that should just abort startup.

use thiserror::Error;

/// Failures on the generation path. None of these are retried — the caller
/// surfaces the message and the user decides what to do next.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The local token bucket had no token available. Recoverable: the user
    /// may try again once the bucket refills.
    #[error("rate limit exceeded — please try again later")]
    RateLimited,

    /// The generation endpoint failed or returned something we could not
    /// interpret. Surfaced verbatim, no retry.
    #[error("generation endpoint error: {0}")]
    Upstream(String),

    /// The endpoint answered but the cleaned snippet was empty.
    #[error("the generation endpoint returned an empty snippet")]
    EmptyResponse,
}

/// Failures while setting up a sandboxed run. Errors *inside* the sandbox are
/// not represented here — those come back as error-severity log records.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to materialize the sandbox harness: {0}")]
    Harness(#[from] std::io::Error),

    #[error("failed to spawn `{runtime}` — is it installed and on PATH?")]
    Spawn {
        runtime: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures at the editor-shell seam, where user actions land.
#[derive(Debug, Error)]
pub enum ShellError {
    /// An action arrived before any document was opened.
    #[error("no document is open yet — select a language first")]
    MountNotReady,

    /// A generation request is already awaiting the endpoint. Requests are
    /// rejected rather than queued.
    #[error("a generation request is already in flight")]
    GenerationInFlight,

    #[error("unknown language: {0}")]
    UnknownLanguage(String),

    /// Only JavaScript runs in the sandbox; everything else is inert.
    #[error("language {0:?} cannot be executed in the sandbox")]
    NotExecutable(String),

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error(transparent)]
    Sandbox(#[from] SandboxError),
}
