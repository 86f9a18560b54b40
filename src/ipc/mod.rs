pub mod event;
pub mod handlers;

use crate::error::{GenerateError, ShellError};
use crate::AppContext;
use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

// ─── JSON-RPC 2.0 types ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RpcRequest {
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

#[derive(Serialize)]
struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Serialize)]
struct RpcError {
    code: i32,
    message: String,
}

// ─── Error codes ─────────────────────────────────────────────────────────────
//
// Domain codes mirror the shell/generation taxonomy so the front end can
// distinguish a local rate-limit rejection from an endpoint failure.

const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;
/// Local token bucket empty — user may retry later, no auto-retry.
const RATE_LIMITED: i32 = -32001;
/// A generation request is already awaiting the endpoint.
const GENERATION_IN_FLIGHT: i32 = -32002;
/// Action arrived before any document was opened.
const MOUNT_NOT_READY: i32 = -32003;
const UNKNOWN_LANGUAGE: i32 = -32004;
/// The selected language cannot run in the sandbox.
const NOT_EXECUTABLE: i32 = -32005;
/// Endpoint failure or malformed response, surfaced verbatim.
const UPSTREAM_ERROR: i32 = -32006;
const EMPTY_RESPONSE: i32 = -32007;

fn shell_error_code(err: &ShellError) -> i32 {
    match err {
        ShellError::MountNotReady => MOUNT_NOT_READY,
        ShellError::GenerationInFlight => GENERATION_IN_FLIGHT,
        ShellError::UnknownLanguage(_) => UNKNOWN_LANGUAGE,
        ShellError::NotExecutable(_) => NOT_EXECUTABLE,
        ShellError::Generate(GenerateError::RateLimited) => RATE_LIMITED,
        ShellError::Generate(GenerateError::EmptyResponse) => EMPTY_RESPONSE,
        ShellError::Generate(GenerateError::Upstream(_)) => UPSTREAM_ERROR,
        ShellError::Sandbox(_) => INTERNAL_ERROR,
    }
}

// ─── Server ──────────────────────────────────────────────────────────────────

pub async fn run(ctx: Arc<AppContext>) -> Result<()> {
    let addr = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "IPC server listening (WebSocket JSON-RPC)");

    // Broadcast daemon.ready to anyone who subscribes after connect
    ctx.broadcaster.broadcast(
        "daemon.ready",
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "port": ctx.config.port
        }),
    );

    // Graceful shutdown: resolve on SIGTERM (Unix) or Ctrl-C (all platforms).
    let shutdown = make_shutdown_future();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("shutdown signal received — stopping sandbox and IPC server");
                ctx.shell.shutdown().await;
                break;
            }

            conn = listener.accept() => {
                let (stream, peer) = match conn {
                    Ok(c) => c,
                    Err(e) => {
                        error!(err = %e, "accept error");
                        continue;
                    }
                };
                debug!(peer = %peer, "new connection");
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, ctx).await {
                        warn!(peer = %peer, err = %e, "connection error");
                    }
                });
            }
        }
    }

    info!("IPC server stopped");
    Ok(())
}

async fn make_shutdown_future() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                warn!(err = %e, "failed to install SIGTERM handler — Ctrl-C only");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = tokio::signal::ctrl_c() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

async fn handle_connection(stream: tokio::net::TcpStream, ctx: Arc<AppContext>) -> Result<()> {
    let ws = accept_async(stream).await?;
    let (mut sink, mut source) = ws.split();
    let mut events = ctx.broadcaster.subscribe();

    loop {
        tokio::select! {
            incoming = source.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = dispatch(&text, &ctx).await {
                            sink.send(Message::Text(reply)).await?;
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        sink.send(Message::Pong(payload)).await?;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // binary frames are ignored
                    Some(Err(e)) => {
                        debug!(err = %e, "websocket read error");
                        break;
                    }
                }
            }
            event = events.recv() => {
                match event {
                    Ok(notification) => sink.send(Message::Text(notification)).await?,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "event subscriber lagged — notifications dropped");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    Ok(())
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

/// Route one JSON-RPC message. Returns `None` for notifications (no id).
async fn dispatch(raw: &str, ctx: &AppContext) -> Option<String> {
    let request: RpcRequest = match serde_json::from_str(raw) {
        Ok(r) => r,
        Err(_) => return Some(error_response(Value::Null, PARSE_ERROR, "parse error")),
    };
    if request.jsonrpc != "2.0" {
        let id = request.id.unwrap_or(Value::Null);
        return Some(error_response(id, INVALID_REQUEST, "jsonrpc must be \"2.0\""));
    }

    let params = request.params.unwrap_or(Value::Null);
    debug!(method = %request.method, "rpc call");

    let outcome: Result<Value> = match request.method.as_str() {
        "daemon.status" => handlers::editor::status(ctx).await,
        "editor.state" => handlers::editor::state(ctx).await,
        "editor.languages" => handlers::editor::languages(ctx).await,
        "editor.setLanguage" => handlers::editor::set_language(params, ctx).await,
        "editor.updateText" => handlers::editor::update_text(params, ctx).await,
        "editor.setCursor" => handlers::editor::set_cursor(params, ctx).await,
        "editor.generate" => handlers::editor::generate(params, ctx).await,
        "editor.run" => handlers::editor::run(ctx).await,
        "editor.selectTab" => handlers::editor::select_tab(params, ctx).await,
        "console.snapshot" => handlers::editor::console_snapshot(ctx).await,
        "console.clear" => handlers::editor::console_clear(ctx).await,
        other => {
            let id = request.id?;
            return Some(error_response(
                id,
                METHOD_NOT_FOUND,
                &format!("unknown method: {other}"),
            ));
        }
    };

    // Notifications get no response, success or failure.
    let id = request.id?;

    Some(match outcome {
        Ok(result) => serde_json::to_string(&RpcResponse {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        })
        .unwrap_or_default(),
        Err(err) => {
            let code = if let Some(shell_err) = err.downcast_ref::<ShellError>() {
                shell_error_code(shell_err)
            } else if err.downcast_ref::<serde_json::Error>().is_some() {
                INVALID_PARAMS
            } else {
                INTERNAL_ERROR
            };
            error_response(id, code, &err.to_string())
        }
    })
}

fn error_response(id: Value, code: i32, message: &str) -> String {
    serde_json::to_string(&RpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(RpcError {
            code,
            message: message.to_string(),
        }),
    })
    .unwrap_or_default()
}
