// SPDX-License-Identifier: MIT
// editor.* and console.* RPC handlers.
//
// Thin adapters: parse params, call the shell, shape the JSON reply. Domain
// errors bubble up as `ShellError` inside `anyhow` and are mapped to codes
// in `ipc::dispatch`.

use crate::editor::document::Position;
use crate::editor::{languages as registry, Tab};
use crate::AppContext;
use anyhow::Result;
use serde_json::{json, Value};

/// `daemon.status` — liveness, version, uptime.
pub async fn status(ctx: &AppContext) -> Result<Value> {
    Ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "uptimeSecs": ctx.started_at.elapsed().as_secs(),
    }))
}

/// `editor.state` — full shell snapshot (document, tab, in-flight flag,
/// last error, console length).
pub async fn state(ctx: &AppContext) -> Result<Value> {
    Ok(json!(ctx.shell.state().await))
}

/// `editor.languages` — the fixed language registry for the picker.
pub async fn languages(_ctx: &AppContext) -> Result<Value> {
    let list: Vec<Value> = registry::LANGUAGES
        .iter()
        .map(|spec| {
            json!({
                "tag": spec.tag,
                "version": spec.version,
                "template": spec.template,
                "executable": spec.executable,
            })
        })
        .collect();
    Ok(json!({ "languages": list }))
}

/// `editor.setLanguage` — switch language, resetting the document to the
/// language's starter template.
///
/// Parameters: `{ "language": "javascript" }`
pub async fn set_language(params: Value, ctx: &AppContext) -> Result<Value> {
    #[derive(serde::Deserialize)]
    struct Params {
        language: String,
    }
    let p: Params = serde_json::from_value(params)?;
    let doc = ctx.shell.set_language(&p.language).await?;
    Ok(json!({ "document": doc }))
}

/// `editor.updateText` — mirror the widget's current text into the
/// authoritative document.
///
/// Parameters: `{ "text": "..." }`
pub async fn update_text(params: Value, ctx: &AppContext) -> Result<Value> {
    #[derive(serde::Deserialize)]
    struct Params {
        text: String,
    }
    let p: Params = serde_json::from_value(params)?;
    ctx.shell.update_text(p.text).await?;
    Ok(json!({ "ok": true }))
}

/// `editor.setCursor` — mirror the widget's cursor position (1-based).
///
/// Parameters: `{ "line": 2, "column": 1 }`
pub async fn set_cursor(params: Value, ctx: &AppContext) -> Result<Value> {
    let cursor: Position = serde_json::from_value(params)?;
    ctx.shell.set_cursor(cursor).await?;
    Ok(json!({ "ok": true }))
}

/// `editor.generate` — generate a snippet for the instruction and insert it
/// at the cursor. Returns the republished full text.
///
/// Parameters: `{ "instruction": "add a fibonacci function" }`
pub async fn generate(params: Value, ctx: &AppContext) -> Result<Value> {
    #[derive(serde::Deserialize)]
    struct Params {
        instruction: String,
    }
    let p: Params = serde_json::from_value(params)?;
    let text = ctx.shell.generate(&p.instruction).await?;
    Ok(json!({ "text": text }))
}

/// `editor.run` — execute the current document in a fresh sandbox.
pub async fn run(ctx: &AppContext) -> Result<Value> {
    let handle = ctx.shell.run().await?;
    Ok(json!(handle))
}

/// `editor.selectTab` — switch among the source/console/output views.
/// Never stops a running sandbox.
///
/// Parameters: `{ "tab": "console" }`
pub async fn select_tab(params: Value, ctx: &AppContext) -> Result<Value> {
    #[derive(serde::Deserialize)]
    struct Params {
        tab: Tab,
    }
    let p: Params = serde_json::from_value(params)?;
    ctx.shell.select_tab(p.tab);
    Ok(json!({ "ok": true }))
}

/// `console.snapshot` — the ordered log sequence, oldest first.
pub async fn console_snapshot(ctx: &AppContext) -> Result<Value> {
    Ok(json!({ "records": ctx.shell.console_snapshot() }))
}

/// `console.clear` — drop all retained records.
pub async fn console_clear(ctx: &AppContext) -> Result<Value> {
    ctx.shell.clear_console();
    Ok(json!({ "ok": true }))
}
