// SPDX-License-Identifier: MIT
// Shell-level flows: language switching, generation + insertion, gating.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use codedeck::config::DaemonConfig;
use codedeck::editor::document::Position;
use codedeck::editor::languages;
use codedeck::error::{GenerateError, ShellError};
use codedeck::generation::GenerationBackend;
use codedeck::AppContext;

/// Backend that replies with a fixed string after an optional delay.
struct Scripted {
    reply: String,
    delay: Duration,
}

impl Scripted {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            delay: Duration::ZERO,
        }
    }

    fn slow(reply: &str, delay: Duration) -> Self {
        Self {
            reply: reply.to_string(),
            delay,
        }
    }
}

#[async_trait]
impl GenerationBackend for Scripted {
    async fn complete(&self, _prompt: &str) -> Result<String, GenerateError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.reply.clone())
    }
}

fn test_config() -> DaemonConfig {
    // Point data_dir at a fresh temp dir so no host config.toml leaks in.
    let dir = tempfile::tempdir().expect("tempdir");
    DaemonConfig::new(Some(0), Some(dir.path().to_path_buf()), None, None)
}

fn context_with(backend: Arc<dyn GenerationBackend>) -> AppContext {
    AppContext::with_backend(test_config(), backend)
}

// ─── Mounting & language switching ───────────────────────────────────────────

#[tokio::test]
async fn actions_before_mount_are_rejected() {
    let ctx = context_with(Arc::new(Scripted::new("x")));
    let err = ctx.shell.generate("anything").await.unwrap_err();
    assert!(matches!(err, ShellError::MountNotReady));
    let err = ctx.shell.run().await.unwrap_err();
    assert!(matches!(err, ShellError::MountNotReady));
}

#[tokio::test]
async fn language_switch_resets_document_to_template_verbatim() {
    let ctx = context_with(Arc::new(Scripted::new("x")));
    let doc = ctx.shell.set_language("python").await.unwrap();
    let spec = languages::find("python").unwrap();
    assert_eq!(doc.text, spec.template);
    assert_eq!(doc.language, "python");

    // Switching again replaces user edits with the new template.
    ctx.shell.update_text("print('edited')".to_string()).await.unwrap();
    let doc = ctx.shell.set_language("javascript").await.unwrap();
    assert_eq!(doc.text, languages::find("javascript").unwrap().template);
}

#[tokio::test]
async fn unknown_language_is_an_error() {
    let ctx = context_with(Arc::new(Scripted::new("x")));
    let err = ctx.shell.set_language("cobol").await.unwrap_err();
    assert!(matches!(err, ShellError::UnknownLanguage(tag) if tag == "cobol"));
}

// ─── Generation + insertion ──────────────────────────────────────────────────

#[tokio::test]
async fn generate_inserts_fence_stripped_snippet_at_cursor() {
    let ctx = context_with(Arc::new(Scripted::new("```js\nX\n```")));
    ctx.shell.set_language("javascript").await.unwrap();
    ctx.shell.update_text("aaa\nbbb\nccc".to_string()).await.unwrap();
    ctx.shell
        .set_cursor(Position { line: 2, column: 1 })
        .await
        .unwrap();

    let text = ctx.shell.generate("insert X").await.unwrap();
    assert_eq!(text, "aaa\n\nXbbb\nccc");

    // The republished text is the new authoritative document state.
    let state = ctx.shell.state().await;
    assert_eq!(state.document.unwrap().text, text);
    assert_eq!(state.last_error, None);
}

#[tokio::test]
async fn rate_limit_rejection_leaves_document_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = DaemonConfig::new(Some(0), Some(dir.path().to_path_buf()), None, None);
    config.limiter.capacity = 1;
    let ctx = AppContext::with_backend(config, Arc::new(Scripted::new("snippet")));

    ctx.shell.set_language("javascript").await.unwrap();
    ctx.shell.update_text("base".to_string()).await.unwrap();

    assert!(ctx.shell.generate("first").await.is_ok());
    let before = ctx.shell.state().await.document.unwrap().text;

    let err = ctx.shell.generate("second").await.unwrap_err();
    assert!(matches!(
        err,
        ShellError::Generate(GenerateError::RateLimited)
    ));

    let state = ctx.shell.state().await;
    assert_eq!(state.document.unwrap().text, before, "failed generate must not mutate");
    assert!(state.last_error.unwrap().contains("rate limit"));
}

#[tokio::test]
async fn empty_endpoint_reply_surfaces_as_error() {
    let ctx = context_with(Arc::new(Scripted::new("   \n")));
    ctx.shell.set_language("javascript").await.unwrap();
    let err = ctx.shell.generate("anything").await.unwrap_err();
    assert!(matches!(
        err,
        ShellError::Generate(GenerateError::EmptyResponse)
    ));
}

#[tokio::test]
async fn concurrent_generation_is_rejected_not_queued() {
    let ctx = context_with(Arc::new(Scripted::slow("x", Duration::from_millis(300))));
    ctx.shell.set_language("javascript").await.unwrap();

    let shell = Arc::clone(&ctx.shell);
    let first = tokio::spawn(async move { shell.generate("slow one").await });

    // Give the first request time to take the in-flight flag.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let err = ctx.shell.generate("second").await.unwrap_err();
    assert!(matches!(err, ShellError::GenerationInFlight));

    // The original request still completes.
    assert!(first.await.unwrap().is_ok());
}

// ─── Run gating ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn non_executable_language_produces_no_records() {
    let ctx = context_with(Arc::new(Scripted::new("x")));
    ctx.shell.set_language("python").await.unwrap();
    let err = ctx.shell.run().await.unwrap_err();
    assert!(matches!(err, ShellError::NotExecutable(tag) if tag == "python"));
    assert!(ctx.shell.console_snapshot().is_empty());
}
