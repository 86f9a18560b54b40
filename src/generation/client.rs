// SPDX-License-Identifier: MIT
//! Rate-limited client for the external generation endpoint.
//!
//! One `generate` call is one request/response round trip: acquire a token,
//! build the prompt, ask the backend, clean the answer. No caching, no retry,
//! no streaming. The endpoint itself sits behind the `GenerationBackend`
//! trait so tests can script responses without a network.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::GenerationConfig;
use crate::error::GenerateError;
use crate::generation::prompt::{build_generation_prompt, strip_code_fences};
use crate::limiter::RateLimiter;

/// Opaque request/response seam to the generative-model service.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Send one prompt and return the raw model text.
    async fn complete(&self, prompt: &str) -> Result<String, GenerateError>;
}

// ─── HTTP backend ────────────────────────────────────────────────────────────

/// Backend for a Gemini-style `models/{model}:generateContent` REST endpoint.
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl HttpBackend {
    pub fn new(cfg: &GenerationConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: cfg.api_base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
        }
    }
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    async fn complete(&self, prompt: &str) -> Result<String, GenerateError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerateError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(GenerateError::Upstream(format!("HTTP {status}: {detail}")));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| GenerateError::Upstream(format!("invalid response body: {e}")))?;

        extract_candidate_text(&payload)
            .ok_or_else(|| GenerateError::Upstream("malformed generateContent response".to_string()))
    }
}

/// Dig `candidates[0].content.parts[0].text` out of a generateContent reply.
fn extract_candidate_text(payload: &Value) -> Option<String> {
    payload
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
        .map(str::to_string)
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Builds prompts, gates them through the token bucket, and normalizes
/// whatever the backend returns into a bare code fragment.
pub struct GenerationClient {
    limiter: RateLimiter,
    backend: Arc<dyn GenerationBackend>,
}

impl GenerationClient {
    pub fn new(limiter: RateLimiter, backend: Arc<dyn GenerationBackend>) -> Self {
        Self { limiter, backend }
    }

    /// Generate a snippet for `instruction` against the current editor
    /// content. Fails fast with `RateLimited` when no token is available.
    pub async fn generate(
        &self,
        existing_code: &str,
        instruction: &str,
        language: &str,
    ) -> Result<String, GenerateError> {
        if !self.limiter.try_acquire() {
            warn!(language, "generation request rejected by rate limiter");
            return Err(GenerateError::RateLimited);
        }

        let prompt = build_generation_prompt(existing_code, instruction, language);
        debug!(language, prompt_len = prompt.len(), "sending generation request");

        let raw = self.backend.complete(&prompt).await?;
        let cleaned = strip_code_fences(&raw);
        if cleaned.is_empty() {
            return Err(GenerateError::EmptyResponse);
        }
        Ok(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Scripted(&'static str);

    #[async_trait]
    impl GenerationBackend for Scripted {
        async fn complete(&self, _prompt: &str) -> Result<String, GenerateError> {
            Ok(self.0.to_string())
        }
    }

    fn client_with(raw: &'static str, capacity: u32) -> GenerationClient {
        GenerationClient::new(
            RateLimiter::new(capacity, Duration::from_secs(60)),
            Arc::new(Scripted(raw)),
        )
    }

    #[tokio::test]
    async fn strips_fences_from_backend_reply() {
        let client = client_with("```js\nconsole.log(1)\n```", 10);
        let snippet = client.generate("", "log one", "javascript").await.unwrap();
        assert_eq!(snippet, "console.log(1)");
    }

    #[tokio::test]
    async fn rate_limit_fails_fast_without_calling_backend() {
        let client = client_with("x", 1);
        assert!(client.generate("", "a", "javascript").await.is_ok());
        let err = client.generate("", "b", "javascript").await.unwrap_err();
        assert!(matches!(err, GenerateError::RateLimited));
    }

    #[tokio::test]
    async fn blank_reply_is_an_empty_response_error() {
        let client = client_with("   \n  ", 10);
        let err = client.generate("", "anything", "javascript").await.unwrap_err();
        assert!(matches!(err, GenerateError::EmptyResponse));
    }

    #[test]
    fn candidate_text_extraction() {
        let payload = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "let x = 1;" }] } }]
        });
        assert_eq!(extract_candidate_text(&payload).as_deref(), Some("let x = 1;"));
        assert!(extract_candidate_text(&serde_json::json!({ "candidates": [] })).is_none());
    }
}
