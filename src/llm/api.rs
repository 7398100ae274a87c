//! OpenAI-compatible API backend for chat completions.
//!
//! Supports any server implementing `POST /v1/chat/completions`:
//! - LM Studio (`http://localhost:1234/v1`)
//! - Ollama (`http://localhost:11434`)
//! - vLLM, llama.cpp server, etc.

use crate::completion::ChatCompletion;
use crate::config::LlmConfig;
use crate::error::{AgentError, Result};
use crate::history::Message;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Chat-completion backend over an OpenAI-compatible HTTP API.
///
/// Requests are non-streaming: the whole reply is segmented for speech only
/// after it has been filtered.
pub struct ApiLlm {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
    temperature: f64,
    max_tokens: Option<u32>,
}

impl ApiLlm {
    /// Create a client for the configured server.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Config`] if the URL is empty or the HTTP client
    /// cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        if config.api_url.trim().is_empty() {
            return Err(AgentError::Config("llm.api_url is empty".to_owned()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| AgentError::Config(format!("cannot build HTTP client: {e}")))?;
        let url = completions_url(&config.api_url);

        info!("API LLM configured: {url} model={}", config.model);

        Ok(Self {
            client,
            url,
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn request_body(&self, messages: &[Message]) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": m.role.as_str(),
                    "content": m.content,
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
            "temperature": self.temperature,
        });
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        body
    }
}

#[async_trait]
impl ChatCompletion for ApiLlm {
    async fn complete(&self, messages: &[Message]) -> Result<Option<String>> {
        let started = Instant::now();
        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json");
        if !self.api_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = request
            .json(&self.request_body(messages))
            .send()
            .await
            .map_err(|e| AgentError::Completion(format!("API request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, &body_text));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AgentError::Completion(format!("invalid response JSON: {e}")))?;

        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .map(strip_think_blocks)
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty());

        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            messages = messages.len(),
            empty = content.is_none(),
            "completion finished"
        );
        Ok(content)
    }
}

/// `<base>/v1/chat/completions`, whether or not `api_url` already ends in `/v1`.
fn completions_url(api_url: &str) -> String {
    let base = api_url.trim_end_matches('/');
    let base = base.strip_suffix("/v1").unwrap_or(base);
    format!("{}/v1/chat/completions", base.trim_end_matches('/'))
}

fn map_http_error(status: reqwest::StatusCode, body: &str) -> AgentError {
    let message = extract_error_message(body);
    match status.as_u16() {
        401 => AgentError::Completion(format!("authentication failed: {message}")),
        429 => AgentError::Completion(format!("rate limited: {message}")),
        code => AgentError::Completion(format!("HTTP {code}: {message}")),
    }
}

/// Extract `error.message` from an OpenAI-style error body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Remove `<think>...</think>` reasoning blocks some models emit.
/// An unterminated block swallows the rest of the text.
fn strip_think_blocks(text: &str) -> String {
    const OPEN: &str = "<think>";
    const CLOSE: &str = "</think>";

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        match rest[start + OPEN.len()..].find(CLOSE) {
            Some(end) => rest = &rest[start + OPEN.len() + end + CLOSE.len()..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}
