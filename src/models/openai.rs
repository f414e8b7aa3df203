//! OpenAI chat-completions provider.
//!
//! Works with the official API and with any server that implements the
//! same interface (OpenRouter, Ollama, vLLM, LM Studio, ...) via a
//! custom base URL.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::{ChatMessage, ModelProvider, ProviderResponse, TokenUsage};

/// Default API base for OpenAI.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Provider that talks to an OpenAI-compatible chat completions API.
pub struct OpenAIProvider {
    api_key: String,
    endpoint: String,
    client: Client,
    /// Model name sent in the request body (e.g. "gpt-4").
    model: String,
}

impl OpenAIProvider {
    /// Create a provider for `model` at `base_url` (e.g.
    /// `https://api.openai.com/v1`).  `/chat/completions` is appended.
    ///
    /// `api_key` may be empty for local servers that don't require auth.
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            api_key: api_key.into(),
            endpoint: chat_endpoint(base_url),
            client,
            model: model.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, messages: &[ChatMessage], functions: &[serde_json::Value]) -> serde_json::Value {
        let mut body = json!({
            "model": self.model,
            "messages": super::serialize_messages(messages),
            "temperature": 0,
        });
        if !functions.is_empty() {
            body["tools"] = serde_json::Value::Array(functions.to_vec());
            body["tool_choice"] = json!("auto");
        }
        body
    }
}

/// Join `base_url` and the chat completions path without doubling slashes.
fn chat_endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

#[async_trait]
impl ModelProvider for OpenAIProvider {
    async fn send_chat_with_functions(
        &self,
        messages: &[ChatMessage],
        functions: &[serde_json::Value],
    ) -> Result<(ProviderResponse, Option<TokenUsage>), anyhow::Error> {
        let body = self.request_body(messages, functions);

        let mut req = self.client.post(&self.endpoint).json(&body);
        if !self.api_key.is_empty() {
            req = req.bearer_auth(&self.api_key);
        }
        let resp = req
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.endpoint))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API returned {status}: {text}");
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .context("OpenAI API returned a non-JSON body")?;
        let usage = super::parse_token_usage(&json);

        if let Some(pr) = super::parse_tool_calls(&json) {
            return Ok((pr, usage));
        }

        let Some(message) = json["choices"].get(0).map(|c| &c["message"]) else {
            anyhow::bail!("OpenAI API response has no choices");
        };
        let content = message["content"].as_str().unwrap_or("").to_string();

        Ok((ProviderResponse::Final(content), usage))
    }
}
