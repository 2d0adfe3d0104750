use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use leadflow_core::config::{LlmConfig, LlmProvider};
use leadflow_core::domain::conversation::MessageRole;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const OPENAI_API_URL: &str = "https://api.openai.com";
const MAX_COMPLETION_TOKENS: u32 = 150;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// HTTP completion client. OpenAI-compatible chat completions cover both the
/// hosted API and local Ollama (same wire shape behind a different base
/// URL); Anthropic uses its messages API.
pub struct HttpLlmClient {
    client: Client,
    provider: LlmProvider,
    model: String,
    api_key: Option<SecretString>,
    base_url: Option<String>,
}

impl HttpLlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .context("failed to build llm http client")?;

        Ok(Self {
            client,
            provider: config.provider,
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
        })
    }

    async fn complete_chat(&self, request: &CompletionRequest) -> Result<String> {
        let base = self
            .base_url
            .as_deref()
            .unwrap_or(OPENAI_API_URL)
            .trim_end_matches('/')
            .to_owned();
        let url = format!("{base}/v1/chat/completions");

        let mut messages = vec![json!({"role": "system", "content": request.system})];
        messages.extend(request.messages.iter().map(|message| {
            json!({"role": message.role.as_str(), "content": message.content})
        }));

        let mut http_request = self.client.post(&url).json(&json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": MAX_COMPLETION_TOKENS,
        }));
        if let Some(api_key) = &self.api_key {
            http_request = http_request.bearer_auth(api_key.expose_secret());
        }

        let response = http_request.send().await.context("chat completion request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("chat completion rejected (status {status}): {body}"));
        }

        let payload: serde_json::Value =
            response.json().await.context("chat completion response was not JSON")?;
        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|content| content.trim().to_owned())
            .ok_or_else(|| anyhow!("chat completion response missing message content"))
    }

    async fn complete_anthropic(&self, request: &CompletionRequest) -> Result<String> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("anthropic provider requires an api key"))?;

        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(|message| json!({"role": message.role.as_str(), "content": message.content}))
            .collect();

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&json!({
                "model": self.model,
                "max_tokens": MAX_COMPLETION_TOKENS,
                "system": request.system,
                "messages": messages,
            }))
            .send()
            .await
            .context("anthropic completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("anthropic completion rejected (status {status}): {body}"));
        }

        let payload: serde_json::Value =
            response.json().await.context("anthropic response was not JSON")?;
        payload["content"][0]["text"]
            .as_str()
            .map(|content| content.trim().to_owned())
            .ok_or_else(|| anyhow!("anthropic response missing text content"))
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        match self.provider {
            LlmProvider::OpenAi | LlmProvider::Ollama => self.complete_chat(request).await,
            LlmProvider::Anthropic => self.complete_anthropic(request).await,
        }
    }
}
