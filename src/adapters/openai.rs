//! OpenAI-compatible chat-completions judge.
//!
//! Models are given as `provider:model` (e.g. `openrouter:meta-llama/llama-4-maverick`).
//! A bare model name uses OpenAI. Every supported provider speaks the same
//! chat-completions wire format, only the base URL and key differ.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{JudgeBackend, JudgeReply, JudgeRequest};

/// Env var overriding the Ollama base URL
pub const OLLAMA_URL_ENV: &str = "SPANJUDGE_OLLAMA_URL";

/// Providers reachable through the chat-completions API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    OpenAi,
    OpenRouter,
    Gemini,
    Ollama,
}

impl Provider {
    /// Parse a provider prefix; unknown prefixes are `None`
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "openrouter" => Some(Self::OpenRouter),
            "gemini" => Some(Self::Gemini),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::OpenRouter => "https://openrouter.ai/api/v1",
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
            Provider::Ollama => "http://localhost:11434/v1",
        }
    }

    /// Env var holding the API key (Ollama needs none)
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAi => Some("OPENAI_API_KEY"),
            Provider::OpenRouter => Some("OPENROUTER_API_KEY"),
            Provider::Gemini => Some("GOOGLE_API_KEY"),
            Provider::Ollama => None,
        }
    }
}

/// Split `provider:model`; a spec without a known provider prefix is an
/// OpenAI model name.
pub fn parse_model_spec(spec: &str) -> (Provider, String) {
    if let Some((prefix, model)) = spec.split_once(':') {
        if let Some(provider) = Provider::parse(prefix) {
            return (provider, model.to_string());
        }
    }
    (Provider::OpenAi, spec.to_string())
}

/// Chat-completions judge
pub struct OpenAiJudge {
    provider: Provider,
    model: String,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiJudge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiJudge")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl OpenAiJudge {
    /// Create a judge with explicit endpoint settings
    pub fn new(
        provider: Provider,
        model: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to build HTTP client for judge")?;

        Ok(Self {
            provider,
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    /// Create a judge from a `provider:model` spec, reading keys from the
    /// environment. Fails when the provider's key is not set.
    pub fn from_env(model_spec: &str, request_timeout: Duration) -> Result<Self> {
        Self::from_lookup(model_spec, request_timeout, |name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable lookup
    pub fn from_lookup<F>(model_spec: &str, request_timeout: Duration, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (provider, model) = parse_model_spec(model_spec);
        if model.trim().is_empty() {
            anyhow::bail!("Judge model spec '{}' has no model name", model_spec);
        }

        let api_key = match provider.api_key_env() {
            Some(var) => Some(
                lookup(var)
                    .filter(|k| !k.trim().is_empty())
                    .with_context(|| {
                        format!("{} environment variable required for judge '{}'", var, model_spec)
                    })?,
            ),
            None => None,
        };

        let base_url = match provider {
            Provider::Ollama => lookup(OLLAMA_URL_ENV)
                .unwrap_or_else(|| provider.default_base_url().to_string()),
            _ => provider.default_base_url().to_string(),
        };

        Self::new(provider, model, base_url, api_key, request_timeout)
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Send one chat completion and return the message content
    async fn complete(&self, system: String, user: String) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Some(system),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Some(user),
                },
            ],
        };

        let response = self
            .authorized(self.client.post(self.endpoint("chat/completions")))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to reach judge model '{}'", self.model))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Judge API error ({}): {}", status, text.trim());
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("Failed to parse judge API response")?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .context("Judge API response has no message content")
    }
}

#[async_trait]
impl JudgeBackend for OpenAiJudge {
    fn name(&self) -> &str {
        "openai"
    }

    async fn judge(&self, request: &JudgeRequest) -> Result<JudgeReply> {
        let content = self
            .complete(request.system_prompt(), request.user_prompt())
            .await?;
        debug!(model = %self.model, len = content.len(), "Judge responded");
        Ok(JudgeReply::parse(&content)?)
    }

    async fn health_check(&self) -> Result<()> {
        let response = self
            .authorized(self.client.get(self.endpoint("models")))
            .send()
            .await
            .context("Failed to reach judge API")?;

        if !response.status().is_success() {
            anyhow::bail!("Judge API health check failed: {}", response.status());
        }
        Ok(())
    }
}
