//! OpenAI-compatible HTTP clients for chat completions and embeddings.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{CompletionClient, EmbeddingClient, PromptPair, RawCompletion, TokenUsage};
use crate::config::{EmbeddingConfig, LlmConfig};

/// Chat completions client. Requests inside a batch run concurrently up to
/// `max_concurrency`, and results are yielded in input order.
pub struct OpenAiCompletionClient {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_concurrency: usize,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
}

impl OpenAiCompletionClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = build_http_client(&config.api_key_env, config.timeout_secs)?;
        Self::with_client(client, config)
    }

    /// Use a prebuilt HTTP client. Auth headers and timeouts are its own.
    pub fn with_client(client: Client, config: &LlmConfig) -> Result<Self> {
        anyhow::ensure!(!config.model.trim().is_empty(), "missing completion model name");
        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        tracing::info!(model = %config.model, endpoint = %endpoint, "completion client ready");

        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
            temperature: config.temperature,
            max_concurrency: config.max_concurrency.max(1),
            prompt_tokens: AtomicU64::new(0),
            completion_tokens: AtomicU64::new(0),
        })
    }

    async fn complete_one(&self, prompt: &PromptPair) -> Result<RawCompletion> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .context("failed to call chat completions")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            bail!("chat completions returned {status}: {text}");
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .context("failed to parse chat completions response")?;

        if let Some(usage) = &parsed.usage {
            self.prompt_tokens
                .fetch_add(usage.prompt_tokens, Ordering::Relaxed);
            self.completion_tokens
                .fetch_add(usage.completion_tokens, Ordering::Relaxed);
        }

        parsed.into_completion()
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete_batch(&self, prompts: &[PromptPair]) -> Result<Vec<RawCompletion>> {
        let requests: Vec<_> = prompts.iter().map(|prompt| self.complete_one(prompt)).collect();

        // `buffered` keeps output order equal to input order.
        let completions: Vec<RawCompletion> = futures::stream::iter(requests)
            .buffered(self.max_concurrency)
            .try_collect()
            .await?;

        let usage = self.usage();
        tracing::info!(
            requests = prompts.len(),
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "completion batch finished"
        );

        Ok(completions)
    }

    fn usage(&self) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.completion_tokens.load(Ordering::Relaxed),
        }
    }
}

/// Embeddings client for `/embeddings`.
pub struct OpenAiEmbeddingClient {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbeddingClient {
    pub fn new(config: &EmbeddingConfig, timeout_secs: u64) -> Result<Self> {
        let client = build_http_client(&config.api_key_env, timeout_secs)?;
        Self::with_client(client, config)
    }

    pub fn with_client(client: Client, config: &EmbeddingConfig) -> Result<Self> {
        anyhow::ensure!(!config.model.trim().is_empty(), "missing embedding model name");
        let endpoint = format!("{}/embeddings", config.base_url.trim_end_matches('/'));

        tracing::info!(model = %config.model, dimensions = config.dimensions, "embedding client ready");

        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: Some(self.dimensions),
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .context("failed to call embeddings")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            bail!("embeddings request failed ({status}): {body}");
        }

        let parsed: EmbeddingResponse = resp
            .json()
            .await
            .context("failed to parse embeddings response")?;

        parsed.into_vectors(texts.len())
    }
}

/// Build a reqwest client with bearer auth read from `api_key_env`.
fn build_http_client(api_key_env: &str, timeout_secs: u64) -> Result<Client> {
    let api_key = std::env::var(api_key_env)
        .with_context(|| format!("environment variable {api_key_env} is not set"))?;
    anyhow::ensure!(!api_key.trim().is_empty(), "{api_key_env} is empty");

    let mut headers = HeaderMap::new();
    let auth = format!("Bearer {}", api_key.trim());
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&auth).context("invalid API key")?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .default_headers(headers)
        .build()
        .context("failed to build HTTP client")
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

impl ChatResponse {
    fn into_completion(self) -> Result<RawCompletion> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .context("chat completions response had no choices")?;
        Ok(RawCompletion::new(choice.message.content.unwrap_or_default()))
    }
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

impl EmbeddingResponse {
    /// Order vectors by their `index` field and check the count.
    fn into_vectors(mut self, expected: usize) -> Result<Vec<Vec<f32>>> {
        self.data.sort_by_key(|entry| entry.index);
        anyhow::ensure!(
            self.data.len() == expected,
            "embeddings endpoint returned {} vectors for {} inputs",
            self.data.len(),
            expected
        );
        Ok(self.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
