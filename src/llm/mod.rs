//! LLM completion and embedding collaborators.
//!
//! The mapping pipeline only sees the [`CompletionClient`] and
//! [`EmbeddingClient`] traits. Both are order-preserving batch interfaces:
//! output `i` always belongs to input `i`. Providers are created from
//! configuration via [`create_completion_client`] and
//! [`create_embedding_client`].

pub mod openai;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A system/user message pair sent as one chat completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

/// The textual payload of one completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCompletion {
    pub content: String,
}

impl RawCompletion {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Running token totals reported by a completion backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Batch chat-completion backend.
///
/// The batch is atomic: if any request fails the whole call fails, so a
/// successful result always has one entry per prompt in input order.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete_batch(&self, prompts: &[PromptPair]) -> Result<Vec<RawCompletion>>;

    /// Tokens consumed so far by this client. Backends that do not report
    /// usage return zeros.
    fn usage(&self) -> TokenUsage {
        TokenUsage::default()
    }
}

/// Batch text-embedding backend. Returns one vector per input text, in order.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Create a completion client from config.
///
/// Currently only `"openai"` (any OpenAI-compatible endpoint) is supported.
pub fn create_completion_client(
    config: &crate::config::LlmConfig,
) -> Result<Box<dyn CompletionClient>> {
    match config.provider.as_str() {
        "openai" => {
            let client = openai::OpenAiCompletionClient::new(config)?;
            Ok(Box::new(client))
        }
        other => anyhow::bail!("unknown completion provider: {other}. Supported: openai"),
    }
}

/// Create an embedding client from config.
pub fn create_embedding_client(
    config: &crate::config::EmbeddingConfig,
    timeout_secs: u64,
) -> Result<Box<dyn EmbeddingClient>> {
    match config.provider.as_str() {
        "openai" => {
            let client = openai::OpenAiEmbeddingClient::new(config, timeout_secs)?;
            Ok(Box::new(client))
        }
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: openai"),
    }
}
