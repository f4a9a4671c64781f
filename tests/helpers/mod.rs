#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use capmap::db;
use capmap::llm::{CompletionClient, EmbeddingClient, PromptPair, RawCompletion};
use rusqlite::Connection;

/// Open a fresh in-memory database with schema applied.
pub fn test_db() -> Connection {
    db::load_sqlite_vec();
    let conn = Connection::open_in_memory().unwrap();
    conn.pragma_update(None, "foreign_keys", "ON").unwrap();
    db::schema::init_schema(&conn).unwrap();
    conn
}

/// Build a `{"matched_capabilities": [...]}` payload from (capability, description) pairs.
pub fn response_json(matches: &[(&str, &str)]) -> String {
    let items: Vec<serde_json::Value> = matches
        .iter()
        .map(|(capability, description)| {
            serde_json::json!({"capability": capability, "description": description})
        })
        .collect();
    serde_json::json!({ "matched_capabilities": items }).to_string()
}

/// Completion client that answers prompt `i` with `responses[i]`.
pub struct ScriptedCompletions {
    responses: Vec<String>,
    pub batches: Mutex<Vec<Vec<PromptPair>>>,
}

impl ScriptedCompletions {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            batches: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletions {
    async fn complete_batch(&self, prompts: &[PromptPair]) -> anyhow::Result<Vec<RawCompletion>> {
        self.batches.lock().unwrap().push(prompts.to_vec());
        anyhow::ensure!(
            prompts.len() <= self.responses.len(),
            "no scripted response for prompt {}",
            self.responses.len()
        );
        Ok(self.responses[..prompts.len()]
            .iter()
            .map(|content| RawCompletion::new(content.clone()))
            .collect())
    }
}

/// Completion client that always fails, as a broken transport would.
pub struct FailingCompletions;

#[async_trait]
impl CompletionClient for FailingCompletions {
    async fn complete_batch(&self, _prompts: &[PromptPair]) -> anyhow::Result<Vec<RawCompletion>> {
        anyhow::bail!("connection reset by peer")
    }
}

/// Embedding client that records chunk sizes and returns a deterministic
/// `dims`-wide vector per text: a spike at `hash(text) % dims`.
pub struct RecordingEmbedder {
    pub dims: usize,
    pub calls: Mutex<Vec<Vec<String>>>,
}

impl RecordingEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_sizes(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(|c| c.len()).collect()
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let spike = text.bytes().fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
        let mut v = vec![0.0f32; self.dims];
        v[spike % self.dims] = 1.0;
        v
    }
}

#[async_trait]
impl EmbeddingClient for RecordingEmbedder {
    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.lock().unwrap().push(texts.to_vec());
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }
}
