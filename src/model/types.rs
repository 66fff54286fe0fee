//! Model Service Wire Types
//!
//! JSON shapes exchanged with an Ollama-compatible model service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of both embedding and generation requests
#[derive(Debug, Clone, Serialize)]
pub struct ModelRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
}

/// Embedding endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingResponse {
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

/// One line of a streamed generation response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateChunk {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub context: Option<Vec<i64>>,
    #[serde(default)]
    pub total_duration: Option<u64>,
    #[serde(default)]
    pub load_duration: Option<u64>,
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    #[serde(default)]
    pub prompt_eval_duration: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u32>,
    #[serde(default)]
    pub eval_duration: Option<u64>,
}

/// Incremental piece of a generated answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationFragment {
    pub text: String,
    /// Set on the terminating fragment of the stream
    pub is_final: bool,
}

impl GenerationFragment {
    pub fn new(text: impl Into<String>, is_final: bool) -> Self {
        Self {
            text: text.into(),
            is_final,
        }
    }
}

impl From<GenerateChunk> for GenerationFragment {
    fn from(chunk: GenerateChunk) -> Self {
        Self {
            text: chunk.response,
            is_final: chunk.done,
        }
    }
}
