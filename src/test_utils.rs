//! Test Fakes
//!
//! Scripted model client for pipeline and HTTP tests.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{RagError, Result};
use crate::model::{FragmentStream, GenerationFragment, ModelClient};

#[derive(Debug, Clone)]
enum ScriptItem {
    Fragment(GenerationFragment),
    Fail(String),
}

/// Model client with canned embeddings and a scripted generation stream
#[derive(Debug, Default)]
pub struct FakeModelClient {
    embeddings: HashMap<String, Vec<f32>>,
    fallback: Option<Vec<f32>>,
    script: Vec<ScriptItem>,
    fail_generate: bool,
    hang_after_script: bool,
    prompts: Mutex<Vec<String>>,
    embed_calls: AtomicUsize,
}

impl FakeModelClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `vector` when `text` is embedded
    pub fn with_embedding(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.embeddings.insert(text.to_string(), vector);
        self
    }

    /// Vector for any text without an explicit embedding
    pub fn with_fallback(mut self, vector: Vec<f32>) -> Self {
        self.fallback = Some(vector);
        self
    }

    /// Fragments to stream; the last one is marked final
    pub fn with_fragments(mut self, parts: &[&str]) -> Self {
        let last = parts.len().saturating_sub(1);
        self.script = parts
            .iter()
            .enumerate()
            .map(|(i, p)| ScriptItem::Fragment(GenerationFragment::new(*p, i == last)))
            .collect();
        self
    }

    /// Stream breaks after the first `n` scripted fragments
    pub fn failing_after(mut self, n: usize, reason: &str) -> Self {
        self.script.truncate(n);
        self.script.push(ScriptItem::Fail(reason.to_string()));
        self
    }

    /// `generate` itself fails
    pub fn failing_generate(mut self) -> Self {
        self.fail_generate = true;
        self
    }

    /// Stream never ends after the script
    pub fn hanging(mut self) -> Self {
        self.hang_after_script = true;
        self
    }

    /// Prompts passed to `generate`
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ModelClient for FakeModelClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_calls.fetch_add(1, Ordering::Relaxed);
        self.embeddings
            .get(text)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| RagError::EmbeddingUnavailable(format!("no embedding for {:?}", text)))
    }

    async fn generate(&self, prompt: &str) -> Result<FragmentStream> {
        self.prompts.lock().push(prompt.to_string());
        if self.fail_generate {
            return Err(RagError::GenerationFailed("connection refused".to_string()));
        }

        let items = stream::iter(self.script.clone()).map(|item| match item {
            ScriptItem::Fragment(f) => Ok(f),
            ScriptItem::Fail(reason) => Err(RagError::GenerationFailed(reason)),
        });

        if self.hang_after_script {
            Ok(items.chain(stream::pending()).boxed())
        } else {
            Ok(items.boxed())
        }
    }
}
