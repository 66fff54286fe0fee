//! Model Service Configuration

use std::time::Duration;

/// Where the model service lives and which models to use
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Base URL of the Ollama-compatible service
    pub base_url: String,

    /// Model used for `/api/embeddings`
    pub embedding_model: String,

    /// Model used for `/api/generate`
    pub generation_model: String,

    /// Whole-request timeout, including reading a streamed body (None = unbounded)
    pub request_timeout: Option<Duration>,

    /// TCP connect timeout
    pub connect_timeout: Duration,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            generation_model: "llama3".to_string(),
            request_timeout: Some(Duration::from_secs(300)),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ModelConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn with_generation_model(mut self, model: impl Into<String>) -> Self {
        self.generation_model = model.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Full URL for an API path such as `api/generate`
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
