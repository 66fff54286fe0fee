//! Ollama Client
//!
//! reqwest implementation of [`ModelClient`] for an Ollama-compatible service.

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, Response};
use std::io;
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;
use tracing::{debug, instrument};

use super::codec::ChunkCodec;
use super::config::ModelConfig;
use super::types::{EmbeddingResponse, GenerateChunk, GenerationFragment, ModelRequest};
use super::{FragmentStream, ModelClient};
use crate::error::{RagError, Result};

const EMBEDDINGS_PATH: &str = "api/embeddings";
const GENERATE_PATH: &str = "api/generate";

/// HTTP client for the model service
#[derive(Debug, Clone)]
pub struct OllamaClient {
    config: ModelConfig,
    http: Client,
}

impl OllamaClient {
    /// Build a client from configuration
    pub fn new(config: ModelConfig) -> Result<Self> {
        let mut builder = Client::builder().connect_timeout(config.connect_timeout);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| RagError::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    /// Client against `base_url` with default models
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Self::new(ModelConfig::default().with_base_url(base_url))
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    async fn post(&self, path: &str, model: &str, prompt: &str) -> reqwest::Result<Response> {
        self.http
            .post(self.config.endpoint(path))
            .json(&ModelRequest { model, prompt })
            .send()
            .await
    }
}

/// Short description of a non-success response
async fn status_error(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let body = body.trim();
    if body.is_empty() {
        format!("model service returned {}", status)
    } else {
        format!("model service returned {}: {}", status, body)
    }
}

fn log_final_chunk(chunk: &GenerateChunk) {
    if chunk.done {
        debug!(
            model = chunk.model.as_deref().unwrap_or_default(),
            done_reason = chunk.done_reason.as_deref().unwrap_or_default(),
            total_duration_ns = chunk.total_duration,
            prompt_eval_count = chunk.prompt_eval_count,
            eval_count = chunk.eval_count,
            eval_duration_ns = chunk.eval_duration,
            "Generation finished"
        );
    }
}

#[async_trait]
impl ModelClient for OllamaClient {
    #[instrument(skip(self, text), fields(model = %self.config.embedding_model, len = text.len()))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .post(EMBEDDINGS_PATH, &self.config.embedding_model, text)
            .await
            .map_err(|e| RagError::EmbeddingUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RagError::EmbeddingUnavailable(status_error(response).await));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RagError::EmbeddingUnavailable(format!("bad response body: {}", e)))?;

        match body.embedding {
            Some(embedding) if !embedding.is_empty() => {
                debug!(dimension = embedding.len(), "Embedding received");
                Ok(embedding)
            }
            _ => Err(RagError::EmbeddingUnavailable(
                "response carried no embedding".to_string(),
            )),
        }
    }

    #[instrument(skip(self, prompt), fields(model = %self.config.generation_model, len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<FragmentStream> {
        let response = self
            .post(GENERATE_PATH, &self.config.generation_model, prompt)
            .await
            .map_err(|e| RagError::GenerationFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RagError::GenerationFailed(status_error(response).await));
        }

        let body = StreamReader::new(response.bytes_stream().map_err(io::Error::other));
        let fragments = FramedRead::new(body, ChunkCodec::new()).map(|item| match item {
            Ok(chunk) => {
                log_final_chunk(&chunk);
                Ok(GenerationFragment::from(chunk))
            }
            Err(e) => Err(RagError::GenerationFailed(format!("stream interrupted: {}", e))),
        });

        Ok(Box::pin(fragments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup() -> (MockServer, OllamaClient) {
        let server = MockServer::start().await;
        let client = OllamaClient::with_base_url(server.uri()).unwrap();
        (server, client)
    }

    #[tokio::test]
    async fn test_embed_success() {
        let (server, client) = setup().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .and(body_json(json!({"model": "nomic-embed-text", "prompt": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embedding": [0.1, 0.2, 0.3]})))
            .expect(1)
            .mount(&server)
            .await;

        let embedding = client.embed("hello").await.unwrap();
        assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_embed_null_embedding() {
        let (server, client) = setup().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embedding": null})))
            .mount(&server)
            .await;

        let err = client.embed("hello").await.unwrap_err();
        assert!(matches!(err, RagError::EmbeddingUnavailable(_)));
    }

    #[tokio::test]
    async fn test_embed_error_status() {
        let (server, client) = setup().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&server)
            .await;

        let err = client.embed("hello").await.unwrap_err();
        match err {
            RagError::EmbeddingUnavailable(msg) => assert!(msg.contains("model not loaded")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_embed_unreachable() {
        let client = OllamaClient::with_base_url("http://127.0.0.1:9").unwrap();
        let err = client.embed("hello").await.unwrap_err();
        assert!(matches!(err, RagError::EmbeddingUnavailable(_)));
    }

    #[tokio::test]
    async fn test_generate_streams_fragments() {
        let (server, client) = setup().await;
        let body = concat!(
            "{\"model\":\"llama3\",\"created_at\":\"2024-05-01T10:00:00Z\",\"response\":\"Hel\",\"done\":false}\n",
            "\n",
            "{\"model\":\"llama3\",\"created_at\":\"2024-05-01T10:00:01Z\",\"response\":\"lo\",\"done\":false}\n",
            "garbage line\n",
            "{\"model\":\"llama3\",\"created_at\":\"2024-05-01T10:00:02Z\",\"response\":\" world\",\"done\":true,\"eval_count\":3}"
        );
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_json(json!({"model": "llama3", "prompt": "say hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
            .mount(&server)
            .await;

        let stream = client.generate("say hello").await.unwrap();
        let fragments: Vec<_> = stream.map(|f| f.unwrap()).collect().await;

        assert_eq!(
            fragments,
            vec![
                GenerationFragment::new("Hel", false),
                GenerationFragment::new("lo", false),
                GenerationFragment::new(" world", true),
            ]
        );
    }

    #[tokio::test]
    async fn test_generate_error_status() {
        let (server, client) = setup().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "model 'llama3' not found"})))
            .mount(&server)
            .await;

        let err = client.generate("hi").await.err().unwrap();
        assert!(matches!(err, RagError::GenerationFailed(_)));
    }
}
