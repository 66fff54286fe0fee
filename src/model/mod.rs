//! Model Module
//!
//! Client side of the remote model service: one-shot embedding requests and
//! streamed generation requests.

mod codec;
mod config;
mod ollama;
mod types;

pub use codec::{ChunkCodec, DEFAULT_MAX_LINE_LENGTH};
pub use config::ModelConfig;
pub use ollama::OllamaClient;
pub use types::{EmbeddingResponse, GenerateChunk, GenerationFragment, ModelRequest};

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;

/// Single-pass stream of generation fragments.
///
/// Items arrive as the service produces them. An `Err` item means the
/// stream broke and nothing after it can be trusted.
pub type FragmentStream = BoxStream<'static, Result<GenerationFragment>>;

/// The two remote capabilities the pipeline depends on
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Embed `text` into a vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Start generating a completion for `prompt`
    async fn generate(&self, prompt: &str) -> Result<FragmentStream>;
}
