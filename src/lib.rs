//! RAGCHAT - Retrieval-Augmented Chatbot Service
//!
//! Stores embedded text messages in an append-only log and answers questions
//! by ranking them against the question embedding, then streaming a grounded
//! answer from an Ollama-compatible model service.

pub mod error;
pub mod metrics;
pub mod model;
pub mod observability;
pub mod persistence;
pub mod rag;
pub mod server;
pub mod storage;
pub mod vector;

#[cfg(test)]
mod test_utils;

pub use error::{RagError, Result};
pub use metrics::Metrics;
pub use model::{GenerationFragment, ModelClient, ModelConfig, OllamaClient};
pub use observability::{HealthCheck, HealthStatus};
pub use persistence::{AofConfig, AofSyncMode};
pub use rag::{Answer, RagConfig, RagOrchestrator};
pub use server::{build_router, AppState, Server, ServerConfig};
pub use storage::{EmbeddingStore, FileEmbeddingStore, MemoryEmbeddingStore, TextEmbedding, WriteHealth};
