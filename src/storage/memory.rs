//! In-Memory Embedding Store
//!
//! Process-local store for tests and throwaway sessions.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::sync::Arc;

use super::{validate_message, EmbeddingStore, TextEmbedding};
use crate::error::Result;

/// Volatile embedding store
#[derive(Debug, Clone, Default)]
pub struct MemoryEmbeddingStore {
    records: Arc<RwLock<Vec<TextEmbedding>>>,
}

impl MemoryEmbeddingStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EmbeddingStore for MemoryEmbeddingStore {
    async fn append(&self, message: &str, vector: Bytes) -> Result<TextEmbedding> {
        validate_message(message)?;

        let mut records = self.records.write();
        let record = TextEmbedding {
            id: records.len() as u64 + 1,
            message: message.to_string(),
            vector,
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn scan_all(&self) -> Result<Vec<TextEmbedding>> {
        Ok(self.records.read().clone())
    }

    fn len(&self) -> usize {
        self.records.read().len()
    }
}
