//! Storage Module
//!
//! Append-only embedding store: records are added once and read back with a
//! full scan. No index, no filter, no pagination.

mod file;
mod memory;

pub use file::FileEmbeddingStore;
pub use memory::MemoryEmbeddingStore;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Longest message a record may hold, in characters
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// A persisted (message, vector) record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEmbedding {
    /// Store-assigned identifier
    pub id: u64,
    /// The text that was embedded
    pub message: String,
    /// Little-endian f32 bytes, see [`crate::vector::codec`]
    pub vector: Bytes,
}

/// Durable collection of embedded messages.
///
/// Implementations must tolerate concurrent `append` and `scan_all` callers.
#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    /// Persist a record and return it with its fresh id
    async fn append(&self, message: &str, vector: Bytes) -> Result<TextEmbedding>;

    /// Every committed record, in append order
    async fn scan_all(&self) -> Result<Vec<TextEmbedding>>;

    /// Number of committed records
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether appends are currently going through
    fn write_health(&self) -> WriteHealth {
        WriteHealth::Ok
    }
}

/// State of a store's write path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteHealth {
    Ok,
    /// The most recent append failed and was rolled back
    LastAppendFailed(String),
    /// Appends are refused until the store is reopened
    ReadOnly(String),
}

/// Reject messages the persisted layout cannot hold
pub(crate) fn validate_message(message: &str) -> Result<()> {
    let chars = message.chars().count();
    if chars > MAX_MESSAGE_CHARS {
        return Err(RagError::Persistence(format!(
            "message is {} characters, limit is {}",
            chars, MAX_MESSAGE_CHARS
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_message_counts_chars() {
        assert!(validate_message(&"a".repeat(MAX_MESSAGE_CHARS)).is_ok());
        // multi-byte characters count once
        assert!(validate_message(&"é".repeat(MAX_MESSAGE_CHARS)).is_ok());

        let err = validate_message(&"a".repeat(MAX_MESSAGE_CHARS + 1)).unwrap_err();
        assert!(matches!(err, RagError::Persistence(_)));
    }

    #[test]
    fn test_record_serializes_vector_as_bytes() {
        let record = TextEmbedding {
            id: 7,
            message: "hi".into(),
            vector: Bytes::from_static(&[0, 0, 128, 63]),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["message"], "hi");
        assert_eq!(json["vector"], serde_json::json!([0, 0, 128, 63]));
    }
}
