//! Error Types
//!
//! One error enum for the whole pipeline. Per-record failures
//! (`MalformedVector`, `DimensionMismatch`, `ZeroNorm`) are isolated by the
//! ranker; everything else aborts the request.

use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, RagError>;

/// Errors surfaced by the RAG pipeline
#[derive(Debug, Error)]
pub enum RagError {
    /// Stored vector bytes are not a whole number of f32 values.
    #[error("malformed vector: {len} bytes is not a multiple of 4")]
    MalformedVector { len: usize },

    /// Two vectors compared with different dimensionality.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Cosine similarity is undefined for a zero-length vector.
    #[error("zero-norm vector: cosine similarity is undefined")]
    ZeroNorm,

    /// Storage unreachable or a write did not commit.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The embedding endpoint failed or returned no embedding.
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The generation endpoint failed, before or during streaming.
    #[error("generation failed: {0}")]
    GenerationFailed(String),

    /// The question could not be embedded or the store could not be scanned.
    #[error("retrieval failed: {0}")]
    RetrievalFailed(String),

    /// The caller cancelled the request or its deadline passed.
    #[error("request cancelled: {0}")]
    Cancelled(String),

    /// Invalid configuration.
    #[error("invalid config: {0}")]
    Config(String),
}

impl RagError {
    /// True for errors that only disqualify a single stored record
    pub fn is_per_record(&self) -> bool {
        matches!(
            self,
            RagError::MalformedVector { .. } | RagError::DimensionMismatch { .. } | RagError::ZeroNorm
        )
    }

    /// Stable machine-readable code for API payloads and metrics
    pub fn code(&self) -> &'static str {
        match self {
            RagError::MalformedVector { .. } => "MALFORMED_VECTOR",
            RagError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            RagError::ZeroNorm => "ZERO_NORM",
            RagError::Persistence(_) => "PERSISTENCE_ERROR",
            RagError::EmbeddingUnavailable(_) => "EMBEDDING_UNAVAILABLE",
            RagError::GenerationFailed(_) => "GENERATION_FAILED",
            RagError::RetrievalFailed(_) => "RETRIEVAL_FAILED",
            RagError::Cancelled(_) => "CANCELLED",
            RagError::Config(_) => "CONFIG_ERROR",
        }
    }
}

impl From<std::io::Error> for RagError {
    fn from(e: std::io::Error) -> Self {
        RagError::Persistence(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RagError::MalformedVector { len: 7 };
        assert!(err.to_string().contains("7 bytes"));

        let err = RagError::DimensionMismatch {
            expected: 3,
            actual: 4,
        };
        assert_eq!(err.to_string(), "dimension mismatch: expected 3, got 4");
    }

    #[test]
    fn test_per_record_classification() {
        assert!(RagError::ZeroNorm.is_per_record());
        assert!(RagError::MalformedVector { len: 1 }.is_per_record());
        assert!(!RagError::Persistence("disk".into()).is_per_record());
        assert!(!RagError::GenerationFailed("eof".into()).is_per_record());
    }

    #[test]
    fn test_io_error_maps_to_persistence() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: RagError = io_err.into();
        assert_eq!(err.code(), "PERSISTENCE_ERROR");
        assert!(err.to_string().contains("read-only"));
    }
}
