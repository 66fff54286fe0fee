//! HTTP Error Mapping

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::RagError;
use crate::rag::NO_CONTEXT_MESSAGE;

/// Errors surfaced by the HTTP handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Nothing stored could ground an answer
    #[error("{}", NO_CONTEXT_MESSAGE)]
    NoContext,

    #[error(transparent)]
    Rag(#[from] RagError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NoContext => StatusCode::NOT_FOUND,
            ApiError::Rag(e) => match e {
                RagError::EmbeddingUnavailable(_)
                | RagError::GenerationFailed(_)
                | RagError::RetrievalFailed(_) => StatusCode::BAD_GATEWAY,
                RagError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
                RagError::Cancelled(_) => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::BAD_REQUEST,
            },
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::NoContext => "NO_CONTEXT",
            ApiError::Rag(e) => e.code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            ApiError::NoContext => json!({
                "error": self.to_string(),
                "no_context": true,
            }),
            _ => json!({
                "error": self.to_string(),
                "code": self.error_code(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
