//! Request Handlers
//!
//! Thin adapters from HTTP bodies to orchestrator calls. Every handler
//! records its outcome in [`Metrics`](crate::metrics::Metrics).

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use std::time::Instant;
use tracing::debug;

use super::error::ApiError;
use super::AppState;
use crate::metrics::MetricsSnapshot;
use crate::observability::{HealthStatus, SystemHealth};
use crate::rag::Answer;
use crate::storage::{TextEmbedding, MAX_MESSAGE_CHARS};

/// Body of a successful `/chatbot/ask`
#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
}

/// Body of `/health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    #[serde(flatten)]
    pub health: SystemHealth,
    pub records: usize,
}

/// Unwrap a JSON string body, rejecting blank or oversized text
fn text_body(body: Result<Json<String>, JsonRejection>) -> Result<String, ApiError> {
    let Json(text) = body?;
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest("text must not be empty".to_string()));
    }
    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::BadRequest(format!(
            "text exceeds {} characters",
            MAX_MESSAGE_CHARS
        )));
    }
    Ok(text)
}

/// `POST /chatbot/embedding`
pub async fn embed_message(
    State(state): State<AppState>,
    body: Result<Json<String>, JsonRejection>,
) -> Result<Json<TextEmbedding>, ApiError> {
    let start = Instant::now();

    let result = match text_body(body) {
        Ok(message) => state.rag.ingest(&message).await.map_err(ApiError::from),
        Err(e) => Err(e),
    };

    state
        .metrics
        .record_operation("ingest", start.elapsed(), result.is_ok());
    debug!(latency = ?start.elapsed(), ok = result.is_ok(), "Ingest handled");
    result.map(Json)
}

/// `POST /chatbot/ask`
pub async fn ask_question(
    State(state): State<AppState>,
    body: Result<Json<String>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let start = Instant::now();
    let cancel = state.shutdown.child_token();

    let result = match text_body(body) {
        Ok(question) => state
            .rag
            .ask_with_cancel(&question, &cancel)
            .await
            .map_err(ApiError::from),
        Err(e) => Err(e),
    };

    state
        .metrics
        .record_operation("ask", start.elapsed(), result.is_ok());
    debug!(latency = ?start.elapsed(), ok = result.is_ok(), "Ask handled");

    match result? {
        Answer::Grounded { text, .. } => Ok(Json(AskResponse { answer: text })),
        Answer::NoContext => Err(ApiError::NoContext),
    }
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let health = state.health.check();
    let status = match health.overall {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    let body = HealthResponse {
        health,
        records: state.rag.store().len(),
    };
    (status, Json(body))
}

/// `GET /metrics`
pub async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
