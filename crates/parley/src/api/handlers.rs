//! HTTP request handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::Html,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::history::Message;
use crate::relay::Exchange;

use super::error::{ApiError, ApiResult};
use super::state::AppState;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Embedded chat UI.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
    pub provider_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_count: Option<i64>,
}

/// Health check endpoint. Reports 503 when the store cannot be queried.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let provider_configured = state.relay.is_configured();
    match state.store.count().await {
        Ok(count) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                version: env!("CARGO_PKG_VERSION"),
                database: "ok",
                provider_configured,
                message_count: Some(count),
            }),
        ),
        Err(e) => {
            warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    version: env!("CARGO_PKG_VERSION"),
                    database: "unavailable",
                    provider_configured,
                    message_count: None,
                }),
            )
        }
    }
}

/// Full conversation, oldest first.
pub async fn get_history(State(state): State<AppState>) -> ApiResult<Json<Vec<Message>>> {
    let messages = state
        .store
        .list_all()
        .await
        .map_err(|e| ApiError::storage("Failed to fetch chat history", &e))?;
    Ok(Json(messages))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

/// Submit one user message and return the stored exchange.
pub async fn send_message(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<Exchange>> {
    let Json(request) = payload.map_err(|rejection| {
        ApiError::bad_request(format!("Invalid request body: {}", rejection.body_text()))
    })?;

    let message = request.message.unwrap_or_default();
    let exchange = state.relay.submit(&message).await?;
    Ok(Json(exchange))
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub message: &'static str,
    pub deleted: u64,
}

/// Delete every stored message.
pub async fn clear_history(State(state): State<AppState>) -> ApiResult<Json<ClearResponse>> {
    let deleted = state
        .store
        .clear_all()
        .await
        .map_err(|e| ApiError::storage("Failed to clear history", &e))?;

    info!(deleted, "chat history cleared");
    Ok(Json(ClearResponse {
        message: "Chat history cleared",
        deleted,
    }))
}

/// Fallback for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::not_found("No such endpoint")
}
