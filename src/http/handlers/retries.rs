use crate::domain::webhook::WebhookProvider;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

pub async fn list_dead_letter(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    match state.retry_engine.webhook_retry_repo.list_dead_letter(limit).await {
        Ok(rows) => (axum::http::StatusCode::OK, Json(rows)).into_response(),
        Err(e) => internal(e),
    }
}

pub async fn retry_dead_letter(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.retry_engine.retry_dead_letter(id).await {
        Ok(true) => (
            axum::http::StatusCode::OK,
            Json(serde_json::json!({"requeued": true})),
        )
            .into_response(),
        Ok(false) => (
            axum::http::StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "no dead-letter record with that id"})),
        )
            .into_response(),
        Err(e) => internal(e),
    }
}

pub async fn process_due(State(state): State<AppState>) -> impl IntoResponse {
    match state.retry_engine.process_due(100).await {
        Ok(summary) => (axum::http::StatusCode::OK, Json(summary)).into_response(),
        Err(e) => internal(e),
    }
}

pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    match state.retry_engine.stats().await {
        Ok(counts) => (axum::http::StatusCode::OK, Json(counts)).into_response(),
        Err(e) => internal(e),
    }
}

pub async fn list_booking_events(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.booking_events_repo.list_for_booking(booking_id).await {
        Ok(events) => (axum::http::StatusCode::OK, Json(events)).into_response(),
        Err(e) => internal(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct RotateSecretRequest {
    pub secret: String,
}

pub async fn rotate_provider_secret(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Json(req): Json<RotateSecretRequest>,
) -> impl IntoResponse {
    let Some(provider) = WebhookProvider::parse(&provider.to_uppercase()) else {
        return (
            axum::http::StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "unknown provider"})),
        )
            .into_response();
    };

    match state
        .secret_cache
        .provider_repo
        .rotate_secret(provider.as_str(), &req.secret)
        .await
    {
        Ok(true) => {
            state.secret_cache.invalidate(provider).await;
            (
                axum::http::StatusCode::OK,
                Json(serde_json::json!({"rotated": true})),
            )
                .into_response()
        }
        Ok(false) => (
            axum::http::StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "provider not configured"})),
        )
            .into_response(),
        Err(e) => internal(e),
    }
}

fn internal(e: anyhow::Error) -> axum::response::Response {
    (
        axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": e.to_string()})),
    )
        .into_response()
}
