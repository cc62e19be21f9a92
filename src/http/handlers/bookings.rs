use crate::domain::booking::CreateBookingRequest;
use crate::AppState;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use uuid::Uuid;

pub async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<CreateBookingRequest>,
) -> impl IntoResponse {
    match state.booking_service.create(req).await {
        Ok(resp) => (axum::http::StatusCode::CREATED, Json(resp)).into_response(),
        Err((status, body)) => (status, Json(body)).into_response(),
    }
}

pub async fn cancel_pending_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.booking_service.cancel_pending(booking_id, None).await {
        Ok(()) => (
            axum::http::StatusCode::OK,
            Json(serde_json::json!({"cancelled": true})),
        )
            .into_response(),
        Err((status, body)) => (status, Json(body)).into_response(),
    }
}

pub async fn health() -> impl IntoResponse {
    (axum::http::StatusCode::OK, "ok")
}
