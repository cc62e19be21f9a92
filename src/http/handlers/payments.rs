use crate::AppState;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct VoidRequest {
    pub reason: String,
}

pub async fn authorize(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.payment_service.authorize(booking_id).await {
        Ok(resp) => (axum::http::StatusCode::OK, Json(resp)).into_response(),
        Err(e) => {
            let (status, body) = e.http();
            (status, Json(body)).into_response()
        }
    }
}

pub async fn capture(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.payment_service.capture(booking_id).await {
        Ok(resp) => (axum::http::StatusCode::OK, Json(resp)).into_response(),
        Err(e) => {
            let (status, body) = e.http();
            (status, Json(body)).into_response()
        }
    }
}

pub async fn void(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<VoidRequest>,
) -> impl IntoResponse {
    match state.payment_service.void(booking_id, &req.reason).await {
        Ok(resp) => (axum::http::StatusCode::OK, Json(resp)).into_response(),
        Err(e) => {
            let (status, body) = e.http();
            (status, Json(body)).into_response()
        }
    }
}
