use crate::domain::webhook::WebhookProvider;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;

// Bodies are taken as raw Bytes: signature verification must see the exact
// wire bytes, so JSON extraction happens only after it passes.

pub async fn receive_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    receive(state, WebhookProvider::Payment, headers, body, "/webhooks/payment").await
}

pub async fn receive_esign(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    receive(state, WebhookProvider::Esign, headers, body, "/webhooks/esign").await
}

pub async fn receive_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    receive(state, WebhookProvider::Email, headers, body, "/webhooks/email").await
}

async fn receive(
    state: AppState,
    provider: WebhookProvider,
    headers: HeaderMap,
    body: Bytes,
    endpoint: &str,
) -> axum::response::Response {
    match state
        .webhook_ingest
        .ingest(provider, &headers, &body, endpoint)
        .await
    {
        Ok(resp) => (axum::http::StatusCode::OK, Json(resp)).into_response(),
        Err((status, body)) => (status, Json(body)).into_response(),
    }
}
