use crate::domain::booking::error_envelope;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

pub const HEADER: &str = "X-Internal-Api-Key";

/// Opaque admin gate: a caller presenting the internal key is trusted.
/// Rejections carry the same error envelope as the rest of the API.
pub async fn require_internal_api_key(
    State(expected): State<String>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    if provided != expected {
        tracing::warn!(path = %request.uri().path(), "admin request rejected");
        return (
            StatusCode::UNAUTHORIZED,
            Json(error_envelope(
                "UNAUTHORIZED",
                "missing or invalid internal api key",
            )),
        )
            .into_response();
    }

    next.run(request).await
}
