use axum::http::{StatusCode, header};
use axum::response::IntoResponse;

/// Liveness probe.
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "OK",
    )
}
