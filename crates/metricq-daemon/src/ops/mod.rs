//! Exposition HTTP endpoints.
//!
//! - `/` and the configured metrics path : text exposition format
//! - `/healthz` : liveness
//! - `/readyz`  : readiness (503 while the daemon drains)

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use metricq_core::TEXT_CONTENT_TYPE;

use crate::app_state::AppState;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    if state.is_draining() {
        (StatusCode::SERVICE_UNAVAILABLE, "draining")
    } else {
        (StatusCode::OK, "ready")
    }
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let body = state.registry().render();

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)],
        body,
    )
        .into_response()
}
