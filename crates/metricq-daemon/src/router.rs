//! Axum router wiring for the exposition endpoint.

use axum::{routing::get, Router};

use crate::{app_state::AppState, ops};

pub fn build_router(state: AppState, metrics_path: &str) -> Router {
    let mut router = Router::new()
        .route("/", get(ops::metrics))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz));
    if metrics_path != "/" {
        router = router.route(metrics_path, get(ops::metrics));
    }
    router.with_state(state)
}
