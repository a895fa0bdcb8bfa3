//! Liveness, readiness and Prometheus endpoints.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;

use crate::state::AppState;

/// GET /health
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// GET /ready
///
/// Ready once a non-empty scene catalog is loaded.
pub async fn ready_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    let ready = !state.catalog.is_empty();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = json!({
        "ready": ready,
        "scenes": state.catalog.len(),
        "materialized_scenes": state.materialized_scenes(),
        "cache": state.cache.stats(),
        "cache_hit_rate": state.cache.stats().hit_rate(),
        "metrics": state.metrics.snapshot(),
    });
    (status, Json(body)).into_response()
}

/// GET /metrics
pub async fn metrics_handler(handle: Option<Extension<PrometheusHandle>>) -> Response {
    match handle {
        Some(Extension(handle)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}
