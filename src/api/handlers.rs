// src/api/handlers.rs

use axum::Json;

use crate::api::types::HealthResponse;

/// GET /api/v1/health — Liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}
