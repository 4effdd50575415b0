//! Liveness probe.

use axum::Json;

use crate::schema::submissions::HealthResponse;

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
