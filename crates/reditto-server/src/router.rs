//! Router assembly for the submission API.
//!
//! [`build_router`] wires the handlers to their routes with CORS and
//! tracing middleware layers.

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Builds the complete axum router.
///
/// CORS is scoped to the configured origin allow-list and answers every
/// `OPTIONS` request itself. The access guard still rejects disallowed
/// origins with 403 on the actual request. `Retry-After` is exposed so
/// browser clients can honour rate-limit hints.
/// The legacy route names are kept as aliases.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(state.pipeline.guard().allowed_origins());

    Router::new()
        .route("/health", get(handlers::health::health))
        // Text extraction
        .route(
            "/extract-text",
            post(handlers::submissions::extract_text),
        )
        .route(
            "/extract-text-from-image",
            post(handlers::submissions::extract_text),
        )
        // Grading
        .route(
            "/grade-essay",
            post(handlers::submissions::grade_essay),
        )
        .route(
            "/correct-essay",
            post(handlers::submissions::grade_essay),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ])
        .expose_headers([RETRY_AFTER])
}
