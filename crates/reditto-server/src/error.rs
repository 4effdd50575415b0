//! API error types with HTTP status code mapping.
//!
//! [`ApiError`] is the HTTP projection of [`PipelineError`]. It implements
//! `axum::response::IntoResponse` to produce `{ "success": false, "error": ... }`
//! bodies. Messages are fixed per kind so upstream or identity-service
//! details never reach the caller; those are logged by the pipeline instead.

use std::time::Duration;

use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use reditto_core::PipelineError;

/// Structured error detail in API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorDetail {
    /// Machine-readable error code (e.g., "INVALID_PAYLOAD", "RATE_LIMITED").
    pub code: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// API errors with HTTP status code mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request body rejected by the validator (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid credential (401).
    #[error("unauthorized")]
    Unauthorized,

    /// Origin not on the allow-list (403).
    #[error("forbidden origin")]
    ForbiddenOrigin,

    /// Upstream model is rate limiting us; the caller may retry later (429).
    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    /// Upstream failed or produced unusable output (502).
    #[error("bad gateway: {code}")]
    BadGateway {
        code: &'static str,
        message: &'static str,
    },

    /// Internal server error (500).
    #[error("internal error")]
    InternalError,
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let code = err.kind();
        match err {
            PipelineError::InvalidPayload(reason) => ApiError::BadRequest(reason),
            PipelineError::Unauthenticated => ApiError::Unauthorized,
            PipelineError::ForbiddenOrigin => ApiError::ForbiddenOrigin,
            PipelineError::RateLimited { retry_after } => ApiError::RateLimited { retry_after },
            PipelineError::UpstreamUnavailable(_) => ApiError::BadGateway {
                code,
                message: "the model service is unavailable",
            },
            PipelineError::UpstreamError { .. } => ApiError::BadGateway {
                code,
                message: "the model service returned an error",
            },
            PipelineError::UpstreamEmptyResponse => ApiError::BadGateway {
                code,
                message: "the model service returned no answer",
            },
            PipelineError::MalformedUpstreamOutput(_) => ApiError::BadGateway {
                code,
                message: "the model service returned an unusable answer",
            },
            PipelineError::Internal(_) => ApiError::InternalError,
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::ForbiddenOrigin => StatusCode::FORBIDDEN,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            ApiError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> ApiErrorDetail {
        let (code, message) = match self {
            ApiError::BadRequest(reason) => ("INVALID_PAYLOAD", reason.clone()),
            ApiError::Unauthorized => ("UNAUTHENTICATED", "missing or invalid credentials".into()),
            ApiError::ForbiddenOrigin => ("FORBIDDEN_ORIGIN", "origin not allowed".into()),
            ApiError::RateLimited { .. } => (
                "RATE_LIMITED",
                "the model service is busy, try again shortly".into(),
            ),
            ApiError::BadGateway { code, message } => (*code, (*message).to_string()),
            ApiError::InternalError => ("INTERNAL", "internal error".into()),
        };
        ApiErrorDetail { code, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = serde_json::json!({
            "success": false,
            "error": self.detail(),
        });

        let retry_after = match &self {
            ApiError::RateLimited { retry_after } => {
                body["retryable"] = serde_json::Value::Bool(true);
                *retry_after
            }
            _ => None,
        };

        let mut response = (status, axum::Json(body)).into_response();
        if let Some(delay) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&delay.as_secs().to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        response
    }
}
