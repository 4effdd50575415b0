//! Error taxonomy shared by every pipeline stage.
//!
//! Uses `thiserror` for structured, matchable variants. Each stage fails fast
//! with exactly one of these kinds; the HTTP layer maps them to status codes.

use std::time::Duration;

use thiserror::Error;

/// Failures produced anywhere in the submission pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Missing or malformed bearer credential, or the identity service rejected it.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The request declared an origin that is not on the allow-list.
    #[error("origin not allowed")]
    ForbiddenOrigin,

    /// The request body failed structural or size checks.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The upstream model could not be reached (connect, DNS, timeout).
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The upstream model answered 429.
    #[error("upstream rate limited")]
    RateLimited { retry_after: Option<Duration> },

    /// The upstream model answered with another non-2xx status.
    #[error("upstream error: status {status}")]
    UpstreamError { status: u16, detail: String },

    /// The upstream answered 2xx without any completion content.
    #[error("upstream returned no completion content")]
    UpstreamEmptyResponse,

    /// The completion content did not match the expected output shape.
    #[error("malformed upstream output: {0}")]
    MalformedUpstreamOutput(String),

    /// Anything else; details are logged, never shown to callers.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Shorthand for [`PipelineError::InvalidPayload`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        PipelineError::InvalidPayload(reason.into())
    }

    /// Shorthand for [`PipelineError::MalformedUpstreamOutput`].
    pub fn malformed(reason: impl Into<String>) -> Self {
        PipelineError::MalformedUpstreamOutput(reason.into())
    }

    /// Machine-readable code for this kind of failure.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Unauthenticated => "UNAUTHENTICATED",
            PipelineError::ForbiddenOrigin => "FORBIDDEN_ORIGIN",
            PipelineError::InvalidPayload(_) => "INVALID_PAYLOAD",
            PipelineError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            PipelineError::RateLimited { .. } => "RATE_LIMITED",
            PipelineError::UpstreamError { .. } => "UPSTREAM_ERROR",
            PipelineError::UpstreamEmptyResponse => "UPSTREAM_EMPTY_RESPONSE",
            PipelineError::MalformedUpstreamOutput(_) => "MALFORMED_UPSTREAM_OUTPUT",
            PipelineError::Internal(_) => "INTERNAL",
        }
    }

    /// Only rate limiting is surfaced to callers as worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::RateLimited { .. })
    }
}
