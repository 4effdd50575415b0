//! Success bodies for the submission endpoints.

use serde::Serialize;

use reditto_core::RubricScore;

/// `POST /extract-text` success body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractTextResponse {
    /// Always `true`.
    pub success: bool,
    pub extracted_text: String,
}

/// `POST /grade-essay` success body.
#[derive(Debug, Clone, Serialize)]
pub struct GradeEssayResponse {
    /// Always `true`.
    pub success: bool,
    pub correction: RubricScore,
}

/// `GET /health` body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
