//! Essay submission handlers (text extraction and grading).

use axum::body::Body;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use crate::error::ApiError;
use crate::schema::submissions::{ExtractTextResponse, GradeEssayResponse};
use crate::state::AppState;

/// Transcribes a photographed essay.
///
/// `POST /extract-text`
pub async fn extract_text(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<ExtractTextResponse>, ApiError> {
    let extracted = state.pipeline.extract_text(&headers, body).await?;
    Ok(Json(ExtractTextResponse {
        success: true,
        extracted_text: extracted.text,
    }))
}

/// Grades an essay against the ENEM rubric.
///
/// `POST /grade-essay`
pub async fn grade_essay(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<GradeEssayResponse>, ApiError> {
    let correction = state.pipeline.grade_essay(&headers, body).await?;
    Ok(Json(GradeEssayResponse {
        success: true,
        correction,
    }))
}
