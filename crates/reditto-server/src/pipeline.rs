//! Pipeline orchestration for the two submission flows.
//!
//! Both flows run the same strict sequence, short-circuiting on the first
//! failure:
//!
//! guard -> read body -> validate -> upstream call -> coerce
//!
//! A [`Flow`] supplies the parts that differ (validator, prompt, output
//! shape); [`Pipeline::run`] supplies the sequence.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::HeaderMap;
use tracing::Instrument;
use uuid::Uuid;

use reditto_core::prompt::{
    grading_user_message, GRADING_SYSTEM_PROMPT, OCR_SYSTEM_PROMPT, OCR_USER_INSTRUCTION,
};
use reditto_core::{
    coerce_plain_text, coerce_rubric, validate_extraction, validate_grading, ExtractedText,
    ExtractionRequest, GradingRequest, OutputShape, PayloadLimits, PipelineError, RubricScore,
};

use crate::config::FlowSettings;
use crate::guard::AccessGuard;
use crate::llm_provider::{ChatPrompt, ModelGateway, UserContent};

/// The varying half of a submission flow: prompt plus output shape.
pub trait Flow: Send + Sync {
    type Request: Send;
    type Output: Send;

    /// Name used in logs.
    const NAME: &'static str;

    fn shape(&self) -> OutputShape;

    fn validate(&self, body: &[u8], limits: &PayloadLimits) -> Result<Self::Request, PipelineError>;

    fn prompt(&self, request: &Self::Request) -> ChatPrompt;

    fn coerce(&self, raw: &str) -> Result<Self::Output, PipelineError>;
}

/// Photo of a handwritten essay in, transcribed text out.
pub struct ExtractTextFlow {
    pub settings: FlowSettings,
}

impl Flow for ExtractTextFlow {
    type Request = ExtractionRequest;
    type Output = ExtractedText;

    const NAME: &'static str = "extract-text";

    fn shape(&self) -> OutputShape {
        OutputShape::PlainText
    }

    fn validate(&self, body: &[u8], limits: &PayloadLimits) -> Result<ExtractionRequest, PipelineError> {
        validate_extraction(body, limits)
    }

    fn prompt(&self, request: &ExtractionRequest) -> ChatPrompt {
        ChatPrompt {
            model: self.settings.model.clone(),
            system: OCR_SYSTEM_PROMPT,
            user: UserContent::TextWithImage {
                text: OCR_USER_INSTRUCTION.to_string(),
                image_url: request.data_url(),
            },
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        }
    }

    fn coerce(&self, raw: &str) -> Result<ExtractedText, PipelineError> {
        coerce_plain_text(raw)
    }
}

/// Typed essay in, rubric evaluation out.
pub struct GradeEssayFlow {
    pub settings: FlowSettings,
}

impl Flow for GradeEssayFlow {
    type Request = GradingRequest;
    type Output = RubricScore;

    const NAME: &'static str = "grade-essay";

    fn shape(&self) -> OutputShape {
        OutputShape::Rubric
    }

    fn validate(&self, body: &[u8], limits: &PayloadLimits) -> Result<GradingRequest, PipelineError> {
        validate_grading(body, limits)
    }

    fn prompt(&self, request: &GradingRequest) -> ChatPrompt {
        ChatPrompt {
            model: self.settings.model.clone(),
            system: GRADING_SYSTEM_PROMPT,
            user: UserContent::Text(grading_user_message(request)),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        }
    }

    fn coerce(&self, raw: &str) -> Result<RubricScore, PipelineError> {
        let coerced = coerce_rubric(raw)?;
        if coerced.claim_disagrees() {
            tracing::warn!(
                claimed = coerced.claimed_final_score,
                recomputed = coerced.rubric.final_score,
                "model final score disagrees with competency sum; using recomputed value"
            );
        }
        Ok(coerced.rubric)
    }
}

/// Composes guard, validator, gateway and coercer.
///
/// Holds no per-request state; one instance serves all requests concurrently.
pub struct Pipeline {
    guard: AccessGuard,
    gateway: Arc<dyn ModelGateway>,
    limits: PayloadLimits,
    extract: ExtractTextFlow,
    grade: GradeEssayFlow,
}

impl Pipeline {
    pub fn new(
        guard: AccessGuard,
        gateway: Arc<dyn ModelGateway>,
        limits: PayloadLimits,
        extract: ExtractTextFlow,
        grade: GradeEssayFlow,
    ) -> Self {
        Pipeline {
            guard,
            gateway,
            limits,
            extract,
            grade,
        }
    }

    pub fn guard(&self) -> &AccessGuard {
        &self.guard
    }

    pub async fn extract_text(
        &self,
        headers: &HeaderMap,
        body: Body,
    ) -> Result<ExtractedText, PipelineError> {
        self.run(&self.extract, headers, body).await
    }

    pub async fn grade_essay(
        &self,
        headers: &HeaderMap,
        body: Body,
    ) -> Result<RubricScore, PipelineError> {
        self.run(&self.grade, headers, body).await
    }

    /// Runs one flow end to end inside a per-request span.
    pub async fn run<F: Flow>(
        &self,
        flow: &F,
        headers: &HeaderMap,
        body: Body,
    ) -> Result<F::Output, PipelineError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "pipeline",
            flow = F::NAME,
            %request_id,
            user_id = tracing::field::Empty
        );

        async move {
            let started = Instant::now();
            let result = self.run_stages(flow, headers, body).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &result {
                Ok(_) => tracing::info!(elapsed_ms, "flow completed"),
                Err(err) => log_failure(err, elapsed_ms),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_stages<F: Flow>(
        &self,
        flow: &F,
        headers: &HeaderMap,
        body: Body,
    ) -> Result<F::Output, PipelineError> {
        let identity = self.guard.authorize(headers).await?;
        tracing::Span::current().record("user_id", identity.user_id.as_str());

        let bytes = axum::body::to_bytes(body, self.limits.max_body_bytes)
            .await
            .map_err(|_| PipelineError::invalid("body too large"))?;
        let request = flow.validate(&bytes, &self.limits)?;

        let prompt = flow.prompt(&request);
        tracing::debug!(model = %prompt.model, shape = ?flow.shape(), "calling upstream model");
        let raw = self.gateway.send(&prompt).await?;

        flow.coerce(&raw)
    }
}

/// Logs a failure with its internal detail; callers only see the safe message.
fn log_failure(err: &PipelineError, elapsed_ms: u64) {
    let kind = err.kind();
    match err {
        PipelineError::Unauthenticated | PipelineError::ForbiddenOrigin => {
            tracing::warn!(kind, elapsed_ms, "request rejected by access guard")
        }
        PipelineError::InvalidPayload(reason) => {
            tracing::info!(kind, reason = %reason, elapsed_ms, "payload rejected")
        }
        PipelineError::RateLimited { retry_after } => {
            tracing::warn!(kind, ?retry_after, elapsed_ms, "upstream rate limited")
        }
        PipelineError::UpstreamError { status, detail } => {
            tracing::error!(kind, status, detail = %detail, elapsed_ms, "upstream request failed")
        }
        PipelineError::UpstreamUnavailable(detail)
        | PipelineError::MalformedUpstreamOutput(detail)
        | PipelineError::Internal(detail) => {
            tracing::error!(kind, detail = %detail, elapsed_ms, "flow failed")
        }
        PipelineError::UpstreamEmptyResponse => {
            tracing::error!(kind, elapsed_ms, "upstream returned no content")
        }
    }
}
