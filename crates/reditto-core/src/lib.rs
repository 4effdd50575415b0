//! Domain core for the essay submission and grading pipeline.
//!
//! Everything here is synchronous and free of I/O: the payload validator
//! turns untrusted request bodies into typed requests, the response coercer
//! turns free-text model replies into typed results, and [`score::round15`]
//! enforces the final-score rubric. The HTTP service in `reditto-server`
//! composes these with the access guard and the upstream gateway.

pub mod coerce;
pub mod error;
pub mod prompt;
pub mod score;
pub mod types;
pub mod validate;

// Re-export commonly used types
pub use coerce::{coerce, coerce_plain_text, coerce_rubric, Coerced, CoercedRubric, OutputShape};
pub use error::PipelineError;
pub use score::{round15, FINAL_SCORES};
pub use types::{
    Competency, CompetencyResult, ExtractedText, ExtractionRequest, GradingRequest, Identity,
    ImageMediaType, RubricScore,
};
pub use validate::{validate_extraction, validate_grading, PayloadLimits};
