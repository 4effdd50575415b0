//! Response coercion: free-text model replies to typed results.
//!
//! The model is an untrusted text generator. Plain-text replies only need to
//! be non-blank; rubric replies must carry every competency with an in-range
//! score, and the final score is always recomputed here. Any structural
//! violation is a [`PipelineError::MalformedUpstreamOutput`]; no partial or
//! defaulted result is ever produced.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::PipelineError;
use crate::score::{is_valid_competency_score, round15};
use crate::types::{Competency, CompetencyResult, ExtractedText, RubricScore};

/// Shape the model's reply is expected to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    PlainText,
    Rubric,
}

/// A coerced reply of either shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Coerced {
    Text(ExtractedText),
    Rubric(RubricScore),
}

/// A validated rubric plus the final score the model claimed, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercedRubric {
    pub rubric: RubricScore,
    /// Advisory only; never used in place of the recomputed score.
    pub claimed_final_score: Option<i64>,
}

impl CoercedRubric {
    /// `true` when the model stated a final score different from ours.
    pub fn claim_disagrees(&self) -> bool {
        self.claimed_final_score
            .is_some_and(|claimed| claimed != i64::from(self.rubric.final_score))
    }
}

/// Coerces `raw` into the requested shape.
pub fn coerce(raw: &str, shape: OutputShape) -> Result<Coerced, PipelineError> {
    match shape {
        OutputShape::PlainText => coerce_plain_text(raw).map(Coerced::Text),
        OutputShape::Rubric => coerce_rubric(raw).map(|c| Coerced::Rubric(c.rubric)),
    }
}

/// Accepts any reply that is non-empty after trimming.
pub fn coerce_plain_text(raw: &str) -> Result<ExtractedText, PipelineError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(PipelineError::malformed("empty text"));
    }
    Ok(ExtractedText {
        text: text.to_string(),
    })
}

/// Parses and validates a rubric reply.
///
/// Accepts the Portuguese keys the grading prompt asks for as well as their
/// English equivalents.
pub fn coerce_rubric(raw: &str) -> Result<CoercedRubric, PipelineError> {
    let json = strip_code_fence(raw);
    let value: Value =
        serde_json::from_str(json).map_err(|_| PipelineError::malformed("reply is not JSON"))?;
    let root = value
        .as_object()
        .ok_or_else(|| PipelineError::malformed("reply is not a JSON object"))?;

    let container = field(root, &["competencias", "competencies"])
        .and_then(Value::as_object)
        .ok_or_else(|| PipelineError::malformed("missing competencies"))?;

    let competencies = [
        competency(container, Competency::WrittenNorm)?,
        competency(container, Competency::ThemeUnderstanding)?,
        competency(container, Competency::Argumentation)?,
        competency(container, Competency::Cohesion)?,
        competency(container, Competency::InterventionProposal)?,
    ];

    let summary = field(root, &["resumo", "summary"])
        .and_then(Value::as_str)
        .ok_or_else(|| PipelineError::malformed("missing summary"))?
        .to_string();
    let strengths = string_list(root, &["pontosFortes", "pontosForts", "strengths"])?;
    let improvements = string_list(root, &["pontosAmelhorar", "improvements"])?;
    let tips = string_list(root, &["dicas", "tips"])?;

    let claimed_final_score = field(root, &["notaFinal", "finalScore"]).and_then(as_integer);

    let mut rubric = RubricScore {
        competencies,
        final_score: 0,
        summary,
        strengths,
        improvements,
        tips,
    };
    rubric.final_score = round15(rubric.raw_sum());

    Ok(CoercedRubric {
        rubric,
        claimed_final_score,
    })
}

/// Removes a surrounding Markdown code fence (```` ```json ... ``` ````).
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// First non-null value stored under any of `keys`.
fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

/// Integer value, accepting integral floats such as `160.0`.
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0 && f.abs() < 1e15)
        .map(|f| f as i64)
}

fn competency(
    container: &Map<String, Value>,
    which: Competency,
) -> Result<CompetencyResult, PipelineError> {
    let n = which.number();
    let pt = format!("competencia{n}");
    let en = format!("competency{n}");
    let entry = field(container, &[pt.as_str(), en.as_str()])
        .and_then(Value::as_object)
        .ok_or_else(|| PipelineError::malformed(format!("missing {pt}")))?;

    let score = field(entry, &["nota", "score"])
        .and_then(as_integer)
        .filter(|s| is_valid_competency_score(*s))
        .ok_or_else(|| PipelineError::malformed(format!("invalid score for {pt}")))?;
    let title = field(entry, &["titulo", "title"])
        .and_then(Value::as_str)
        .ok_or_else(|| PipelineError::malformed(format!("missing title for {pt}")))?;
    let feedback = field(entry, &["feedback"])
        .and_then(Value::as_str)
        .ok_or_else(|| PipelineError::malformed(format!("missing feedback for {pt}")))?;

    Ok(CompetencyResult {
        competency: which,
        score: score as u16,
        title: title.to_string(),
        feedback: feedback.to_string(),
    })
}

/// Optional list of strings; absent means empty, any other type is malformed.
fn string_list(obj: &Map<String, Value>, keys: &[&str]) -> Result<Vec<String>, PipelineError> {
    let Some(value) = field(obj, keys) else {
        return Ok(Vec::new());
    };
    let items = value
        .as_array()
        .ok_or_else(|| PipelineError::malformed(format!("{} must be a list", keys[0])))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| PipelineError::malformed(format!("{} must hold strings", keys[0])))
        })
        .collect()
}
