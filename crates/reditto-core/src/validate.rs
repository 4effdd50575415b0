//! Payload validation: raw request bodies to typed requests.
//!
//! Both validators are pure functions of the body bytes and the configured
//! [`PayloadLimits`]; they never perform I/O. Every rejection is an
//! [`PipelineError::InvalidPayload`] whose reason is safe to show to callers.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::PipelineError;
use crate::types::{ExtractionRequest, GradingRequest, ImageMediaType};

/// Standard alphabet, padding optional on decode.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Size and length bounds enforced on incoming submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadLimits {
    /// Minimum essay length in characters, after trimming.
    pub min_essay_chars: usize,
    /// Maximum essay length in characters, after trimming.
    pub max_essay_chars: usize,
    /// Maximum theme length in characters, after trimming.
    pub max_theme_chars: usize,
    /// Maximum decoded image size in bytes.
    pub max_image_bytes: usize,
    /// Maximum raw request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for PayloadLimits {
    fn default() -> Self {
        PayloadLimits {
            min_essay_chars: 200,
            max_essay_chars: 5000,
            max_theme_chars: 200,
            max_image_bytes: 10 * 1024 * 1024,
            max_body_bytes: 20 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGradingBody {
    #[serde(default, alias = "text")]
    essay_text: Option<String>,
    #[serde(default)]
    theme: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawExtractionBody {
    #[serde(default, alias = "imageBase64")]
    image_data: Option<String>,
}

/// Parses a body that must be a JSON object.
fn parse_object<T: DeserializeOwned>(body: &[u8]) -> Result<T, PipelineError> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|_| PipelineError::invalid("malformed body"))?;
    if !value.is_object() {
        return Err(PipelineError::invalid("malformed body"));
    }
    serde_json::from_value(value).map_err(|_| PipelineError::invalid("malformed body"))
}

/// Validates a grading submission (`{ essayText, theme? }`).
pub fn validate_grading(
    body: &[u8],
    limits: &PayloadLimits,
) -> Result<GradingRequest, PipelineError> {
    let raw: RawGradingBody = parse_object(body)?;

    let essay_text = raw
        .essay_text
        .ok_or_else(|| PipelineError::invalid("missing essay text"))?
        .trim()
        .to_string();
    let chars = essay_text.chars().count();
    if chars < limits.min_essay_chars || chars > limits.max_essay_chars {
        return Err(PipelineError::invalid("length out of bounds"));
    }

    // Blank themes count as absent.
    let theme = raw
        .theme
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    if let Some(theme) = &theme {
        if theme.chars().count() > limits.max_theme_chars {
            return Err(PipelineError::invalid("theme length out of bounds"));
        }
    }

    Ok(GradingRequest { essay_text, theme })
}

/// Validates an extraction submission (`{ imageData }`).
///
/// Accepts raw base64 or a `data:` URL, tolerates line-wrapped payloads, and
/// rejects anything that decodes to more than `max_image_bytes`.
pub fn validate_extraction(
    body: &[u8],
    limits: &PayloadLimits,
) -> Result<ExtractionRequest, PipelineError> {
    let raw: RawExtractionBody = parse_object(body)?;

    let image = raw
        .image_data
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| PipelineError::invalid("missing image data"))?;

    let payload = strip_data_url(&image)?;
    let mut normalized: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    // Reject oversized payloads before paying for the decode.
    let min_decoded = base64::decoded_len_estimate(normalized.len()).saturating_sub(2);
    if min_decoded > limits.max_image_bytes {
        return Err(PipelineError::invalid("image too large"));
    }

    let decoded = LENIENT_BASE64
        .decode(normalized.as_bytes())
        .map_err(|_| PipelineError::invalid("bad encoding"))?;
    if decoded.is_empty() {
        return Err(PipelineError::invalid("missing image data"));
    }
    if decoded.len() > limits.max_image_bytes {
        return Err(PipelineError::invalid("image too large"));
    }

    let media_type = ImageMediaType::sniff(&decoded)
        .ok_or_else(|| PipelineError::invalid("unsupported image format"))?;

    while normalized.len() % 4 != 0 {
        normalized.push('=');
    }

    Ok(ExtractionRequest {
        image_base64: normalized,
        media_type,
        decoded_len: decoded.len(),
    })
}

/// Returns the base64 part of a `data:<mime>;base64,<payload>` URL, or the
/// input unchanged when it is not a data URL.
fn strip_data_url(input: &str) -> Result<&str, PipelineError> {
    let trimmed = input.trim();
    if !trimmed.starts_with("data:") {
        return Ok(trimmed);
    }
    match trimmed.split_once(',') {
        Some((header, payload)) if header.ends_with(";base64") => Ok(payload),
        _ => Err(PipelineError::invalid("bad encoding")),
    }
}
