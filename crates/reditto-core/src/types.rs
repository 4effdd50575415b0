//! Request and result types for the two submission flows.
//!
//! Every value here is built fresh for a single request and dropped with the
//! response; nothing is cached or persisted.

use serde::{Deserialize, Serialize};

/// A validated photo-of-an-essay submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    /// Normalized base64 payload (no data-URL prefix, no whitespace).
    pub image_base64: String,
    /// Media type sniffed from the decoded bytes.
    pub media_type: ImageMediaType,
    /// Size of the decoded image in bytes.
    pub decoded_len: usize,
}

impl ExtractionRequest {
    /// The image as a `data:` URL, the form vision models accept inline.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.media_type.mime(),
            self.image_base64
        )
    }
}

/// Image formats accepted for text extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMediaType {
    Jpeg,
    Png,
    Webp,
    Gif,
}

impl ImageMediaType {
    /// Detects the format from magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageMediaType::Jpeg)
        } else if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(ImageMediaType::Png)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageMediaType::Webp)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageMediaType::Gif)
        } else {
            None
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ImageMediaType::Jpeg => "image/jpeg",
            ImageMediaType::Png => "image/png",
            ImageMediaType::Webp => "image/webp",
            ImageMediaType::Gif => "image/gif",
        }
    }
}

/// A validated typed-essay submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradingRequest {
    /// Essay body, already trimmed.
    pub essay_text: String,
    /// Optional essay prompt/theme, trimmed and non-empty when present.
    pub theme: Option<String>,
}

/// Caller identity resolved by the access guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
}

/// The five ENEM competencies, in rubric order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Competency {
    WrittenNorm,
    ThemeUnderstanding,
    Argumentation,
    Cohesion,
    InterventionProposal,
}

impl Competency {
    pub const ALL: [Competency; 5] = [
        Competency::WrittenNorm,
        Competency::ThemeUnderstanding,
        Competency::Argumentation,
        Competency::Cohesion,
        Competency::InterventionProposal,
    ];

    /// 1-based position in the rubric.
    pub fn number(self) -> u8 {
        match self {
            Competency::WrittenNorm => 1,
            Competency::ThemeUnderstanding => 2,
            Competency::Argumentation => 3,
            Competency::Cohesion => 4,
            Competency::InterventionProposal => 5,
        }
    }

    /// Title used in the prompt's answer template.
    pub fn title(self) -> &'static str {
        match self {
            Competency::WrittenNorm => "Modalidade Escrita",
            Competency::ThemeUnderstanding => "Compreensão do Tema",
            Competency::Argumentation => "Argumentação",
            Competency::Cohesion => "Coesão e Coerência",
            Competency::InterventionProposal => "Proposta de Intervenção",
        }
    }
}

impl From<Competency> for u8 {
    fn from(c: Competency) -> u8 {
        c.number()
    }
}

impl TryFrom<u8> for Competency {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Competency::ALL
            .into_iter()
            .find(|c| c.number() == n)
            .ok_or_else(|| format!("competency number out of range: {n}"))
    }
}

/// Score and feedback for one competency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetencyResult {
    pub competency: Competency,
    /// 0..=200 in steps of 20.
    pub score: u16,
    pub title: String,
    pub feedback: String,
}

/// A complete rubric evaluation.
///
/// `final_score` is always `round15` of the competency sum; the coercer
/// recomputes it rather than trusting the model's arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricScore {
    pub competencies: [CompetencyResult; 5],
    pub final_score: u16,
    pub summary: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub tips: Vec<String>,
}

impl RubricScore {
    /// Unrounded sum of the five competency scores.
    pub fn raw_sum(&self) -> u16 {
        self.competencies.iter().map(|c| c.score).sum()
    }
}

/// OCR result for an essay photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniff_recognizes_common_formats() {
        assert_eq!(
            ImageMediaType::sniff(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]),
            Some(ImageMediaType::Jpeg)
        );
        assert_eq!(
            ImageMediaType::sniff(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0]),
            Some(ImageMediaType::Png)
        );
        assert_eq!(
            ImageMediaType::sniff(b"RIFF\x00\x00\x00\x00WEBPVP8 "),
            Some(ImageMediaType::Webp)
        );
        assert_eq!(ImageMediaType::sniff(b"GIF89a...."), Some(ImageMediaType::Gif));
        assert_eq!(ImageMediaType::sniff(b"%PDF-1.7"), None);
        assert_eq!(ImageMediaType::sniff(&[]), None);
    }

    #[test]
    fn data_url_carries_sniffed_mime() {
        let req = ExtractionRequest {
            image_base64: "iVBORw0KGgo=".into(),
            media_type: ImageMediaType::Png,
            decoded_len: 8,
        };
        assert_eq!(req.data_url(), "data:image/png;base64,iVBORw0KGgo=");
    }

    #[test]
    fn competency_serializes_as_number() {
        let value = serde_json::to_value(Competency::Cohesion).unwrap();
        assert_eq!(value, serde_json::json!(4));
        let back: Competency = serde_json::from_value(serde_json::json!(2)).unwrap();
        assert_eq!(back, Competency::ThemeUnderstanding);
        assert!(serde_json::from_value::<Competency>(serde_json::json!(6)).is_err());
    }
}
