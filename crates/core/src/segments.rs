//! Splits generated script text into conceptual segments, one per image.
//!
//! The language model is asked for the closing words of each segment rather
//! than the segment text itself, so segment content is always cut from the
//! script and can never drift from what gets narrated. Anything unusable in
//! the model's answer produces a single segment covering the whole script.

use std::sync::Arc;

use log::{debug, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    alignment::{AlignedText, normalize},
    error::ProviderError,
    llm::LanguageModel,
    types::{ConceptualSegment, SegmentIndex},
};

pub const FALLBACK_THEME: &str = "Complete Content";
pub const FALLBACK_VISUAL_DESCRIPTION: &str = "Visual representation of the main topic";
const CLOSING_THEME: &str = "Closing";

#[derive(Debug, Deserialize)]
struct BoundaryPhrase {
    #[serde(rename = "endPhrase", alias = "end_phrase")]
    end_phrase: String,
    #[serde(rename = "conceptTheme", alias = "concept_theme", default)]
    concept_theme: Option<String>,
    #[serde(rename = "visualDescription", alias = "visual_description", default)]
    visual_description: Option<String>,
}

/// Why the model's answer was replaced by the single-segment fallback.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FallbackReason {
    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("response is not a JSON array")]
    NotAnArray,

    #[error("segment entry has the wrong shape: {0}")]
    Schema(String),

    #[error("response contains no segments")]
    Empty,

    #[error("segment {position} has an empty end phrase")]
    EmptyPhrase { position: usize },

    #[error("end phrase of segment {position} not found after previous segment: {phrase:?}")]
    PhraseNotFound { position: usize, phrase: String },

    #[error("segments cover {covered} of {expected} characters")]
    CoverageMismatch { covered: usize, expected: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segmentation {
    Identified(Vec<ConceptualSegment>),
    Fallback {
        segments: Vec<ConceptualSegment>,
        reason: FallbackReason,
    },
}

impl Segmentation {
    pub fn segments(&self) -> &[ConceptualSegment] {
        match self {
            Segmentation::Identified(segments) => segments,
            Segmentation::Fallback { segments, .. } => segments,
        }
    }

    pub fn into_segments(self) -> Vec<ConceptualSegment> {
        match self {
            Segmentation::Identified(segments) => segments,
            Segmentation::Fallback { segments, .. } => segments,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Segmentation::Fallback { .. })
    }
}

pub struct SegmentIdentifier {
    llm: Arc<dyn LanguageModel>,
}

impl SegmentIdentifier {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Asks the model where the visuals should change. Only a failed model
    /// call is an error; a bad answer falls back to one segment.
    pub async fn identify(&self, raw_content: &str) -> Result<Segmentation, ProviderError> {
        let response = self.llm.complete(&identification_prompt(raw_content)).await?;
        let segmentation = parse_segmentation(&response, raw_content);

        if let Segmentation::Fallback { reason, .. } = &segmentation {
            warn!("using single-segment fallback: {reason}");
            debug!("segment identifier response: {response}");
        } else {
            debug!(
                "identified {} conceptual segments",
                segmentation.segments().len()
            );
        }

        Ok(segmentation)
    }
}

fn identification_prompt(content: &str) -> String {
    format!(
        r#"You are a script analyzer that returns ONLY valid JSON.
Your task is to break this script into conceptual segments where the visual imagery should change.
Return a JSON array where each object represents one segment, in script order, with these exact keys:
- endPhrase: the last 5 to 10 words of the segment, copied exactly from the script
- conceptTheme: string describing the main theme
- visualDescription: string describing what to show visually

Every part of the script must belong to a segment. The endPhrase of the last segment must be the final words of the script.
Return ONLY the JSON array, no other text, no markdown, no code blocks.

Script to analyze:
{content}"#
    )
}

/// Turns a model response into segments cut from `raw_content`.
pub fn parse_segmentation(response: &str, raw_content: &str) -> Segmentation {
    match split_on_phrases(response, raw_content) {
        Ok(segments) => Segmentation::Identified(segments),
        Err(reason) => Segmentation::Fallback {
            segments: vec![fallback_segment(raw_content)],
            reason,
        },
    }
}

fn fallback_segment(raw_content: &str) -> ConceptualSegment {
    ConceptualSegment {
        index: SegmentIndex(0),
        concept_theme: FALLBACK_THEME.to_string(),
        visual_description: Some(FALLBACK_VISUAL_DESCRIPTION.to_string()),
        content: raw_content.to_string(),
        timing: None,
    }
}

fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let trimmed = trimmed.trim_end().strip_suffix("```").unwrap_or(trimmed);
    let trimmed = trimmed.trim();

    // tolerate chatter around the array
    match (trimmed.find('['), trimmed.rfind(']')) {
        (Some(open), Some(close)) if open > 0 && close > open => &trimmed[open..=close],
        _ => trimmed,
    }
}

fn split_on_phrases(
    response: &str,
    raw_content: &str,
) -> Result<Vec<ConceptualSegment>, FallbackReason> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fences(response))
        .map_err(|e| FallbackReason::InvalidJson(e.to_string()))?;
    if !value.is_array() {
        return Err(FallbackReason::NotAnArray);
    }
    let phrases: Vec<BoundaryPhrase> =
        serde_json::from_value(value).map_err(|e| FallbackReason::Schema(e.to_string()))?;
    if phrases.is_empty() {
        return Err(FallbackReason::Empty);
    }

    let text = AlignedText::new(raw_content);
    let chars: Vec<char> = raw_content.chars().collect();
    let mut segments = Vec::with_capacity(phrases.len() + 1);
    let mut cursor = 0;
    let mut original_cursor = 0;

    for (position, phrase) in phrases.into_iter().enumerate() {
        if normalize(&phrase.end_phrase).is_empty() {
            return Err(FallbackReason::EmptyPhrase { position });
        }
        let found = text.locate(&phrase.end_phrase, cursor).ok_or_else(|| {
            FallbackReason::PhraseNotFound {
                position,
                phrase: phrase.end_phrase.clone(),
            }
        })?;
        let end = text.to_original(found.span).end;

        segments.push(ConceptualSegment {
            index: SegmentIndex::from(position),
            concept_theme: phrase
                .concept_theme
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| format!("Segment {}", position + 1)),
            visual_description: phrase.visual_description.filter(|d| !d.trim().is_empty()),
            content: chars[original_cursor..end].iter().collect(),
            timing: None,
        });

        cursor = found.span.end;
        original_cursor = end;
    }

    let remainder: String = chars[original_cursor..].iter().collect();
    if remainder.trim().is_empty() {
        if let Some(last) = segments.last_mut() {
            last.content.push_str(&remainder);
        }
    } else {
        debug!(
            "text after the last end phrase becomes a closing segment ({} chars)",
            remainder.chars().count()
        );
        segments.push(ConceptualSegment {
            index: SegmentIndex::from(segments.len()),
            concept_theme: CLOSING_THEME.to_string(),
            visual_description: None,
            content: remainder,
            timing: None,
        });
    }

    let covered: usize = segments.iter().map(|s| s.content.chars().count()).sum();
    if covered != chars.len() {
        return Err(FallbackReason::CoverageMismatch {
            covered,
            expected: chars.len(),
        });
    }

    Ok(segments)
}
