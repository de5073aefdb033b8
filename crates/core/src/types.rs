use std::fmt;

use serde::{Deserialize, Serialize};

use crate::provider::LlmProvider;

/// Key correlating a conceptual segment with its timing and its image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentIndex(pub u32);

impl SegmentIndex {
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for SegmentIndex {
    fn from(value: usize) -> Self {
        SegmentIndex(value as u32)
    }
}

impl fmt::Display for SegmentIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Input of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub topic: String,
    pub style: String,
    pub style_preset_id: String,
    pub llm_provider: LlmProvider,
    pub segment_count: u32,
    pub voice_id: Option<String>,
    pub model_id: Option<String>,
    #[serde(default)]
    pub subtitles: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawScript {
    pub outline: String,
    pub raw_content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptualSegment {
    pub index: SegmentIndex,
    pub concept_theme: String,
    pub visual_description: Option<String>,
    pub content: String,
    pub timing: Option<SegmentTiming>,
}

/// Per-character narration timing, as returned by the speech provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterTiming {
    pub characters: Vec<String>,
    pub character_start_times_seconds: Vec<f64>,
    pub character_end_times_seconds: Vec<f64>,
}

impl CharacterTiming {
    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    /// End time of the last narrated character.
    pub fn total_duration(&self) -> f64 {
        self.character_end_times_seconds
            .last()
            .copied()
            .unwrap_or(0.0)
    }

    pub fn check_lengths(&self) -> Result<(), String> {
        let chars = self.characters.len();
        let starts = self.character_start_times_seconds.len();
        let ends = self.character_end_times_seconds.len();
        if chars != starts || chars != ends {
            return Err(format!(
                "{chars} characters, {starts} start times, {ends} end times"
            ));
        }
        Ok(())
    }

    /// Checks equal lengths, non-decreasing start and end times,
    /// and every end at or after its start.
    pub fn validate(&self) -> Result<(), String> {
        self.check_lengths()?;

        let starts = &self.character_start_times_seconds;
        let ends = &self.character_end_times_seconds;
        for i in 0..starts.len() {
            if ends[i] < starts[i] {
                return Err(format!("character {i} ends before it starts"));
            }
            if i > 0 && (starts[i] < starts[i - 1] || ends[i] < ends[i - 1]) {
                return Err(format!("timings decrease at character {i}"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentTiming {
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    pub content_start: usize,
    pub content_end: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub outline: String,
    pub raw_content: String,
    pub conceptual_segments: Vec<ConceptualSegment>,
    pub style: String,
    pub character_timings: Option<CharacterTiming>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub url: String,
    pub concept_theme: String,
    pub index: SegmentIndex,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

impl AudioClip {
    pub fn mpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime_type: "audio/mpeg",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedContent {
    pub script: Script,
    #[serde(skip)]
    pub audio: AudioClip,
    pub images: Vec<GeneratedImage>,
    pub total_duration: f64,
    pub subtitles: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing(starts: &[f64], ends: &[f64]) -> CharacterTiming {
        CharacterTiming {
            characters: starts.iter().map(|_| "a".to_string()).collect(),
            character_start_times_seconds: starts.to_vec(),
            character_end_times_seconds: ends.to_vec(),
        }
    }

    #[test]
    fn valid_timings_pass() {
        let t = timing(&[0.0, 0.1, 0.1], &[0.1, 0.2, 0.3]);
        assert!(t.validate().is_ok());
        assert_eq!(t.total_duration(), 0.3);
    }

    #[test]
    fn end_before_start_is_rejected() {
        let t = timing(&[0.0, 0.2], &[0.1, 0.15]);
        assert!(t.validate().is_err());
    }

    #[test]
    fn decreasing_starts_are_rejected() {
        let t = timing(&[0.0, 0.3, 0.2], &[0.3, 0.4, 0.5]);
        assert!(t.validate().unwrap_err().contains("character 2"));
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let mut t = timing(&[0.0, 0.1], &[0.1, 0.2]);
        t.character_end_times_seconds.pop();
        assert!(t.check_lengths().is_err());
    }

    #[test]
    fn empty_timing_has_zero_duration() {
        assert_eq!(CharacterTiming::default().total_duration(), 0.0);
    }
}
