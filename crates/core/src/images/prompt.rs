//! Image prompts derived from conceptual segments.

use std::sync::Arc;

use crate::{error::ProviderError, llm::LanguageModel, types::ConceptualSegment};

/// Longest prompt the image provider accepts.
pub const MAX_PROMPT_LENGTH: usize = 1500;
pub const MAX_GENERATED_PROMPT_LENGTH: usize = 1200;
pub const MAX_SCRIPT_EXCERPT: usize = 800;
pub const STYLE_SUFFIX: &str =
    ", professional photography, cinematic lighting, photorealistic quality, 4K UHD";

pub struct PromptBuilder {
    llm: Arc<dyn LanguageModel>,
}

impl PromptBuilder {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    pub async fn build(&self, segment: &ConceptualSegment) -> Result<String, ProviderError> {
        let generated = self.llm.complete(&prompt_request(segment)).await?;
        Ok(finish_prompt(&generated, segment))
    }
}

fn prompt_request(segment: &ConceptualSegment) -> String {
    let excerpt = truncate_chars(segment.content.trim(), MAX_SCRIPT_EXCERPT);
    let excerpt = if excerpt.len() < segment.content.trim().len() {
        format!("{excerpt}...")
    } else {
        excerpt.to_string()
    };
    let visual = segment
        .visual_description
        .as_deref()
        .unwrap_or("not specified");

    format!(
        r#"Convert this script segment into a concise, vivid image prompt.
Focus on one key visual moment that captures the essence.
Include: composition, lighting, atmosphere, and mood.
Avoid: dialogue, narrative, and temporal elements.

Theme: {theme}
Suggested visual: {visual}

Script segment:
{excerpt}

Create a brief, impactful image prompt (max 200 characters):"#,
        theme = segment.concept_theme,
    )
}

/// Bounds the model output, pads a blank one from the segment, and appends the
/// style suffix. The result never exceeds [`MAX_PROMPT_LENGTH`] characters.
pub fn finish_prompt(generated: &str, segment: &ConceptualSegment) -> String {
    let mut base = truncate_chars(generated.trim(), MAX_GENERATED_PROMPT_LENGTH)
        .trim()
        .to_string();
    if base.is_empty() {
        let padding = segment
            .visual_description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(&segment.concept_theme);
        base = truncate_chars(padding.trim(), MAX_GENERATED_PROMPT_LENGTH).to_string();
    }

    let prompt = format!("{base}{STYLE_SUFFIX}");
    if prompt.chars().count() <= MAX_PROMPT_LENGTH {
        return prompt;
    }
    format!("{}...", truncate_chars(&prompt, MAX_PROMPT_LENGTH - 3))
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}
