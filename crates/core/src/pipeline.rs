//! Topic in, narrated and illustrated script out.

use std::{fmt, sync::Arc};

use log::info;
use serde::Serialize;

use crate::{
    catalog::DEFAULT_VOICE_MODEL,
    error::{ConfigurationError, GenerationError, PhaseFailure, Result},
    images::{BatchProgress, ImageScheduler, LeonardoClient, SchedulerConfig},
    keys::ApiKeys,
    llm::{self, LanguageModel},
    narration::{ElevenLabsClient, NarrationService},
    provider::LlmProvider,
    reconcile::reconcile,
    segments::SegmentIdentifier,
    types::{GeneratedContent, GenerationConfig, RawScript, Script},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Phase {
    GeneratingOutline,
    GeneratingSegments,
    IdentifyingConceptualSegments,
    GeneratingNarration,
    ReconcilingTimings,
    GeneratingImages,
    Done,
}

impl Phase {
    pub const ALL: [Phase; 7] = [
        Phase::GeneratingOutline,
        Phase::GeneratingSegments,
        Phase::IdentifyingConceptualSegments,
        Phase::GeneratingNarration,
        Phase::ReconcilingTimings,
        Phase::GeneratingImages,
        Phase::Done,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Phase::GeneratingOutline => "GeneratingOutline",
            Phase::GeneratingSegments => "GeneratingSegments",
            Phase::IdentifyingConceptualSegments => "IdentifyingConceptualSegments",
            Phase::GeneratingNarration => "GeneratingNarration",
            Phase::ReconcilingTimings => "ReconcilingTimings",
            Phase::GeneratingImages => "GeneratingImages",
            Phase::Done => "Done",
        }
    }

    /// Status line shown while the phase runs.
    pub fn status(&self) -> &'static str {
        match self {
            Phase::GeneratingOutline => "Generating outline...",
            Phase::GeneratingSegments => "Generating script content...",
            Phase::IdentifyingConceptualSegments => "Analyzing content structure...",
            Phase::GeneratingNarration => "Generating audio narration...",
            Phase::ReconcilingTimings => "Aligning narration timings...",
            Phase::GeneratingImages => "Generating visuals...",
            Phase::Done => "Done",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Phase(Phase),
    Images(BatchProgress),
}

impl Progress {
    pub fn message(&self) -> String {
        match self {
            Progress::Phase(phase) => phase.status().to_string(),
            Progress::Images(progress) => {
                format!("Generating images: {}%", progress.percent())
            }
        }
    }
}

fn failed<E: Into<PhaseFailure>>(phase: Phase) -> impl FnOnce(E) -> GenerationError {
    move |e| GenerationError::Phase {
        phase,
        source: e.into(),
    }
}

/// Runs one generation at a time; holds no state between runs.
pub struct ScriptGenerator {
    provider: Option<LlmProvider>,
    llm: Arc<dyn LanguageModel>,
    identifier: SegmentIdentifier,
    narration: NarrationService,
    images: ImageScheduler,
}

impl ScriptGenerator {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        narration: NarrationService,
        images: ImageScheduler,
    ) -> Self {
        Self {
            provider: None,
            identifier: SegmentIdentifier::new(Arc::clone(&llm)),
            llm,
            narration,
            images,
        }
    }

    /// Records which backend `llm` talks to. Runs configured for another
    /// provider are then rejected.
    pub fn with_provider(mut self, provider: LlmProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Wires the HTTP providers, failing if any key the run needs is missing.
    pub fn from_keys(
        provider: LlmProvider,
        keys: &ApiKeys,
        http: reqwest::Client,
        scheduler: SchedulerConfig,
    ) -> std::result::Result<Self, ConfigurationError> {
        let keys = keys.require(provider)?;
        let llm = llm::for_provider(provider, keys.llm, http.clone());
        let narration =
            NarrationService::new(Arc::new(ElevenLabsClient::new(http.clone(), keys.elevenlabs)));
        let images = ImageScheduler::new(
            Arc::new(LeonardoClient::new(http, keys.leonardo)),
            Arc::clone(&llm),
            scheduler,
        );
        Ok(Self::new(llm, narration, images).with_provider(provider))
    }

    pub async fn generate(
        &self,
        config: &GenerationConfig,
        on_progress: &(dyn Fn(Progress) + Send + Sync),
    ) -> Result<GeneratedContent> {
        if config.segment_count == 0 {
            return Err(ConfigurationError::InvalidSegmentCount.into());
        }
        if let Some(wired) = self.provider {
            if wired != config.llm_provider {
                return Err(ConfigurationError::ProviderMismatch {
                    configured: config.llm_provider.name(),
                    wired: wired.name(),
                }
                .into());
            }
        }
        let voice_id = config
            .voice_id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(ConfigurationError::MissingVoice)?;
        let model_id = config
            .model_id
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_VOICE_MODEL);

        let report = |phase: Phase| {
            info!("{}", phase.status());
            on_progress(Progress::Phase(phase));
        };

        report(Phase::GeneratingOutline);
        let outline = self
            .llm
            .complete(&outline_prompt(config))
            .await
            .map_err(failed(Phase::GeneratingOutline))?;

        report(Phase::GeneratingSegments);
        let raw = self
            .generate_content(config, outline)
            .await
            .map_err(failed(Phase::GeneratingSegments))?;

        report(Phase::IdentifyingConceptualSegments);
        let conceptual_segments = self
            .identifier
            .identify(&raw.raw_content)
            .await
            .map_err(failed(Phase::IdentifyingConceptualSegments))?
            .into_segments();

        report(Phase::GeneratingNarration);
        let narration = self
            .narration
            .synthesize(&raw.raw_content, voice_id, model_id)
            .await
            .map_err(failed(Phase::GeneratingNarration))?;

        report(Phase::ReconcilingTimings);
        let script = Script {
            outline: raw.outline,
            raw_content: raw.raw_content,
            conceptual_segments,
            style: config.style.clone(),
            character_timings: None,
        };
        let script = reconcile(&script, &narration.character_timings)
            .map_err(failed(Phase::ReconcilingTimings))?;

        report(Phase::GeneratingImages);
        let images = self
            .images
            .generate_all(&script.conceptual_segments, &config.style_preset_id, &|p| {
                on_progress(Progress::Images(p))
            })
            .await
            .map_err(failed(Phase::GeneratingImages))?;

        let total_duration = script
            .conceptual_segments
            .last()
            .and_then(|s| s.timing)
            .map(|t| t.end)
            .unwrap_or(0.0);

        report(Phase::Done);
        Ok(GeneratedContent {
            script,
            audio: narration.audio,
            images,
            total_duration,
            subtitles: config.subtitles,
        })
    }

    /// Writes the script one part at a time, each part seeing the outline.
    async fn generate_content(
        &self,
        config: &GenerationConfig,
        outline: String,
    ) -> std::result::Result<RawScript, crate::error::ProviderError> {
        let total = config.segment_count;
        let mut parts = Vec::with_capacity(total as usize);
        for part in 1..=total {
            let text = self
                .llm
                .complete(&segment_prompt(config, &outline, part, total))
                .await?;
            parts.push(text.trim().to_string());
        }

        Ok(RawScript {
            outline,
            raw_content: parts.join("\n\n"),
        })
    }
}

fn outline_prompt(config: &GenerationConfig) -> String {
    format!(
        r#"Create a {count}-part outline about "{topic}" that:
1. Flows naturally
2. Builds information progressively
3. Maintains engagement
4. Covers the topic comprehensively

Write in a {style} style, optimized for spoken delivery.
Avoid technical markers or directions - focus on content."#,
        count = config.segment_count,
        topic = config.topic,
        style = config.style,
    )
}

fn segment_prompt(config: &GenerationConfig, outline: &str, part: u32, total: u32) -> String {
    format!(
        r#"Write part {part} of {total} about "{topic}" that:
- Follows a {style} style
- Sounds natural when read aloud
- Includes vivid, visual details
- Flows from the outline naturally

Outline:
{outline}

Use natural language and avoid any technical directions. Return only the narration text."#,
        topic = config.topic,
        style = config.style,
    )
}
