use std::{path::PathBuf, time::Duration};

use thiserror::Error;

use crate::{pipeline::Phase, types::SegmentIndex};

/// Preconditions checked before any network call is made.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Missing API keys: {}", .names.join(", "))]
    MissingApiKeys { names: Vec<&'static str> },

    #[error("No narration voice selected")]
    MissingVoice,

    #[error("Unknown narration voice: {0}")]
    UnknownVoice(String),

    #[error("Segment count must be at least 1")]
    InvalidSegmentCount,

    #[error("Run configured for {configured} but the generator is wired to {wired}")]
    ProviderMismatch {
        configured: &'static str,
        wired: &'static str,
    },

    #[error("Failed to read key file {path}: {reason}")]
    KeyFile { path: PathBuf, reason: String },
}

/// Failure reported by one of the external capabilities (LLM, speech, images).
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{provider} returned {status}: {message}")]
    Status {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("{provider} request failed: {source}")]
    Http {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned an unexpected response: {reason}")]
    InvalidResponse {
        provider: &'static str,
        reason: String,
    },
}

impl ProviderError {
    pub(crate) fn http(provider: &'static str, source: reqwest::Error) -> Self {
        Self::Http { provider, source }
    }

    pub(crate) fn invalid(provider: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider,
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum NarrationError {
    #[error(
        "Voice generation timed out after {}s - text may be too long or the service is experiencing delays",
        .after.as_secs()
    )]
    Timeout { after: Duration },

    #[error("Invalid narration response: {reason}")]
    MalformedResponse { reason: String },

    #[error("Failed to decode narration audio: {0}")]
    AudioDecode(#[from] base64::DecodeError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[derive(Error, Debug)]
pub enum SegmentAlignmentError {
    #[error("Could not find segment {index} content in full text: {preview}...")]
    NotFound { index: SegmentIndex, preview: String },

    #[error("Narration returned no character timings")]
    EmptyTimings,

    #[error("Character timings are inconsistent: {reason}")]
    InvalidTimings { reason: String },
}

/// Why a single image job did not produce an image.
#[derive(Error, Debug)]
pub enum ImageJobError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("generation rejected: {reason}")]
    Rejected { reason: String },

    #[error("image not ready after {attempts} polls")]
    NotReady { attempts: u32 },

    #[error("worker pool closed")]
    PoolClosed,
}

#[derive(Debug)]
pub struct JobFailure {
    pub index: SegmentIndex,
    pub error: ImageJobError,
}

#[derive(Error, Debug)]
#[error("Image generation failed for {failed} of {total} segments")]
pub struct BatchGenerationError {
    pub failed: usize,
    pub total: usize,
    pub failures: Vec<JobFailure>,
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("No audio frames found")]
    NoFrames,

    #[error("Unsupported audio stream: {0}")]
    Unsupported(&'static str),
}

/// The error a single pipeline phase can fail with.
#[derive(Error, Debug)]
pub enum PhaseFailure {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Narration(#[from] NarrationError),

    #[error(transparent)]
    Alignment(#[from] SegmentAlignmentError),

    #[error(transparent)]
    Images(#[from] BatchGenerationError),
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("{phase} failed: {source}")]
    Phase {
        phase: Phase,
        #[source]
        source: PhaseFailure,
    },
}

impl GenerationError {
    pub fn phase(&self) -> Option<Phase> {
        match self {
            GenerationError::Phase { phase, .. } => Some(*phase),
            GenerationError::Configuration(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, GenerationError>;
