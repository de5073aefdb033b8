//! Narration audio with per-character timing.

mod codec;
mod elevenlabs;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use base64::{Engine, prelude::BASE64_STANDARD};
use log::{info, warn};
use serde::Deserialize;

pub use codec::{MediaCodec, Mp3FrameCodec};
pub use elevenlabs::ElevenLabsClient;

use crate::{
    error::{NarrationError, ProviderError},
    types::{AudioClip, CharacterTiming},
};

pub const NARRATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Raw provider payload. Both fields are optional so a malformed response can
/// be reported as such instead of as a transport failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpeechResponse {
    pub audio_base64: Option<String>,
    pub alignment: Option<CharacterTiming>,
}

/// Text-to-speech with character-level alignment.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize_with_timings(
        &self,
        text: &str,
        voice_id: &str,
        model_id: &str,
    ) -> Result<SpeechResponse, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct Narration {
    pub audio: AudioClip,
    pub character_timings: CharacterTiming,
}

pub struct NarrationService {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    timeout: Duration,
}

impl NarrationService {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        Self {
            synthesizer,
            timeout: NARRATION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Narrates `text` once. No retries: a failure here is returned to the caller.
    pub async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        model_id: &str,
    ) -> Result<Narration, NarrationError> {
        info!(
            "starting voice generation: voice={voice_id} model={model_id} text_length={}",
            text.chars().count()
        );

        let call = self
            .synthesizer
            .synthesize_with_timings(text, voice_id, model_id);
        let response = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| NarrationError::Timeout {
                after: self.timeout,
            })??;

        let audio_base64 = response
            .audio_base64
            .filter(|audio| !audio.is_empty())
            .ok_or_else(|| NarrationError::MalformedResponse {
                reason: "missing audio_base64".to_string(),
            })?;
        let alignment = response
            .alignment
            .ok_or_else(|| NarrationError::MalformedResponse {
                reason: "missing alignment".to_string(),
            })?;

        alignment
            .check_lengths()
            .map_err(|reason| NarrationError::MalformedResponse { reason })?;
        if let Err(reason) = alignment.validate() {
            warn!("narration timings are not monotonic: {reason}");
        }

        let bytes = BASE64_STANDARD.decode(audio_base64.trim())?;

        Ok(Narration {
            audio: AudioClip::mpeg(bytes),
            character_timings: alignment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    enum Reply {
        Payload(SpeechResponse),
        Hang,
        Fail,
    }

    struct FakeSynth(Reply);

    #[async_trait]
    impl SpeechSynthesizer for FakeSynth {
        async fn synthesize_with_timings(
            &self,
            _text: &str,
            _voice_id: &str,
            _model_id: &str,
        ) -> Result<SpeechResponse, ProviderError> {
            match &self.0 {
                Reply::Payload(p) => Ok(p.clone()),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(600)).await;
                    Ok(SpeechResponse::default())
                }
                Reply::Fail => Err(ProviderError::Status {
                    provider: "ElevenLabs",
                    status: 401,
                    message: "invalid api key".to_string(),
                }),
            }
        }
    }

    fn alignment() -> CharacterTiming {
        CharacterTiming {
            characters: vec!["H".into(), "i".into()],
            character_start_times_seconds: vec![0.0, 0.2],
            character_end_times_seconds: vec![0.2, 0.4],
        }
    }

    fn service(reply: Reply) -> NarrationService {
        NarrationService::new(Arc::new(FakeSynth(reply)))
    }

    #[tokio::test]
    async fn decodes_audio_and_keeps_alignment_verbatim() {
        let reply = Reply::Payload(SpeechResponse {
            audio_base64: Some(BASE64_STANDARD.encode(b"ID3audio")),
            alignment: Some(alignment()),
        });
        let narration = service(reply).synthesize("Hi", "voice", "model").await.unwrap();
        assert_eq!(narration.audio.bytes, b"ID3audio");
        assert_eq!(narration.audio.mime_type, "audio/mpeg");
        assert_eq!(narration.character_timings, alignment());
    }

    #[tokio::test]
    async fn missing_audio_is_malformed() {
        let reply = Reply::Payload(SpeechResponse {
            audio_base64: None,
            alignment: Some(alignment()),
        });
        let err = service(reply).synthesize("Hi", "v", "m").await.unwrap_err();
        assert!(matches!(err, NarrationError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn missing_alignment_is_malformed() {
        let reply = Reply::Payload(SpeechResponse {
            audio_base64: Some(BASE64_STANDARD.encode(b"x")),
            alignment: None,
        });
        let err = service(reply).synthesize("Hi", "v", "m").await.unwrap_err();
        assert!(err.to_string().contains("alignment"));
    }

    #[tokio::test]
    async fn ragged_alignment_is_malformed() {
        let mut ragged = alignment();
        ragged.character_end_times_seconds.pop();
        let reply = Reply::Payload(SpeechResponse {
            audio_base64: Some(BASE64_STANDARD.encode(b"x")),
            alignment: Some(ragged),
        });
        let err = service(reply).synthesize("Hi", "v", "m").await.unwrap_err();
        assert!(matches!(err, NarrationError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn invalid_base64_is_a_decode_error() {
        let reply = Reply::Payload(SpeechResponse {
            audio_base64: Some("not base64!!".to_string()),
            alignment: Some(alignment()),
        });
        let err = service(reply).synthesize("Hi", "v", "m").await.unwrap_err();
        assert!(matches!(err, NarrationError::AudioDecode(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out() {
        let err = service(Reply::Hang)
            .synthesize("Hi", "v", "m")
            .await
            .unwrap_err();
        match err {
            NarrationError::Timeout { after } => assert_eq!(after, NARRATION_TIMEOUT),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn provider_errors_pass_through() {
        let err = service(Reply::Fail)
            .synthesize("Hi", "v", "m")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NarrationError::Provider(ProviderError::Status { status: 401, .. })
        ));
    }
}
