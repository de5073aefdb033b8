use async_trait::async_trait;

use crate::{
    error::ProviderError,
    narration::{SpeechResponse, SpeechSynthesizer},
    provider::read_json,
};

const PROVIDER: &str = "ElevenLabs";
const API_URL: &str = "https://api.elevenlabs.io/v1/text-to-speech";
const OUTPUT_FORMAT: &str = "mp3_44100_128";

pub struct ElevenLabsClient {
    http: reqwest::Client,
    api_key: String,
}

impl ElevenLabsClient {
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self { http, api_key }
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize_with_timings(
        &self,
        text: &str,
        voice_id: &str,
        model_id: &str,
    ) -> Result<SpeechResponse, ProviderError> {
        let response = self
            .http
            .post(format!("{API_URL}/{voice_id}/with-timestamps"))
            .header("Content-Type", "application/json")
            .header("xi-api-key", &self.api_key)
            .json(&serde_json::json!({
                "text": text,
                "model_id": model_id,
                "output_format": OUTPUT_FORMAT,
            }))
            .send()
            .await
            .map_err(|e| ProviderError::http(PROVIDER, e))?;

        let body = read_json(PROVIDER, response).await?;
        serde_json::from_value(body).map_err(|e| ProviderError::invalid(PROVIDER, e.to_string()))
    }
}
