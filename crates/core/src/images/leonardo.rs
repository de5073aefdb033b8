use async_trait::async_trait;
use log::debug;

use crate::{
    error::ProviderError,
    images::{ImageGenerator, ImageRequest, JobId, JobStatus},
    provider::read_json,
};

const PROVIDER: &str = "Leonardo";
const API_URL: &str = "https://cloud.leonardo.ai/api/rest/v1/generations";
const MODEL_ID: &str = "b2614463-296c-462a-9586-aafdb8f00e36";

/// 16:9 at the largest size the model supports.
pub const IMAGE_WIDTH: u32 = 1472;
pub const IMAGE_HEIGHT: u32 = 832;

pub struct LeonardoClient {
    http: reqwest::Client,
    api_key: String,
}

impl LeonardoClient {
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self { http, api_key }
    }
}

#[async_trait]
impl ImageGenerator for LeonardoClient {
    async fn submit(&self, request: &ImageRequest) -> Result<JobId, ProviderError> {
        let response = self
            .http
            .post(API_URL)
            .header("accept", "application/json")
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "modelId": MODEL_ID,
                "prompt": request.prompt,
                "width": IMAGE_WIDTH,
                "height": IMAGE_HEIGHT,
                "num_images": 1,
                "styleUUID": request.style_preset_id,
            }))
            .send()
            .await
            .map_err(|e| ProviderError::http(PROVIDER, e))?;

        let body = read_json(PROVIDER, response).await?;
        let id = body["sdGenerationJob"]["generationId"]
            .as_str()
            .ok_or_else(|| ProviderError::invalid(PROVIDER, "no generation id received"))?;

        debug!("submitted generation {id}");
        Ok(JobId(id.to_string()))
    }

    async fn poll(&self, job: &JobId) -> Result<JobStatus, ProviderError> {
        let response = self
            .http
            .get(format!("{API_URL}/{}", job.0))
            .header("accept", "application/json")
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::http(PROVIDER, e))?;

        let body = read_json(PROVIDER, response).await?;
        Ok(parse_generation(&body["generations_by_pk"]))
    }
}

fn parse_generation(generation: &serde_json::Value) -> JobStatus {
    let url = generation["generated_images"][0]["url"].as_str();
    match (generation["status"].as_str(), url) {
        (Some("FAILED"), _) => JobStatus::Failed {
            reason: "generation failed".to_string(),
        },
        (_, Some(url)) => JobStatus::Complete {
            url: url.to_string(),
        },
        _ => JobStatus::Pending,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn complete_generation_yields_url() {
        let body = json!({
            "status": "COMPLETE",
            "generated_images": [{"url": "https://cdn.example/1.jpg", "id": "x"}]
        });
        assert_eq!(
            parse_generation(&body),
            JobStatus::Complete {
                url: "https://cdn.example/1.jpg".to_string()
            }
        );
    }

    #[test]
    fn generation_without_images_is_pending() {
        let body = json!({"status": "PENDING", "generated_images": []});
        assert_eq!(parse_generation(&body), JobStatus::Pending);
        assert_eq!(parse_generation(&serde_json::Value::Null), JobStatus::Pending);
    }

    #[test]
    fn failed_generation_is_reported() {
        let body = json!({"status": "FAILED", "generated_images": []});
        assert!(matches!(parse_generation(&body), JobStatus::Failed { .. }));
    }
}
