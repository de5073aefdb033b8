use async_trait::async_trait;

use crate::{
    error::ProviderError,
    llm::LanguageModel,
    provider::{LlmProvider, read_json},
};

const PROVIDER: &str = "OpenAI";

pub struct OpenAiChat {
    http: reqwest::Client,
    api_key: String,
}

impl OpenAiChat {
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self { http, api_key }
    }
}

#[async_trait]
impl LanguageModel for OpenAiChat {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let config = LlmProvider::Gpt4.config();

        let response = self
            .http
            .post(config.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "model": config.model,
                "messages": [
                    {
                        "role": "user",
                        "content": prompt,
                    },
                ],
                "temperature": 0.7,
            }))
            .send()
            .await
            .map_err(|e| ProviderError::http(PROVIDER, e))?;

        let response = read_json(PROVIDER, response).await?;

        let message = &response["choices"][0]["message"];
        if message.is_null() {
            return Err(ProviderError::invalid(
                PROVIDER,
                format!("no choices in response: {response}"),
            ));
        }

        // a null content is an empty completion, not a malformed response
        Ok(message["content"].as_str().unwrap_or_default().to_string())
    }
}
