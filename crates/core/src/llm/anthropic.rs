use async_trait::async_trait;

use crate::{
    error::ProviderError,
    llm::LanguageModel,
    provider::{LlmProvider, read_json},
};

const PROVIDER: &str = "Anthropic";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

pub struct AnthropicMessages {
    http: reqwest::Client,
    api_key: String,
}

impl AnthropicMessages {
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self { http, api_key }
    }
}

#[async_trait]
impl LanguageModel for AnthropicMessages {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let config = LlmProvider::Claude.config();

        let response = self
            .http
            .post(config.api_url)
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&serde_json::json!({
                "model": config.model,
                "max_tokens": MAX_TOKENS,
                "messages": [
                    {
                        "role": "user",
                        "content": prompt,
                    },
                ],
            }))
            .send()
            .await
            .map_err(|e| ProviderError::http(PROVIDER, e))?;

        let response = read_json(PROVIDER, response).await?;

        response["content"]
            .as_array()
            .and_then(|blocks| blocks.iter().find(|b| b["type"] == "text"))
            .and_then(|block| block["text"].as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                ProviderError::invalid(PROVIDER, format!("no text block in response: {response}"))
            })
    }
}
