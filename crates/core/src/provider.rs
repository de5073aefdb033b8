use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Language-model backend used for every text completion in a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Gpt4,
    Claude,
}

pub struct ProviderConfig {
    pub api_url: &'static str,
    pub model: &'static str,
    pub key_name: &'static str,
    pub env_var: &'static str,
}

impl LlmProvider {
    pub fn config(&self) -> ProviderConfig {
        match self {
            LlmProvider::Gpt4 => ProviderConfig {
                api_url: "https://api.openai.com/v1/chat/completions",
                model: "gpt-4o",
                key_name: "openai_key",
                env_var: "OPENAI_API_KEY",
            },
            LlmProvider::Claude => ProviderConfig {
                api_url: "https://api.anthropic.com/v1/messages",
                model: "claude-3-5-sonnet-20241022",
                key_name: "anthropic_key",
                env_var: "ANTHROPIC_API_KEY",
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::Gpt4 => "OpenAI",
            LlmProvider::Claude => "Anthropic",
        }
    }
}

/// Reads a JSON body, turning non-2xx responses into [`ProviderError::Status`]
/// with the provider's own message.
pub(crate) async fn read_json(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<serde_json::Value, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Status {
            provider,
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    response
        .json::<serde_json::Value>()
        .await
        .map_err(|e| ProviderError::http(provider, e))
}

/// Pulls the human-readable message out of a provider error body when there is one.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };

    let candidates = [
        &value["error"]["message"],
        &value["detail"]["message"],
        &value["error"],
        &value["message"],
        &value["detail"],
    ];
    candidates
        .iter()
        .find_map(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}
