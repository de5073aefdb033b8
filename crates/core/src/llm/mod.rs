//! Text completion capability and its provider clients.

mod anthropic;
mod openai;

use std::sync::Arc;

use async_trait::async_trait;

pub use anthropic::AnthropicMessages;
pub use openai::OpenAiChat;

use crate::{error::ProviderError, provider::LlmProvider};

/// Single-prompt text completion. Output is free text; callers parse defensively.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Builds the client for the selected provider.
pub fn for_provider(
    provider: LlmProvider,
    api_key: String,
    http: reqwest::Client,
) -> Arc<dyn LanguageModel> {
    match provider {
        LlmProvider::Gpt4 => Arc::new(OpenAiChat::new(http, api_key)),
        LlmProvider::Claude => Arc::new(AnthropicMessages::new(http, api_key)),
    }
}
