use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::fs;

use crate::{error::ConfigurationError, provider::LlmProvider};

pub const ELEVENLABS_KEY: &str = "elevenlabs_key";
pub const LEONARDO_KEY: &str = "leonardo_key";

/// Provider API keys stored for one user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiKeys {
    pub openai_key: Option<String>,
    pub anthropic_key: Option<String>,
    pub elevenlabs_key: Option<String>,
    pub leonardo_key: Option<String>,
}

/// Keys required for one run, all present.
#[derive(Debug, Clone)]
pub struct ResolvedKeys {
    pub llm: String,
    pub elevenlabs: String,
    pub leonardo: String,
}

impl ApiKeys {
    /// Values from `overrides` win where they are set.
    pub fn merged(self, overrides: ApiKeys) -> ApiKeys {
        ApiKeys {
            openai_key: present(overrides.openai_key).or(present(self.openai_key)),
            anthropic_key: present(overrides.anthropic_key).or(present(self.anthropic_key)),
            elevenlabs_key: present(overrides.elevenlabs_key).or(present(self.elevenlabs_key)),
            leonardo_key: present(overrides.leonardo_key).or(present(self.leonardo_key)),
        }
    }

    /// Returns the keys a run with `provider` needs, or every missing key name at once.
    pub fn require(&self, provider: LlmProvider) -> Result<ResolvedKeys, ConfigurationError> {
        let llm_key = match provider {
            LlmProvider::Gpt4 => &self.openai_key,
            LlmProvider::Claude => &self.anthropic_key,
        };

        let wanted = [
            (provider.config().key_name, llm_key),
            (ELEVENLABS_KEY, &self.elevenlabs_key),
            (LEONARDO_KEY, &self.leonardo_key),
        ];

        let names: Vec<&'static str> = wanted
            .iter()
            .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
            .map(|(name, _)| *name)
            .collect();
        if !names.is_empty() {
            return Err(ConfigurationError::MissingApiKeys { names });
        }

        Ok(ResolvedKeys {
            llm: present(llm_key.clone()).unwrap_or_default(),
            elevenlabs: present(self.elevenlabs_key.clone()).unwrap_or_default(),
            leonardo: present(self.leonardo_key.clone()).unwrap_or_default(),
        })
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Source of per-user provider keys.
#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn fetch(&self, user: &str) -> Result<ApiKeys, ConfigurationError>;
}

/// Reads keys from `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `ELEVENLABS_API_KEY`
/// and `LEONARDO_API_KEY`. The user identity is ignored.
pub struct EnvKeyStore;

#[async_trait]
impl KeyStore for EnvKeyStore {
    async fn fetch(&self, _user: &str) -> Result<ApiKeys, ConfigurationError> {
        let var = |name: &str| std::env::var(name).ok();
        Ok(ApiKeys {
            openai_key: var(LlmProvider::Gpt4.config().env_var),
            anthropic_key: var(LlmProvider::Claude.config().env_var),
            elevenlabs_key: var("ELEVENLABS_API_KEY"),
            leonardo_key: var("LEONARDO_API_KEY"),
        })
    }
}

/// TOML file with one table of keys per user:
///
/// ```toml
/// [default]
/// openai_key = "sk-..."
/// elevenlabs_key = "..."
/// ```
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl KeyStore for FileKeyStore {
    async fn fetch(&self, user: &str) -> Result<ApiKeys, ConfigurationError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no key file at {}", self.path.display());
                return Ok(ApiKeys::default());
            }
            Err(e) => {
                return Err(ConfigurationError::KeyFile {
                    path: self.path.clone(),
                    reason: e.to_string(),
                });
            }
        };

        let mut profiles: HashMap<String, ApiKeys> =
            toml::from_str(&contents).map_err(|e| ConfigurationError::KeyFile {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        Ok(profiles.remove(user).unwrap_or_default())
    }
}

/// File keys overridden by environment keys.
pub struct LayeredKeyStore {
    file: FileKeyStore,
}

impl LayeredKeyStore {
    pub fn new(file: FileKeyStore) -> Self {
        Self { file }
    }
}

#[async_trait]
impl KeyStore for LayeredKeyStore {
    async fn fetch(&self, user: &str) -> Result<ApiKeys, ConfigurationError> {
        let from_file = self.file.fetch(user).await?;
        let from_env = EnvKeyStore.fetch(user).await?;
        Ok(from_file.merged(from_env))
    }
}
