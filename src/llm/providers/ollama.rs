//! Local Ollama provider.
//!
//! Ollama serves an OpenAI-compatible endpoint, so this wraps
//! [`OpenAiCompatibleProvider`] and exists to give `[llm.ollama]` its own
//! config section and defaults (`llama3.2`, temperature 0).

use crate::llm::ProviderError;

use super::openai_compatible::OpenAiCompatibleProvider;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:11434/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama3.2";

#[derive(Debug, Clone)]
pub struct OllamaProvider {
    inner: OpenAiCompatibleProvider,
}

impl OllamaProvider {
    /// Ollama needs no key; one is forwarded when set, for proxies that want it.
    pub fn new(
        api_base_url: String,
        model: String,
        temperature: f32,
        timeout_seconds: u64,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let inner = OpenAiCompatibleProvider::new(api_base_url, model, temperature, timeout_seconds, api_key)?;
        Ok(Self { inner })
    }

    pub fn model(&self) -> &str {
        self.inner.model()
    }

    pub async fn complete(&self, content: &str, system: Option<&str>) -> Result<String, ProviderError> {
        self.inner.complete(content, system).await
    }

    pub async fn ping(&self) -> Result<(), ProviderError> {
        self.inner.ping().await
    }
}
