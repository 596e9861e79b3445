//! Generative text backend.
//!
//! [`LlmProvider`] is an enum over concrete backends; adding one means a new
//! module in `providers/`, a new variant and a new match arm. The router does
//! not see providers directly: it depends on [`GenerativeResponder`], which
//! [`Responder`] implements by pairing a provider with the system prompt.

pub mod providers;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

// ── Error ─────────────────────────────────────────────────────────────────────

/// Failure of a generative call. Never escapes a resolution.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("provider request failed: {0}")]
    Request(String),
    #[error("provider timed out after {0:?}")]
    Timeout(Duration),
}

// ── Capability ────────────────────────────────────────────────────────────────

/// Anything that can answer a free-text question.
pub trait GenerativeResponder: Send + Sync {
    fn answer(&self, query: &str) -> impl Future<Output = Result<String, ProviderError>> + Send;
}

// ── Provider enum ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum LlmProvider {
    Dummy(providers::dummy::DummyProvider),
    OpenAiCompatible(providers::openai_compatible::OpenAiCompatibleProvider),
    Ollama(providers::ollama::OllamaProvider),
}

impl LlmProvider {
    /// One round-trip: `content` as the user turn, `system` as the system turn.
    pub async fn complete(&self, content: &str, system: Option<&str>) -> Result<String, ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.complete(content, system).await,
            LlmProvider::OpenAiCompatible(p) => p.complete(content, system).await,
            LlmProvider::Ollama(p) => p.complete(content, system).await,
        }
    }

    /// Reachability probe. The dummy backend is always reachable.
    pub async fn ping(&self) -> Result<(), ProviderError> {
        match self {
            LlmProvider::Dummy(_) => Ok(()),
            LlmProvider::OpenAiCompatible(p) => p.ping().await,
            LlmProvider::Ollama(p) => p.ping().await,
        }
    }
}

// ── Responder ─────────────────────────────────────────────────────────────────

/// Provider plus the system prompt sent with every question.
#[derive(Debug, Clone)]
pub struct Responder {
    provider: LlmProvider,
    system_prompt: Option<String>,
}

impl Responder {
    pub fn new(provider: LlmProvider, system_prompt: Option<String>) -> Self {
        Self { provider, system_prompt }
    }

    pub fn provider(&self) -> &LlmProvider {
        &self.provider
    }
}

impl GenerativeResponder for Responder {
    async fn answer(&self, query: &str) -> Result<String, ProviderError> {
        self.provider.complete(query, self.system_prompt.as_deref()).await
    }
}
