//! LLM provider implementations.
//!
//! `build(config, api_key)` is the factory called at startup.
//! Adding a new backend = new module + new match arm.

pub mod dummy;
pub mod ollama;
pub mod openai_compatible;

use crate::config::LlmConfig;
use crate::llm::{LlmProvider, ProviderError};

/// Construct the provider named by `config.provider`.
///
/// `api_key` comes from `LLM_API_KEY` (never TOML) and is `None` for
/// keyless local models.
pub fn build(config: &LlmConfig, api_key: Option<String>) -> Result<LlmProvider, ProviderError> {
    match config.provider.as_str() {
        "dummy" => Ok(LlmProvider::Dummy(dummy::DummyProvider)),
        "openai" | "openai-compatible" => {
            let oai = &config.openai;
            let p = openai_compatible::OpenAiCompatibleProvider::new(
                oai.api_base_url.clone(),
                oai.model.clone(),
                oai.temperature,
                oai.timeout_seconds,
                api_key,
            )?;
            Ok(LlmProvider::OpenAiCompatible(p))
        }
        "ollama" => {
            let o = &config.ollama;
            let p = ollama::OllamaProvider::new(
                o.api_base_url.clone(),
                o.model.clone(),
                o.temperature,
                o.timeout_seconds,
                api_key,
            )?;
            Ok(LlmProvider::Ollama(p))
        }
        _ => Err(ProviderError::UnknownProvider(config.provider.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::path::Path;

    fn llm_config(provider: &str) -> LlmConfig {
        let mut cfg = Config::test_default(Path::new("/tmp")).llm;
        cfg.provider = provider.into();
        cfg
    }

    #[test]
    fn builds_each_known_provider() {
        assert!(matches!(build(&llm_config("dummy"), None), Ok(LlmProvider::Dummy(_))));
        assert!(matches!(build(&llm_config("openai"), None), Ok(LlmProvider::OpenAiCompatible(_))));
        assert!(matches!(
            build(&llm_config("openai-compatible"), Some("k".into())),
            Ok(LlmProvider::OpenAiCompatible(_))
        ));
        assert!(matches!(build(&llm_config("ollama"), None), Ok(LlmProvider::Ollama(_))));
    }

    #[test]
    fn unknown_provider_errors() {
        let err = build(&llm_config("gpt-in-a-box"), None).unwrap_err();
        assert!(matches!(err, ProviderError::UnknownProvider(name) if name == "gpt-in-a-box"));
    }
}
