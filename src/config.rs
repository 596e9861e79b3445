//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` (or the `-f` path) relative to the current
//! working directory, then applies `OBAT_WORK_DIR`, `OBAT_LOG_LEVEL` and
//! `OBAT_PRIORITY`. The LLM API key only ever comes from `LLM_API_KEY`.

use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::engine::router::{self, Priority};
use crate::error::AppError;
use crate::llm::providers::ollama;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Used when the active provider has no endpoint section (`dummy`).
const DEFAULT_TIMEOUT_SECONDS: u64 = router::DEFAULT_GENERATION_TIMEOUT.as_secs();

/// One chat-completions endpoint (`[llm.openai]`, `[llm.ollama]`).
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    pub model: String,
    pub temperature: f32,
    /// Per-request timeout; also bounds the router's wait for an answer.
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Active provider: `"dummy"`, `"ollama"`, `"openai"` / `"openai-compatible"`.
    /// Written as `default = "…"` under `[llm]`.
    pub provider: String,
    /// File holding the system prompt sent with every question.
    pub system_prompt: Option<PathBuf>,
    pub openai: EndpointConfig,
    pub ollama: EndpointConfig,
}

impl LlmConfig {
    /// Endpoint section of the active provider, if it has one.
    pub fn active_endpoint(&self) -> Option<&EndpointConfig> {
        match self.provider.as_str() {
            "openai" | "openai-compatible" => Some(&self.openai),
            "ollama" => Some(&self.ollama),
            _ => None,
        }
    }

    /// How long the router waits for one generative answer.
    pub fn generation_timeout(&self) -> Duration {
        let secs = self
            .active_endpoint()
            .map(|e| e.timeout_seconds)
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS);
        Duration::from_secs(secs)
    }
}

/// Fallback behaviour of the router (`[router]`).
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub priority: Priority,
    /// Reply used when the generative path fails and nothing else answered.
    pub apology_text: String,
    /// Substring that marks a generated answer as a refusal/failure.
    pub apology_marker: String,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_name: String,
    /// Working directory for persistent data (already expanded, no `~`).
    pub work_dir: PathBuf,
    pub log_level: String,
    /// Knowledge base JSON file.
    pub knowledge_path: PathBuf,
    /// Chat log JSONL file (resolved against `work_dir`).
    pub chat_log_path: PathBuf,
    pub router: RouterConfig,
    pub llm: LlmConfig,
    /// From `LLM_API_KEY`; `None` for keyless local models.
    pub llm_api_key: Option<String>,
}

impl Config {
    /// Read the configured system prompt file, if any.
    pub fn load_system_prompt(&self) -> Result<Option<String>, AppError> {
        let Some(path) = &self.llm.system_prompt else {
            return Ok(None);
        };
        let text = fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("cannot read system prompt {}: {e}", path.display())))?;
        let text = text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }
}

/// Values that take precedence over the TOML file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub work_dir: Option<String>,
    pub log_level: Option<String>,
    pub priority: Option<String>,
}

impl Overrides {
    pub fn from_env() -> Self {
        Self {
            work_dir: env::var("OBAT_WORK_DIR").ok(),
            log_level: env::var("OBAT_LOG_LEVEL").ok(),
            priority: env::var("OBAT_PRIORITY").ok(),
        }
    }
}

// ── Raw TOML shape ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawConfig {
    bot: RawBot,
    knowledge: RawKnowledge,
    #[serde(default)]
    router: RawRouter,
    #[serde(default)]
    chat_log: RawChatLog,
    #[serde(default)]
    llm: RawLlm,
}

#[derive(Deserialize)]
struct RawBot {
    bot_name: String,
    work_dir: String,
    log_level: String,
}

#[derive(Deserialize)]
struct RawKnowledge {
    path: String,
}

#[derive(Deserialize)]
struct RawRouter {
    #[serde(default)]
    priority: Priority,
    #[serde(default = "default_apology_text")]
    apology_text: String,
    #[serde(default = "default_apology_marker")]
    apology_marker: String,
}

impl Default for RawRouter {
    fn default() -> Self {
        Self {
            priority: Priority::default(),
            apology_text: default_apology_text(),
            apology_marker: default_apology_marker(),
        }
    }
}

#[derive(Deserialize)]
struct RawChatLog {
    #[serde(default = "default_chat_log_file")]
    file: String,
}

impl Default for RawChatLog {
    fn default() -> Self {
        Self { file: default_chat_log_file() }
    }
}

#[derive(Deserialize)]
struct RawLlm {
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default = "default_openai_endpoint")]
    openai: RawEndpoint,
    #[serde(default = "default_ollama_endpoint")]
    ollama: RawEndpoint,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            system_prompt: None,
            openai: default_openai_endpoint(),
            ollama: default_ollama_endpoint(),
        }
    }
}

/// Every field optional; missing ones fall back to the provider's defaults.
#[derive(Deserialize)]
struct RawEndpoint {
    api_base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    timeout_seconds: Option<u64>,
}

impl RawEndpoint {
    fn resolve(self, defaults: RawEndpoint) -> EndpointConfig {
        EndpointConfig {
            api_base_url: self.api_base_url.or(defaults.api_base_url).unwrap_or_default(),
            model: self.model.or(defaults.model).unwrap_or_default(),
            temperature: self.temperature.or(defaults.temperature).unwrap_or_default(),
            timeout_seconds: self
                .timeout_seconds
                .or(defaults.timeout_seconds)
                .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        }
    }
}

fn default_apology_text() -> String { router::DEFAULT_APOLOGY_TEXT.to_string() }
fn default_apology_marker() -> String { router::DEFAULT_APOLOGY_MARKER.to_string() }
fn default_chat_log_file() -> String { "chat_logs.jsonl".to_string() }
fn default_llm_provider() -> String { "dummy".to_string() }

fn default_openai_endpoint() -> RawEndpoint {
    RawEndpoint {
        api_base_url: Some("https://api.openai.com/v1/chat/completions".to_string()),
        model: Some("gpt-4o-mini".to_string()),
        temperature: Some(0.2),
        timeout_seconds: Some(DEFAULT_TIMEOUT_SECONDS),
    }
}

fn default_ollama_endpoint() -> RawEndpoint {
    RawEndpoint {
        api_base_url: Some(ollama::DEFAULT_API_BASE_URL.to_string()),
        model: Some(ollama::DEFAULT_MODEL.to_string()),
        temperature: Some(0.0),
        timeout_seconds: Some(DEFAULT_TIMEOUT_SECONDS),
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Load from `path` (default `config/default.toml`) with env overrides.
pub fn load(path: Option<&str>) -> Result<Config, AppError> {
    load_from(Path::new(path.unwrap_or(DEFAULT_CONFIG_PATH)), &Overrides::from_env())
}

/// Loader with explicit overrides; tests use this instead of mutating env vars.
pub fn load_from(path: &Path, overrides: &Overrides) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let b = parsed.bot;
    let work_dir = expand_home(overrides.work_dir.as_deref().unwrap_or(&b.work_dir));
    let log_level = overrides.log_level.clone().unwrap_or(b.log_level);

    let priority = match overrides.priority.as_deref() {
        Some(p) => p.parse::<Priority>().map_err(AppError::Config)?,
        None => parsed.router.priority,
    };

    let chat_log_path = {
        let p = expand_home(&parsed.chat_log.file);
        if p.is_absolute() { p } else { work_dir.join(p) }
    };

    let l = parsed.llm;

    Ok(Config {
        bot_name: b.bot_name,
        work_dir,
        log_level,
        knowledge_path: expand_home(&parsed.knowledge.path),
        chat_log_path,
        router: RouterConfig {
            priority,
            apology_text: parsed.router.apology_text,
            apology_marker: parsed.router.apology_marker,
        },
        llm: LlmConfig {
            provider: l.provider,
            system_prompt: l.system_prompt.as_deref().map(expand_home),
            openai: l.openai.resolve(default_openai_endpoint()),
            ollama: l.ollama.resolve(default_ollama_endpoint()),
        },
        llm_api_key: env::var("LLM_API_KEY").ok(),
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// Safe `Config` for unit tests: dummy LLM, no API keys, no external calls.
#[cfg(test)]
impl Config {
    pub fn test_default(work_dir: &Path) -> Self {
        let endpoint = EndpointConfig {
            api_base_url: "http://localhost:0/v1/chat/completions".into(),
            model: "test-model".into(),
            temperature: 0.0,
            timeout_seconds: 1,
        };
        Self {
            bot_name: "test".into(),
            work_dir: work_dir.to_path_buf(),
            log_level: "info".into(),
            knowledge_path: work_dir.join("knowledge_base.json"),
            chat_log_path: work_dir.join("chat_logs.jsonl"),
            router: RouterConfig {
                priority: Priority::KbFirst,
                apology_text: default_apology_text(),
                apology_marker: default_apology_marker(),
            },
            llm: LlmConfig {
                provider: "dummy".into(),
                system_prompt: None,
                openai: endpoint.clone(),
                ollama: endpoint,
            },
            llm_api_key: None,
        }
    }
}
