//! Priority-based routing between the knowledge base and the generative
//! responder.
//!
//! `resolve` makes at most two attempts: the preferred path, then the other
//! one once. It always returns text and always appends exactly one chat log
//! record, whatever happened on the way.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::chat_log::{ChatLog, LogRecord};
use crate::knowledge::KnowledgeHandle;
use crate::llm::{GenerativeResponder, ProviderError};

use super::compose::compose;
use super::intent::classify;
use super::matcher;
use super::normalize::normalize;

pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_APOLOGY_TEXT: &str = "Maaf, terjadi kesalahan dalam pemrosesan. Silakan coba lagi.";
pub const DEFAULT_APOLOGY_MARKER: &str = "Maaf";

/// Which path is tried first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    #[default]
    KbFirst,
    LlmFirst,
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kb-first" | "kb_first" | "kb" => Ok(Priority::KbFirst),
            "llm-first" | "llm_first" | "llm" => Ok(Priority::LlmFirst),
            other => Err(format!("unknown priority '{other}' (expected kb-first or llm-first)")),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::KbFirst => f.write_str("kb-first"),
            Priority::LlmFirst => f.write_str("llm-first"),
        }
    }
}

pub struct Router<R> {
    knowledge: KnowledgeHandle,
    responder: R,
    chat_log: ChatLog,
    generation_timeout: Duration,
    apology_text: String,
    apology_marker: String,
}

impl<R: GenerativeResponder> Router<R> {
    pub fn new(knowledge: KnowledgeHandle, responder: R, chat_log: ChatLog) -> Self {
        Self {
            knowledge,
            responder,
            chat_log,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            apology_text: DEFAULT_APOLOGY_TEXT.to_string(),
            apology_marker: DEFAULT_APOLOGY_MARKER.to_string(),
        }
    }

    /// Upper bound on one generative call; elapsing counts as a failure.
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    /// `text` replaces a failed generation; `marker` flags a generated
    /// answer as unusable. An empty marker disables the check.
    pub fn with_apology(mut self, text: impl Into<String>, marker: impl Into<String>) -> Self {
        self.apology_text = text.into();
        self.apology_marker = marker.into();
        self
    }

    pub fn knowledge(&self) -> &KnowledgeHandle {
        &self.knowledge
    }

    pub fn responder(&self) -> &R {
        &self.responder
    }

    pub fn chat_log(&self) -> &ChatLog {
        &self.chat_log
    }

    /// Answer `query`, then record the exchange.
    pub async fn resolve(&self, query: &str, priority: Priority) -> String {
        let input = query.trim();
        let response = match priority {
            Priority::KbFirst => self.kb_first(input).await,
            Priority::LlmFirst => self.llm_first(input).await,
        };

        if let Err(e) = self.chat_log.append_async(LogRecord::now(query, response.as_str())).await {
            warn!(error = %e, path = %self.chat_log.path().display(), "chat log append failed");
        }
        response
    }

    /// Structured path alone: match, classify, compose.
    pub fn lookup(&self, query: &str) -> Option<String> {
        let store = self.knowledge.snapshot();
        let q = normalize(query);
        let result = matcher::find(&store, &q).with_intent(classify(&q));

        let Some(via) = result.matched_via else {
            debug!(query = %q, "no knowledge match");
            return None;
        };
        debug!(
            matched_via = via.as_str(),
            intent = result.intent.as_str(),
            entry = result.entry.map(|e| e.name.as_str()),
            category = result.category.map(|c| c.name.as_str()),
            "knowledge match"
        );
        compose(&result).filter(|text| !text.trim().is_empty())
    }

    async fn kb_first(&self, input: &str) -> String {
        if let Some(answer) = self.lookup(input) {
            return answer;
        }
        info!("no knowledge answer, falling back to generative responder");
        match self.generate(input).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "generative fallback failed");
                self.apology_text.clone()
            }
        }
    }

    async fn llm_first(&self, input: &str) -> String {
        match self.generate(input).await {
            Ok(text) if !self.is_apology(&text) => text,
            outcome => {
                match &outcome {
                    Err(e) => warn!(error = %e, "generative answer failed, trying knowledge base"),
                    Ok(_) => info!("generative answer carries apology marker, trying knowledge base"),
                }
                match self.lookup(input) {
                    Some(answer) => answer,
                    // Keep the generated text, apology or not; only a hard failure is replaced.
                    None => outcome.unwrap_or_else(|_| self.apology_text.clone()),
                }
            }
        }
    }

    async fn generate(&self, input: &str) -> Result<String, ProviderError> {
        let text = tokio::time::timeout(self.generation_timeout, self.responder.answer(input))
            .await
            .map_err(|_| ProviderError::Timeout(self.generation_timeout))??;
        if text.trim().is_empty() {
            return Err(ProviderError::Request("empty answer".into()));
        }
        Ok(text)
    }

    fn is_apology(&self, text: &str) -> bool {
        !self.apology_marker.is_empty() && text.contains(&self.apology_marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::KnowledgeStore;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Responder with a fixed outcome that counts its calls.
    struct Scripted {
        reply: Result<String, String>,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn ok(text: &str) -> Self {
            Self { reply: Ok(text.into()), delay: None, calls: AtomicUsize::new(0) }
        }

        fn failing() -> Self {
            Self { reply: Err("connection refused".into()), delay: None, calls: AtomicUsize::new(0) }
        }

        fn slow(delay: Duration) -> Self {
            Self { delay: Some(delay), ..Self::ok("terlambat") }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl GenerativeResponder for Scripted {
        async fn answer(&self, _query: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(d) = self.delay {
                tokio::time::sleep(d).await;
            }
            self.reply.clone().map_err(ProviderError::Request)
        }
    }

    fn knowledge() -> KnowledgeHandle {
        KnowledgeHandle::new(
            KnowledgeStore::from_value(json!({
                "diabetes": [
                    { "nama": "Metformin", "merk_dagang": ["Glucophage"], "dosis": "500 mg 2x sehari",
                      "efek_samping": ["mual", "diare"] }
                ],
                "hipertensi": [
                    { "nama": "Amlodipin", "dosis": "5 mg 1x sehari" }
                ]
            }))
            .unwrap(),
        )
    }

    fn router(responder: Scripted, dir: &TempDir) -> Router<Scripted> {
        Router::new(knowledge(), responder, ChatLog::new(dir.path().join("chat.jsonl")))
    }

    #[tokio::test]
    async fn kb_first_answers_from_knowledge() {
        let dir = TempDir::new().unwrap();
        let r = router(Scripted::ok("llm"), &dir);

        let out = r.resolve("Efek samping Metformin", Priority::KbFirst).await;

        assert_eq!(out, "Efek samping Metformin:\nmual, diare");
        assert_eq!(r.responder().calls(), 0);
    }

    #[tokio::test]
    async fn kb_first_miss_calls_responder_once() {
        let dir = TempDir::new().unwrap();
        let r = router(Scripted::ok("Istirahat yang cukup."), &dir);

        let out = r.resolve("xyz", Priority::KbFirst).await;

        assert_eq!(out, "Istirahat yang cukup.");
        assert_eq!(r.responder().calls(), 1);
    }

    #[tokio::test]
    async fn kb_first_miss_and_failure_gives_apology() {
        let dir = TempDir::new().unwrap();
        let r = router(Scripted::failing(), &dir).with_apology("Maaf, coba lagi.", "Maaf");

        let out = r.resolve("xyz", Priority::KbFirst).await;

        assert_eq!(out, "Maaf, coba lagi.");
        assert_eq!(r.responder().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_counts_as_failure() {
        let dir = TempDir::new().unwrap();
        let r = router(Scripted::slow(Duration::from_secs(30)), &dir)
            .with_generation_timeout(Duration::from_secs(2));

        let out = r.resolve("xyz", Priority::KbFirst).await;

        assert_eq!(out, DEFAULT_APOLOGY_TEXT);
        assert_eq!(r.responder().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn llm_first_timeout_falls_back_to_knowledge() {
        let dir = TempDir::new().unwrap();
        let r = router(Scripted::slow(Duration::from_secs(30)), &dir)
            .with_generation_timeout(Duration::from_secs(1));

        let hit = r.resolve("dosis metformin", Priority::LlmFirst).await;
        let miss = r.resolve("xyz", Priority::LlmFirst).await;

        assert_eq!(hit, "Dosis Metformin:\n500 mg 2x sehari");
        assert_eq!(miss, DEFAULT_APOLOGY_TEXT);
        assert_eq!(r.responder().calls(), 2);
        assert_eq!(r.chat_log().read_all().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn llm_first_keeps_good_generated_answer() {
        let dir = TempDir::new().unwrap();
        let r = router(Scripted::ok("Metformin menurunkan gula darah."), &dir);

        let out = r.resolve("apa itu metformin", Priority::LlmFirst).await;

        assert_eq!(out, "Metformin menurunkan gula darah.");
        assert_eq!(r.responder().calls(), 1);
    }

    #[tokio::test]
    async fn llm_first_failure_falls_back_to_knowledge() {
        let dir = TempDir::new().unwrap();
        let r = router(Scripted::failing(), &dir);

        let out = r.resolve("dosis amlodipin", Priority::LlmFirst).await;

        assert_eq!(out, "Dosis Amlodipin:\n5 mg 1x sehari");
        assert_eq!(r.responder().calls(), 1);
    }

    #[tokio::test]
    async fn llm_first_apology_marker_falls_back_to_knowledge() {
        let dir = TempDir::new().unwrap();
        let r = router(Scripted::ok("Maaf, saya tidak tahu."), &dir);

        let out = r.resolve("dosis glucophage", Priority::LlmFirst).await;

        assert_eq!(out, "Dosis Metformin:\n500 mg 2x sehari");
    }

    #[tokio::test]
    async fn llm_first_apology_kept_when_knowledge_misses() {
        let dir = TempDir::new().unwrap();
        let r = router(Scripted::ok("Maaf, saya tidak tahu."), &dir);

        let out = r.resolve("xyz", Priority::LlmFirst).await;

        assert_eq!(out, "Maaf, saya tidak tahu.");
        assert_eq!(r.responder().calls(), 1);
    }

    #[tokio::test]
    async fn llm_first_failure_and_miss_gives_apology() {
        let dir = TempDir::new().unwrap();
        let r = router(Scripted::failing(), &dir);

        let out = r.resolve("xyz", Priority::LlmFirst).await;

        assert_eq!(out, DEFAULT_APOLOGY_TEXT);
        assert_eq!(r.responder().calls(), 1);
    }

    #[tokio::test]
    async fn empty_generated_text_is_failure() {
        let dir = TempDir::new().unwrap();
        let r = router(Scripted::ok("   "), &dir);
        assert_eq!(r.resolve("xyz", Priority::KbFirst).await, DEFAULT_APOLOGY_TEXT);
    }

    #[tokio::test]
    async fn every_resolve_logs_exact_input_and_output() {
        let dir = TempDir::new().unwrap();
        let r = router(Scripted::failing(), &dir);

        let a = r.resolve("  Dosis Metformin ", Priority::KbFirst).await;
        let b = r.resolve("xyz", Priority::LlmFirst).await;

        let records = r.chat_log().read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].user_query, "  Dosis Metformin ");
        assert_eq!(records[0].bot_response, a);
        assert_eq!(records[1].user_query, "xyz");
        assert_eq!(records[1].bot_response, b);
    }

    #[tokio::test]
    async fn log_failure_does_not_change_response() {
        let dir = TempDir::new().unwrap();
        // A directory cannot be opened for append.
        let r = Router::new(knowledge(), Scripted::ok("x"), ChatLog::new(dir.path()));

        let out = r.resolve("dosis metformin", Priority::KbFirst).await;

        assert_eq!(out, "Dosis Metformin:\n500 mg 2x sehari");
    }

    #[tokio::test]
    async fn empty_apology_marker_disables_fallback() {
        let dir = TempDir::new().unwrap();
        let r = router(Scripted::ok("Maaf."), &dir).with_apology("x", "");
        assert_eq!(r.resolve("dosis metformin", Priority::LlmFirst).await, "Maaf.");
    }

    #[tokio::test]
    async fn reload_applies_to_later_resolutions() {
        let dir = TempDir::new().unwrap();
        let r = router(Scripted::ok("llm"), &dir);
        assert_eq!(r.resolve("dosis captopril", Priority::KbFirst).await, "llm");

        r.knowledge().replace(
            KnowledgeStore::from_value(json!({ "hipertensi": [{ "nama": "Captopril", "dosis": "25 mg" }] })).unwrap(),
        );

        assert_eq!(r.resolve("dosis captopril", Priority::KbFirst).await, "Dosis Captopril:\n25 mg");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_resolutions_each_log_once() {
        let dir = TempDir::new().unwrap();
        let r = Arc::new(router(Scripted::ok("llm"), &dir));

        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let r = r.clone();
                tokio::spawn(async move {
                    let q = if i % 2 == 0 { "dosis metformin" } else { "xyz" };
                    r.resolve(q, Priority::KbFirst).await
                })
            })
            .collect();
        for t in tasks {
            t.await.unwrap();
        }

        assert_eq!(r.chat_log().read_all().unwrap().len(), 32);
        assert_eq!(r.responder().calls(), 16);
    }

    #[test]
    fn priority_parses_and_displays() {
        assert_eq!("kb-first".parse::<Priority>().unwrap(), Priority::KbFirst);
        assert_eq!("LLM-FIRST".parse::<Priority>().unwrap(), Priority::LlmFirst);
        assert_eq!("llm_first".parse::<Priority>().unwrap(), Priority::LlmFirst);
        assert!("sideways".parse::<Priority>().is_err());
        assert_eq!(Priority::LlmFirst.to_string(), "llm-first");
    }
}
