//! Obat Bot: a medication question-answering assistant.
//!
//! Questions are answered from a curated knowledge base when possible and
//! by a generative model otherwise, in the order chosen by [`engine::Priority`].
//! Every exchange is appended to a JSONL chat log.

pub mod chat_log;
pub mod config;
pub mod console;
pub mod engine;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod logger;
