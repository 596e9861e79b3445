//! Application-wide error types.
//!
//! Only [`AppError::Config`] is fatal: it stops the process at startup.
//! Everything raised while answering a query is recovered inside the router.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or unreadable configuration or knowledge base.
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    /// Appending to (or reading back) the chat log failed.
    #[error("chat log error: {0}")]
    ChatLog(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
