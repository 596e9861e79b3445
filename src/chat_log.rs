//! Append-only JSON Lines record of every answered query.
//!
//! One line per resolution: `{"timestamp": …, "user": …, "bot": …}`.
//! Appends from concurrent resolutions are serialised by a mutex and each
//! line is written with a single `write_all`, so records never interleave.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// RFC 3339 local time with offset.
    pub timestamp: String,
    #[serde(rename = "user")]
    pub user_query: String,
    #[serde(rename = "bot")]
    pub bot_response: String,
}

impl LogRecord {
    /// Stamp a query/response pair with the current local time.
    pub fn now(user_query: impl Into<String>, bot_response: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now().to_rfc3339_opts(SecondsFormat::Micros, false),
            user_query: user_query.into(),
            bot_response: bot_response.into(),
        }
    }
}

/// Clones share the file path and the write lock.
#[derive(Debug, Clone)]
pub struct ChatLog {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl ChatLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Arc::new(Mutex::new(())) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. Creates the file and its parent directory on demand.
    pub fn append(&self, record: &LogRecord) -> Result<(), AppError> {
        let mut line = serde_json::to_string(record)
            .map_err(|e| AppError::ChatLog(format!("serialise record: {e}")))?;
        line.push('\n');

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::ChatLog(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AppError::ChatLog(format!("cannot open {}: {e}", self.path.display())))?;
        file.write_all(line.as_bytes())
            .map_err(|e| AppError::ChatLog(format!("cannot write {}: {e}", self.path.display())))
    }

    /// [`append`](Self::append) on the blocking pool, for async callers.
    pub async fn append_async(&self, record: LogRecord) -> Result<(), AppError> {
        let log = self.clone();
        tokio::task::spawn_blocking(move || log.append(&record))
            .await
            .map_err(|e| AppError::ChatLog(format!("append join: {e}")))?
    }

    /// Parse every record in the log. A missing file reads as empty.
    pub fn read_all(&self) -> Result<Vec<LogRecord>, AppError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AppError::ChatLog(format!("cannot read {}: {e}", self.path.display())));
            }
        };
        data.lines()
            .filter(|l| !l.trim().is_empty())
            .enumerate()
            .map(|(i, l)| {
                serde_json::from_str(l).map_err(|e| {
                    AppError::ChatLog(format!("malformed line {} in {}: {e}", i + 1, self.path.display()))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn append_writes_one_json_line_per_record() {
        let dir = TempDir::new().unwrap();
        let log = ChatLog::new(dir.path().join("chat_logs.jsonl"));

        log.append(&LogRecord::now("dosis metformin", "Dosis Metformin:\n500 mg")).unwrap();
        log.append(&LogRecord::now("halo", "Maaf")).unwrap();

        let raw = fs::read_to_string(log.path()).unwrap();
        assert_eq!(raw.lines().count(), 2);
        let first: serde_json::Value = serde_json::from_str(raw.lines().next().unwrap()).unwrap();
        assert_eq!(first["user"], "dosis metformin");
        assert_eq!(first["bot"], "Dosis Metformin:\n500 mg");
        assert!(first["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn non_ascii_is_kept_verbatim() {
        let dir = TempDir::new().unwrap();
        let log = ChatLog::new(dir.path().join("log.jsonl"));
        log.append(&LogRecord::now("obat für Kopfschmerzen, ок", "✓")).unwrap();
        let raw = fs::read_to_string(log.path()).unwrap();
        assert!(raw.contains("für Kopfschmerzen, ок"));
        assert!(raw.contains('✓'));
    }

    #[test]
    fn creates_missing_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let log = ChatLog::new(dir.path().join("a/b/log.jsonl"));
        log.append(&LogRecord::now("q", "r")).unwrap();
        assert_eq!(log.read_all().unwrap().len(), 1);
    }

    #[test]
    fn read_all_round_trips_fields() {
        let dir = TempDir::new().unwrap();
        let log = ChatLog::new(dir.path().join("log.jsonl"));
        let rec = LogRecord::now("  Metformin ", "jawaban");
        log.append(&rec).unwrap();
        assert_eq!(log.read_all().unwrap(), vec![rec]);
    }

    #[test]
    fn missing_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let log = ChatLog::new(dir.path().join("none.jsonl"));
        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn unwritable_path_is_chat_log_error() {
        let dir = TempDir::new().unwrap();
        // The log path is an existing directory, so opening it for append fails.
        let log = ChatLog::new(dir.path());
        let err = log.append(&LogRecord::now("q", "r")).unwrap_err();
        assert!(matches!(err, AppError::ChatLog(_)));
    }

    #[test]
    fn concurrent_appends_do_not_interleave() {
        let dir = TempDir::new().unwrap();
        let log = Arc::new(ChatLog::new(dir.path().join("log.jsonl")));
        let long = "x".repeat(8 * 1024);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let log = log.clone();
                let long = long.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        log.append(&LogRecord::now(format!("t{t}-{i}"), long.clone())).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 200);
        assert!(records.iter().all(|r| r.bot_response == long));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn async_appends_from_clones_share_one_file() {
        let dir = TempDir::new().unwrap();
        let log = ChatLog::new(dir.path().join("nested/log.jsonl"));

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let log = log.clone();
                tokio::spawn(async move { log.append_async(LogRecord::now(format!("q{i}"), "r")).await })
            })
            .collect();
        for t in tasks {
            t.await.unwrap().unwrap();
        }

        assert_eq!(log.read_all().unwrap().len(), 16);
    }

    #[tokio::test]
    async fn async_append_reports_write_failure() {
        let dir = TempDir::new().unwrap();
        let log = ChatLog::new(dir.path());
        let err = log.append_async(LogRecord::now("q", "r")).await.unwrap_err();
        assert!(matches!(err, AppError::ChatLog(_)));
    }
}
