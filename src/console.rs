//! Console transport: reads questions from stdin, prints answers to stdout.
//!
//! Runs until the `shutdown` token is cancelled (Ctrl-C), stdin closes, or
//! the user types `exit`. `/reload` re-reads the knowledge base in place.

use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::{Priority, Router};
use crate::error::AppError;
use crate::knowledge::KnowledgeStore;
use crate::llm::GenerativeResponder;

/// What one input line asks the console to do.
#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Skip,
    Exit,
    Reload,
    Ask(&'a str),
}

pub fn parse_command(line: &str) -> Command<'_> {
    match line.trim() {
        "" => Command::Skip,
        "exit" => Command::Exit,
        "/reload" => Command::Reload,
        _ => Command::Ask(line),
    }
}

/// Load `path` and swap it in. Requests already running keep the old store.
pub fn reload<R: GenerativeResponder>(router: &Router<R>, path: &Path) -> Result<usize, AppError> {
    let store = KnowledgeStore::from_file(path)?;
    let count = store.entry_count();
    router.knowledge().replace(store);
    info!(path = %path.display(), entries = count, "knowledge base reloaded");
    Ok(count)
}

pub struct Console<'r, R> {
    router: &'r Router<R>,
    priority: Priority,
    knowledge_path: PathBuf,
}

impl<'r, R: GenerativeResponder> Console<'r, R> {
    pub fn new(router: &'r Router<R>, priority: Priority, knowledge_path: impl Into<PathBuf>) -> Self {
        Self { router, priority, knowledge_path: knowledge_path.into() }
    }

    /// Drive the console on the process stdin.
    pub async fn run(&self, bot_name: &str, shutdown: CancellationToken) -> Result<(), AppError> {
        println!("─────────────────────────────────");
        println!(" {bot_name}  (ketik 'exit' atau Ctrl-C untuk keluar)");
        println!("─────────────────────────────────");
        let reader = BufReader::new(tokio::io::stdin());
        self.run_with(reader, &mut std::io::stdout(), shutdown).await
    }

    /// Line loop over any reader/writer pair.
    pub async fn run_with<B, W>(&self, reader: B, out: &mut W, shutdown: CancellationToken) -> Result<(), AppError>
    where
        B: AsyncBufRead + Unpin,
        W: std::io::Write,
    {
        let mut lines = reader.lines();

        loop {
            write!(out, "> ")?;
            out.flush()?;

            let line = tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("console shutting down");
                    break;
                }
                line = lines.next_line() => line,
            };

            let input = match line {
                Err(e) => {
                    warn!("console read error: {e}");
                    break;
                }
                Ok(None) => {
                    info!("console stdin closed");
                    break;
                }
                Ok(Some(input)) => input,
            };

            match parse_command(&input) {
                Command::Skip => continue,
                Command::Exit => break,
                Command::Reload => match reload(self.router, &self.knowledge_path) {
                    Ok(count) => writeln!(out, "Basis pengetahuan dimuat ulang ({count} obat).")?,
                    Err(e) => {
                        warn!(error = %e, "knowledge reload failed, keeping previous store");
                        writeln!(out, "Gagal memuat ulang basis pengetahuan: {e}")?;
                    }
                },
                Command::Ask(query) => {
                    debug!(input = %query, "console received line");
                    let reply = self.router.resolve(query, self.priority).await;
                    writeln!(out, "{reply}")?;
                }
            }
        }

        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}
