//! Obat Bot entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config)
//!   4. Init logger once
//!   5. Load the knowledge base
//!   6. Build the LLM provider and responder, ping it in the background
//!   7. Spawn Ctrl-C → shutdown signal watcher
//!   8. Run the console until shutdown, `exit` or EOF

use std::io::Write as _;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use obat_bot::chat_log::ChatLog;
use obat_bot::config::{self, Config};
use obat_bot::console::Console;
use obat_bot::engine::{Priority, Router};
use obat_bot::error::AppError;
use obat_bot::knowledge::{KnowledgeHandle, KnowledgeStore};
use obat_bot::llm::{Responder, providers};
use obat_bot::logger;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present; the file is optional.
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let config = config::load(args.config_path.as_deref())?;

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    logger::init(effective_log_level, args.log_level.is_some())?;

    let priority = match args.priority.as_deref() {
        Some(p) => p.parse::<Priority>().map_err(AppError::Config)?,
        None => config.router.priority,
    };

    info!(
        bot_name = %config.bot_name,
        work_dir = %config.work_dir.display(),
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        %priority,
        "config loaded"
    );

    let store = KnowledgeStore::from_file(&config.knowledge_path)?;
    info!(
        path = %config.knowledge_path.display(),
        categories = store.categories().len(),
        entries = store.entry_count(),
        "knowledge base loaded"
    );

    let provider = providers::build(&config.llm, config.llm_api_key.clone())
        .map_err(|e| AppError::Config(e.to_string()))?;
    let responder = Responder::new(provider, config.load_system_prompt()?);

    let ping_provider = responder.provider().clone();
    tokio::spawn(async move {
        if let Err(e) = ping_provider.ping().await {
            warn!(error = %e, "llm provider unreachable; generative answers will fall back");
        }
    });

    let router = Router::new(KnowledgeHandle::new(store), responder, ChatLog::new(&config.chat_log_path))
        .with_generation_timeout(config.llm.generation_timeout())
        .with_apology(config.router.apology_text.clone(), config.router.apology_marker.clone());

    print_startup_summary(&config, priority);

    // Ctrl-C cancels the token; the console watches it.
    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, shutting down");
            ctrlc_token.cancel();
        }
    });

    Console::new(&router, priority, &config.knowledge_path)
        .run(&config.bot_name, shutdown.clone())
        .await?;
    shutdown.cancel();

    println!("Sampai jumpa.");
    let _ = std::io::stdout().flush();
    Ok(())
}

fn print_startup_summary(config: &Config, priority: Priority) {
    let model = config
        .llm
        .active_endpoint()
        .map(|e| e.model.as_str())
        .unwrap_or("-");

    println!("Bot:        {}", config.bot_name);
    println!("Knowledge:  {}", config.knowledge_path.display());
    println!("Chat log:   {}", config.chat_log_path.display());
    println!("Priority:   {priority}");
    println!(
        "LLM:        provider={} model={} timeout={}s",
        config.llm.provider,
        model,
        config.llm.generation_timeout().as_secs()
    );
}

struct CliArgs {
    log_level: Option<&'static str>,
    config_path: Option<String>,
    priority: Option<String>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;
    let mut priority = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: obat-bot [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -p, --priority <PRIORITY>  kb-first or llm-first (overrides config)");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "-f" | "--config" => config_path = Some(required_value(&mut iter, "-f/--config", "a path")),
            "-p" | "--priority" => priority = Some(required_value(&mut iter, "-p/--priority", "a value")),
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    CliArgs {
        log_level: logger::level_for_verbosity(verbosity),
        config_path,
        priority,
    }
}

fn required_value(iter: &mut impl Iterator<Item = String>, flag: &str, what: &str) -> String {
    match iter.next() {
        Some(v) => v,
        None => {
            eprintln!("error: {flag} requires {what} argument");
            std::process::exit(1);
        }
    }
}
