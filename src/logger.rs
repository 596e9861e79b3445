//! Process diagnostics on stderr.
//!
//! stdout belongs to the console replies. Answered questions are recorded
//! separately by `chat_log`.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Install the stderr subscriber for this process.
///
/// `prefer_level` is set when the level came from `-v` flags.
pub fn init(level: &str, prefer_level: bool) -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(level, prefer_level)?)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| AppError::Logger(format!("subscriber already installed: {e}")))
}

/// Pick between `level` and `RUST_LOG`: a CLI level beats `RUST_LOG`,
/// `RUST_LOG` beats a configured level. Either side covers for the other
/// when it does not parse.
fn filter_for(level: &str, prefer_level: bool) -> Result<EnvFilter, AppError> {
    let from_level = || EnvFilter::try_new(level).map_err(|e| e.to_string());
    let from_env = || EnvFilter::try_from_default_env().map_err(|e| e.to_string());
    let picked = if prefer_level {
        from_level().or_else(|_| from_env())
    } else {
        from_env().or_else(|_| from_level())
    };
    picked.map_err(|e| AppError::Logger(format!("no usable log filter for '{level}': {e}")))
}

/// Check a configured level before use; empty or unknown names are errors.
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    if level.trim().is_empty() {
        return Err(AppError::Logger("empty log level".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("unknown log level '{level}'")))
}

/// Map a count of `-v` flags to a level override.
///
/// `-v` → warn, `-vv` → info, `-vvv` → debug, more → trace.
/// Zero flags means "use the configured level".
pub fn level_for_verbosity(verbosity: u8) -> Option<&'static str> {
    match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    }
}
